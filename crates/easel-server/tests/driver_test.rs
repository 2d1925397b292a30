//! ServerDriver behavior tests
//!
//! Drives the server through whole request flows with frames built the way a
//! client builds them, and checks who receives which reply.

use std::{
    sync::{Arc, Barrier},
    thread,
};

use easel_core::{RoomName, SessionId, test_env::ManualEnv};
use easel_proto::{
    Avatar, ErrorPayload, Payload,
    payloads::{
        identity::{UpdateAvatar, UpdateUsername},
        room::{RoomRef, RoomSummary},
    },
};
use easel_server::{DriverConfig, ServerAction, ServerDriver, ServerEvent};

type Sent = Vec<(SessionId, u32, Payload)>;

struct Harness {
    driver: ServerDriver<ManualEnv>,
}

impl Harness {
    fn new() -> Self {
        Self { driver: ServerDriver::new(ManualEnv::default(), DriverConfig::default()) }
    }

    fn connect(&self, session_id: SessionId) {
        self.driver.process_event(ServerEvent::ConnectionAccepted { session_id }).unwrap();
    }

    fn send(&self, session_id: SessionId, request_id: u32, payload: Payload) -> Sent {
        let frame = payload.into_frame(request_id).unwrap();
        let actions =
            self.driver.process_event(ServerEvent::FrameReceived { session_id, frame }).unwrap();
        sent(&actions)
    }

    fn identify(&self, session_id: SessionId, username: &str) {
        let update = Payload::UpdateUsername(UpdateUsername { username: username.into() });
        assert!(self.send(session_id, 0, update).is_empty());
    }

    fn connect_as(&self, session_id: SessionId, username: &str) {
        self.connect(session_id);
        self.identify(session_id, username);
    }

    fn create(&self, session_id: SessionId, request_id: u32, room: &str) -> Sent {
        self.send(session_id, request_id, Payload::CreateRoom(RoomRef::new(room)))
    }

    fn join(&self, session_id: SessionId, request_id: u32, room: &str) -> Sent {
        self.send(session_id, request_id, Payload::JoinRoom(RoomRef::new(room)))
    }

    fn disconnect(&self, session_id: SessionId) {
        self.driver
            .process_event(ServerEvent::ConnectionClosed {
                session_id,
                reason: "test disconnect".to_string(),
            })
            .unwrap();
    }

    fn members(&self, room: &str) -> Vec<SessionId> {
        self.driver.room_members(&name(room))
    }
}

fn name(room: &str) -> RoomName {
    RoomName::new(room).unwrap()
}

fn sent(actions: &[ServerAction]) -> Sent {
    actions
        .iter()
        .filter_map(|action| match action {
            ServerAction::SendToSession { session_id, frame } => {
                Some((*session_id, frame.request_id(), Payload::from_frame(frame).unwrap()))
            },
            _ => None,
        })
        .collect()
}

fn error_code(reply: &Sent) -> Option<u16> {
    match reply.as_slice() {
        [(_, _, Payload::Error(error))] => Some(error.code),
        _ => None,
    }
}

/// A creates lobby, B joins it, C is told lobby is taken, D is told lounge
/// does not exist.
#[test]
fn lobby_lounge_scenario() {
    let h = Harness::new();
    for (id, user) in [(1, "alice"), (2, "bob"), (3, "carol"), (4, "dave")] {
        h.connect_as(id, user);
    }

    let a = h.create(1, 1, "lobby");
    assert!(matches!(&a[..], [(1, 1, Payload::RoomCreated(r))] if r.room == "lobby"));

    let b = h.join(2, 1, "lobby");
    assert!(matches!(&b[..], [(2, 1, Payload::RoomJoined(r))] if r.room == "lobby"));

    let c = h.create(3, 7, "lobby");
    match &c[..] {
        [(3, 7, Payload::RoomNameTaken(rejection))] => {
            assert_eq!(rejection.room, "lobby");
            assert!(rejection.message.contains("lobby"));
        },
        other => panic!("expected room_name_taken for carol, got {other:?}"),
    }

    let d = h.join(4, 2, "lounge");
    match &d[..] {
        [(4, 2, Payload::RoomNotFound(rejection))] => assert_eq!(rejection.room, "lounge"),
        other => panic!("expected room_not_found for dave, got {other:?}"),
    }

    assert_eq!(h.members("lobby"), vec![1, 2]);
    assert!(!h.driver.has_room(&name("lounge")));
    assert_eq!(h.driver.current_room(3), None);
    assert_eq!(h.driver.current_room(4), None);
}

#[test]
fn unidentified_requests_are_rejected() {
    let h = Harness::new();
    h.connect(1);

    assert_eq!(error_code(&h.create(1, 1, "lobby")), Some(ErrorPayload::UNIDENTIFIED));
    assert_eq!(error_code(&h.join(1, 2, "lobby")), Some(ErrorPayload::UNIDENTIFIED));
    assert_eq!(
        error_code(&h.send(1, 3, Payload::ListRooms)),
        Some(ErrorPayload::UNIDENTIFIED)
    );
    assert_eq!(h.driver.room_count(), 0);
}

#[test]
fn invalid_room_name_is_rejected() {
    let h = Harness::new();
    h.connect_as(1, "alice");

    assert_eq!(error_code(&h.create(1, 1, "   ")), Some(ErrorPayload::INVALID_NAME));
    assert_eq!(error_code(&h.create(1, 2, "sixteen-chars-xx")), Some(ErrorPayload::INVALID_NAME));
    assert_eq!(h.driver.room_count(), 0);
}

#[test]
fn rejections_reach_only_the_requester() {
    let h = Harness::new();
    h.connect_as(1, "alice");
    h.connect_as(2, "bob");

    h.create(1, 1, "lobby");
    let reply = h.create(2, 1, "lobby");

    assert!(reply.iter().all(|(to, _, _)| *to == 2));
}

#[test]
fn success_moves_client_out_of_previous_room() {
    let h = Harness::new();
    h.connect_as(1, "alice");
    h.connect_as(2, "bob");

    h.create(1, 1, "lobby");
    h.join(2, 1, "lobby");
    h.create(2, 2, "lounge");

    assert_eq!(h.members("lobby"), vec![1]);
    assert_eq!(h.members("lounge"), vec![2]);
    assert_eq!(h.driver.current_room(2), Some(name("lounge")));

    // Last member moving away destroys the old room.
    h.join(1, 2, "lounge");
    assert!(!h.driver.has_room(&name("lobby")));
    assert_eq!(h.members("lounge"), vec![1, 2]);
}

#[test]
fn failed_request_leaves_previous_room() {
    let h = Harness::new();
    h.connect_as(1, "alice");
    h.connect_as(2, "bob");
    h.connect_as(3, "carol");

    h.create(1, 1, "lobby");
    h.join(3, 1, "lobby");
    h.create(2, 1, "lounge");

    let taken = h.create(1, 2, "lounge");
    assert!(matches!(&taken[..], [(1, 2, Payload::RoomNameTaken(_))]));

    assert_eq!(h.driver.current_room(1), None);
    assert_eq!(h.members("lobby"), vec![3]);
    assert_eq!(h.members("lounge"), vec![2]);

    h.join(1, 3, "lobby");
    let missing = h.join(1, 4, "attic");
    assert!(matches!(&missing[..], [(1, 4, Payload::RoomNotFound(_))]));
    assert_eq!(h.driver.current_room(1), None);
    assert_eq!(h.members("lobby"), vec![3]);
}

#[test]
fn rejoining_current_room_is_idempotent() {
    let h = Harness::new();
    h.connect_as(1, "alice");
    h.connect_as(2, "bob");

    h.create(1, 1, "lobby");
    let reply = h.join(1, 2, "lobby");

    assert!(matches!(&reply[..], [(1, 2, Payload::RoomJoined(r))] if r.room == "lobby"));
    assert_eq!(h.members("lobby"), vec![1]);

    // Re-creating it leaves first: alone, the room is destroyed and recreated.
    let again = h.create(1, 3, "lobby");
    assert!(matches!(&again[..], [(1, 3, Payload::RoomCreated(_))]));
    assert_eq!(h.members("lobby"), vec![1]);

    // With company, the name stays taken and the requester is out.
    h.join(2, 1, "lobby");
    let taken = h.create(1, 4, "lobby");
    assert!(matches!(&taken[..], [(1, 4, Payload::RoomNameTaken(_))]));
    assert_eq!(h.members("lobby"), vec![2]);
    assert_eq!(h.driver.current_room(1), None);
}

#[test]
fn names_are_not_trimmed_or_folded() {
    let h = Harness::new();
    h.connect_as(1, "alice");
    h.connect_as(2, "bob");

    h.create(1, 1, "Lobby");
    let reply = h.join(2, 1, "lobby");
    assert!(matches!(&reply[..], [(2, 1, Payload::RoomNotFound(_))]));

    let reply = h.create(2, 2, " Lobby");
    assert!(matches!(&reply[..], [(2, 2, Payload::RoomCreated(r))] if r.room == " Lobby"));
}

#[test]
fn leave_room_confirms_and_destroys_empty_room() {
    let h = Harness::new();
    h.connect_as(1, "alice");

    h.create(1, 1, "lobby");
    let reply = h.send(1, 2, Payload::LeaveRoom);

    assert!(matches!(&reply[..], [(1, 2, Payload::RoomLeft(r))] if r.room == "lobby"));
    assert!(!h.driver.has_room(&name("lobby")));

    let again = h.send(1, 3, Payload::LeaveRoom);
    assert_eq!(error_code(&again), Some(ErrorPayload::NOT_IN_ROOM));
}

#[test]
fn disconnect_of_last_member_frees_the_name() {
    let h = Harness::new();
    h.connect_as(1, "alice");
    h.connect_as(2, "bob");

    h.create(1, 1, "lobby");
    h.disconnect(1);

    assert!(!h.driver.has_room(&name("lobby")));
    assert!(matches!(&h.join(2, 1, "lobby")[..], [(2, 1, Payload::RoomNotFound(_))]));
    assert!(matches!(&h.create(2, 2, "lobby")[..], [(2, 2, Payload::RoomCreated(_))]));
}

#[test]
fn list_rooms_reports_sorted_member_counts() {
    let h = Harness::new();
    h.connect_as(1, "alice");
    h.connect_as(2, "bob");
    h.connect_as(3, "carol");

    h.create(1, 1, "lounge");
    h.create(2, 1, "attic");
    h.join(3, 1, "lounge");

    let reply = h.send(3, 9, Payload::ListRooms);
    let [(3, 9, Payload::RoomList(list))] = &reply[..] else {
        panic!("expected room_list, got {reply:?}");
    };
    assert_eq!(list.rooms, vec![
        RoomSummary { name: "attic".into(), members: 1 },
        RoomSummary { name: "lounge".into(), members: 2 },
    ]);
}

#[test]
fn avatar_update_is_recorded_silently() {
    let h = Harness::new();
    h.connect(1);

    let reply = h.send(1, 0, Payload::UpdateAvatar(UpdateAvatar { avatar: Avatar::RubberDuck }));

    assert!(reply.is_empty());
    assert_eq!(h.driver.session_info(1).unwrap().avatar, Avatar::RubberDuck);
}

/// Sessions on separate threads race to create one name.
#[test]
fn concurrent_create_via_driver_has_single_winner() {
    const CLIENTS: u64 = 8;

    let h = Arc::new(Harness::new());
    for id in 0..CLIENTS {
        h.connect_as(id, &format!("user{id}"));
    }

    let barrier = Arc::new(Barrier::new(CLIENTS as usize));
    let handles: Vec<_> = (0..CLIENTS)
        .map(|id| {
            let h = Arc::clone(&h);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                h.create(id, 1, "lobby")
            })
        })
        .collect();

    let replies: Vec<Sent> = handles.into_iter().map(|handle| handle.join().unwrap()).collect();

    let created = replies
        .iter()
        .filter(|reply| matches!(&reply[..], [(_, 1, Payload::RoomCreated(_))]))
        .count();
    let taken = replies
        .iter()
        .filter(|reply| matches!(&reply[..], [(_, 1, Payload::RoomNameTaken(_))]))
        .count();

    assert_eq!(created, 1);
    assert_eq!(taken, CLIENTS as usize - 1);
    assert_eq!(h.members("lobby").len(), 1);
}

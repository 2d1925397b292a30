//! Fuzz target for ServerDriver membership
//!
//! Arbitrary sequences of connects, identity updates, create/join/leave
//! requests, raw garbage frames and disconnects across a handful of sessions
//! and room names.
//!
//! # Invariants
//!
//! - A session is a member of at most one room
//! - Room membership and each session's recorded room agree
//! - No active room is empty
//! - Every request gets at most one reply, addressed to the requester

#![no_main]

use arbitrary::Arbitrary;
use easel_core::{RoomName, test_env::ManualEnv};
use easel_proto::{
    Avatar, Frame, FrameHeader, Opcode, Payload,
    payloads::{identity::UpdateUsername, room::RoomRef},
};
use easel_server::{DriverConfig, ServerAction, ServerDriver, ServerEvent};
use libfuzzer_sys::fuzz_target;

const SESSIONS: u64 = 4;
const ROOMS: [&str; 4] = ["lobby", "Lobby", " lobby", "lounge"];

#[derive(Debug, Clone, Arbitrary)]
enum Step {
    Connect { session: u8 },
    Disconnect { session: u8 },
    Identify { session: u8, username: String },
    Avatar { session: u8, avatar: u8 },
    Create { session: u8, room: u8, request_id: u32 },
    Join { session: u8, room: u8, request_id: u32 },
    Leave { session: u8, request_id: u32 },
    List { session: u8, request_id: u32 },
    Raw { session: u8, opcode: u16, payload: Vec<u8> },
}

fn frame(payload: Payload, request_id: u32) -> Option<Frame> {
    payload.into_frame(request_id).ok()
}

fuzz_target!(|steps: Vec<Step>| {
    let driver = ServerDriver::new(ManualEnv::default(), DriverConfig::default());
    let id = |s: u8| u64::from(s) % SESSIONS;
    let room = |r: u8| ROOMS[usize::from(r) % ROOMS.len()];

    for step in steps {
        let (session_id, event) = match step {
            Step::Connect { session } => {
                (id(session), ServerEvent::ConnectionAccepted { session_id: id(session) })
            },
            Step::Disconnect { session } => (
                id(session),
                ServerEvent::ConnectionClosed { session_id: id(session), reason: String::new() },
            ),
            Step::Identify { session, username } => {
                let Some(frame) = frame(Payload::UpdateUsername(UpdateUsername { username }), 0)
                else {
                    continue;
                };
                (id(session), ServerEvent::FrameReceived { session_id: id(session), frame })
            },
            Step::Avatar { session, avatar } => {
                let avatar = Avatar::ALL[usize::from(avatar) % Avatar::ALL.len()];
                let payload = Payload::UpdateAvatar(
                    easel_proto::payloads::identity::UpdateAvatar { avatar },
                );
                let Some(frame) = frame(payload, 0) else { continue };
                (id(session), ServerEvent::FrameReceived { session_id: id(session), frame })
            },
            Step::Create { session, room: r, request_id } => {
                let Some(frame) = frame(Payload::CreateRoom(RoomRef::new(room(r))), request_id)
                else {
                    continue;
                };
                (id(session), ServerEvent::FrameReceived { session_id: id(session), frame })
            },
            Step::Join { session, room: r, request_id } => {
                let Some(frame) = frame(Payload::JoinRoom(RoomRef::new(room(r))), request_id)
                else {
                    continue;
                };
                (id(session), ServerEvent::FrameReceived { session_id: id(session), frame })
            },
            Step::Leave { session, request_id } => {
                let Some(frame) = frame(Payload::LeaveRoom, request_id) else { continue };
                (id(session), ServerEvent::FrameReceived { session_id: id(session), frame })
            },
            Step::List { session, request_id } => {
                let Some(frame) = frame(Payload::ListRooms, request_id) else { continue };
                (id(session), ServerEvent::FrameReceived { session_id: id(session), frame })
            },
            Step::Raw { session, opcode, payload } => {
                let mut header = FrameHeader::new(Opcode::Error);
                let mut bytes = header.to_bytes();
                bytes[6..8].copy_from_slice(&opcode.to_be_bytes());
                if let Ok(raw) = FrameHeader::from_bytes(&bytes) {
                    header = *raw;
                }
                let frame = Frame::new(header, payload);
                (id(session), ServerEvent::FrameReceived { session_id: id(session), frame })
            },
        };

        let is_request = matches!(event, ServerEvent::FrameReceived { .. });
        let Ok(actions) = driver.process_event(event) else {
            continue;
        };

        let replies: Vec<_> = actions
            .iter()
            .filter_map(|action| match action {
                ServerAction::SendToSession { session_id, .. } => Some(*session_id),
                _ => None,
            })
            .collect();
        if is_request {
            assert!(replies.len() <= 1);
            assert!(replies.iter().all(|to| *to == session_id));
        } else {
            assert!(replies.is_empty());
        }

        // Membership agrees with each session's recorded room.
        let mut members_seen = 0;
        for name in ROOMS {
            let Ok(name) = RoomName::new(name) else { continue };
            let members = driver.room_members(&name);
            assert_eq!(driver.has_room(&name), !members.is_empty());
            for member in &members {
                assert_eq!(driver.current_room(*member).as_ref(), Some(&name));
            }
            members_seen += members.len();
        }
        let in_rooms = (0..SESSIONS).filter(|s| driver.current_room(*s).is_some()).count();
        assert_eq!(members_seen, in_rooms);
    }
});

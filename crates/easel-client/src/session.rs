//! Client session state machine.
//!
//! A [`Session`] owns everything the client knows about its place in the room
//! protocol: the username and avatar it will announce, the single outstanding
//! create or join request, the room it is in, and the error messages currently
//! shown to the user.
//!
//! # Request correlation
//!
//! Every create, join and list request carries a fresh request id. Responses
//! echo it. A response whose id, kind or room does not match the outstanding
//! request is stale: it is logged and otherwise ignored, so a late answer to
//! an abandoned request can never move the session or populate an error slot.
//!
//! The server still acts on an abandoned create or join. If its confirmation
//! arrives before any newer create or join was sent, the session answers with
//! a `leave_room` so the server does not keep a member the user never sees.

use std::time::Duration;

use easel_core::{RequestId, RoomName, Username, env::Environment};
use easel_proto::{
    Avatar, ErrorPayload, Frame, Payload,
    payloads::{
        identity::{UpdateAvatar, UpdateUsername},
        room::{RoomRef, RoomRejection},
    },
};

use crate::{
    error::ClientError,
    event::{ClientAction, ClientEvent},
};

/// Message shown when the server does not answer in time.
pub const TIMEOUT_MESSAGE: &str = "request timed out";

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a create, join or list request may stay unanswered
    pub request_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { request_timeout: Duration::from_secs(10) }
    }
}

/// What an outstanding request asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    /// `create_room`
    Create(RoomName),
    /// `join_room`
    Join(RoomName),
    /// `list_rooms`
    List,
}

impl RequestKind {
    fn describe(&self) -> String {
        match self {
            Self::Create(room) => format!("create {room:?}"),
            Self::Join(room) => format!("join {room:?}"),
            Self::List => "list".to_string(),
        }
    }
}

/// A request the server has not answered yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest<I> {
    /// Token the response must echo
    pub id: RequestId,
    /// What was asked for
    pub kind: RequestKind,
    /// When the request was sent
    pub sent_at: I,
}

/// Where the session stands in the room lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState<I> {
    /// No username, or no connection.
    Unidentified,
    /// Username set, not in a room, nothing outstanding.
    Identified,
    /// A create or join was sent and is unanswered.
    AwaitingRoomOutcome(PendingRequest<I>),
    /// Create or join confirmed.
    InRoom(RoomName),
}

/// One of the independent error messages shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorSlot {
    /// A join named a room that does not exist
    RoomNotFound,
    /// A create named a room that already exists
    RoomNameTaken,
    /// Timeout or another rejection by the server
    RequestFailed,
}

/// Error messages currently shown, one per slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingErrors {
    /// Shown after `room_not_found`
    pub room_not_found: Option<String>,
    /// Shown after `room_name_taken`
    pub room_name_taken: Option<String>,
    /// Shown after a timeout or an `error` reply
    pub request_failed: Option<String>,
}

impl PendingErrors {
    /// Message in `slot`, if any.
    pub fn get(&self, slot: ErrorSlot) -> Option<&str> {
        match slot {
            ErrorSlot::RoomNotFound => self.room_not_found.as_deref(),
            ErrorSlot::RoomNameTaken => self.room_name_taken.as_deref(),
            ErrorSlot::RequestFailed => self.request_failed.as_deref(),
        }
    }

    fn set(&mut self, slot: ErrorSlot, message: String) {
        let target = match slot {
            ErrorSlot::RoomNotFound => &mut self.room_not_found,
            ErrorSlot::RoomNameTaken => &mut self.room_name_taken,
            ErrorSlot::RequestFailed => &mut self.request_failed,
        };
        *target = Some(message);
    }

    /// Empty every slot.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// No slot holds a message.
    pub fn is_empty(&self) -> bool {
        self.room_not_found.is_none()
            && self.room_name_taken.is_none()
            && self.request_failed.is_none()
    }
}

/// Client side of the room lifecycle protocol.
///
/// Sans-IO: feed [`ClientEvent`]s to [`Session::handle`] and execute the
/// returned [`ClientAction`]s. A session belongs to one connection; after
/// [`ClientEvent::Disconnected`] every request fails.
pub struct Session<E: Environment> {
    env: E,
    config: SessionConfig,
    connected: bool,
    username: Option<Username>,
    avatar: Avatar,
    state: SessionState<E::Instant>,
    pending_list: Option<PendingRequest<E::Instant>>,
    abandoned: Option<PendingRequest<E::Instant>>,
    errors: PendingErrors,
    next_request_id: RequestId,
}

impl<E: Environment> Session<E> {
    /// Create a session for a freshly opened connection.
    pub fn new(env: E, config: SessionConfig) -> Self {
        Self {
            env,
            config,
            connected: true,
            username: None,
            avatar: Avatar::default(),
            state: SessionState::Unidentified,
            pending_list: None,
            abandoned: None,
            errors: PendingErrors::default(),
            next_request_id: 1,
        }
    }

    /// Username that will be announced with the next request.
    pub fn username(&self) -> Option<&Username> {
        self.username.as_ref()
    }

    /// Avatar that will be announced with the next request.
    pub fn avatar(&self) -> Avatar {
        self.avatar
    }

    /// Current lifecycle state.
    pub fn state(&self) -> &SessionState<E::Instant> {
        &self.state
    }

    /// Error messages currently shown.
    pub fn errors(&self) -> &PendingErrors {
        &self.errors
    }

    /// Confirmed room, if any.
    pub fn current_room(&self) -> Option<&RoomName> {
        match &self.state {
            SessionState::InRoom(room) => Some(room),
            _ => None,
        }
    }

    /// Unanswered create or join.
    pub fn outstanding_request(&self) -> Option<&PendingRequest<E::Instant>> {
        match &self.state {
            SessionState::AwaitingRoomOutcome(request) => Some(request),
            _ => None,
        }
    }

    /// Whether create, join and list would be accepted right now.
    pub fn can_request(&self) -> bool {
        self.connected && self.username.is_some()
    }

    /// Whether the connection is still up.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Process an event and return resulting actions.
    pub fn handle(
        &mut self,
        event: ClientEvent<E::Instant>,
    ) -> Result<Vec<ClientAction>, ClientError> {
        match event {
            ClientEvent::SetUsername(input) => self.handle_set_username(input),
            ClientEvent::SetAvatar(avatar) => {
                self.avatar = avatar;
                Ok(Vec::new())
            },
            ClientEvent::EditRoomName(_) => Ok(self.handle_edit_room_name()),
            ClientEvent::CreateRoom(input) => {
                self.handle_room_request(input, RequestKind::Create, Payload::CreateRoom)
            },
            ClientEvent::JoinRoom(input) => {
                self.handle_room_request(input, RequestKind::Join, Payload::JoinRoom)
            },
            ClientEvent::LeaveRoom => self.handle_leave_room(),
            ClientEvent::ListRooms => self.handle_list_rooms(),
            ClientEvent::FrameReceived(frame) => Ok(self.handle_frame(&frame)),
            ClientEvent::Tick { now } => Ok(self.handle_tick(now)),
            ClientEvent::Disconnected => Ok(self.handle_disconnected()),
        }
    }

    fn handle_set_username(&mut self, input: String) -> Result<Vec<ClientAction>, ClientError> {
        match Username::new(input) {
            Ok(username) => {
                self.username = Some(username);
                if self.connected && self.state == SessionState::Unidentified {
                    self.state = SessionState::Identified;
                }
                Ok(Vec::new())
            },
            Err(e) => {
                self.username = None;
                self.pending_list = None;
                self.abandon_room_request();
                if !matches!(self.state, SessionState::InRoom(_)) {
                    self.state = SessionState::Unidentified;
                }
                Err(e.into())
            },
        }
    }

    fn handle_edit_room_name(&mut self) -> Vec<ClientAction> {
        self.errors.clear();
        let mut actions = vec![ClientAction::ClearErrors];

        if let Some(request) = self.abandon_room_request() {
            actions.push(ClientAction::Log {
                message: format!(
                    "room name edited, abandoning request {} ({})",
                    request.id,
                    request.kind.describe()
                ),
            });
        }

        actions
    }

    /// Drop the outstanding create or join, remembering it in case the
    /// server confirms it anyway.
    fn abandon_room_request(&mut self) -> Option<&PendingRequest<E::Instant>> {
        let SessionState::AwaitingRoomOutcome(_) = self.state else {
            return None;
        };

        let idle = self.idle_state();
        let SessionState::AwaitingRoomOutcome(request) = std::mem::replace(&mut self.state, idle)
        else {
            return None;
        };
        Some(&*self.abandoned.insert(request))
    }

    /// Check connection and identity, then frame the identity updates that
    /// precede every request.
    fn identity_frames(&self) -> Result<[ClientAction; 2], ClientError> {
        if !self.connected {
            return Err(ClientError::Disconnected);
        }
        let Some(username) = &self.username else {
            return Err(ClientError::Unidentified);
        };

        let username =
            Payload::UpdateUsername(UpdateUsername { username: username.as_str().to_owned() });
        let avatar = Payload::UpdateAvatar(UpdateAvatar { avatar: self.avatar });

        Ok([
            ClientAction::Send(username.into_frame(0)?),
            ClientAction::Send(avatar.into_frame(0)?),
        ])
    }

    fn next_request_id(&mut self) -> RequestId {
        let id = self.next_request_id;
        self.next_request_id = self.next_request_id.checked_add(1).unwrap_or(1);
        id
    }

    fn handle_room_request(
        &mut self,
        input: String,
        kind: fn(RoomName) -> RequestKind,
        payload: fn(RoomRef) -> Payload,
    ) -> Result<Vec<ClientAction>, ClientError> {
        let identity = self.identity_frames()?;
        let room = RoomName::new(input)?;

        let id = self.next_request_id;
        let request = payload(RoomRef::from(&room)).into_frame(id)?;
        self.next_request_id();
        // The server leaves its current room before handling this request,
        // which also undoes any confirmation of an abandoned one.
        self.abandoned = None;

        let mut actions = Vec::new();
        match &self.state {
            SessionState::InRoom(previous) => {
                actions.push(ClientAction::LeftRoom { room: previous.clone() });
            },
            SessionState::AwaitingRoomOutcome(superseded) => {
                actions.push(ClientAction::Log {
                    message: format!(
                        "request {} ({}) superseded by request {id}",
                        superseded.id,
                        superseded.kind.describe()
                    ),
                });
            },
            SessionState::Unidentified | SessionState::Identified => {},
        }

        actions.extend(identity);
        actions.push(ClientAction::Send(request));

        self.state = SessionState::AwaitingRoomOutcome(PendingRequest {
            id,
            kind: kind(room),
            sent_at: self.env.now(),
        });

        Ok(actions)
    }

    fn handle_leave_room(&mut self) -> Result<Vec<ClientAction>, ClientError> {
        if !self.connected {
            return Err(ClientError::Disconnected);
        }
        let SessionState::InRoom(room) = &self.state else {
            return Err(ClientError::NotInRoom);
        };
        let room = room.clone();

        let frame = Payload::LeaveRoom.into_frame(self.next_request_id)?;
        self.next_request_id();

        let actions = vec![ClientAction::Send(frame), ClientAction::LeftRoom { room }];
        self.state = self.idle_state();

        Ok(actions)
    }

    fn handle_list_rooms(&mut self) -> Result<Vec<ClientAction>, ClientError> {
        let identity = self.identity_frames()?;

        let id = self.next_request_id;
        let request = Payload::ListRooms.into_frame(id)?;
        self.next_request_id();

        let mut actions = identity.to_vec();
        actions.push(ClientAction::Send(request));

        self.pending_list =
            Some(PendingRequest { id, kind: RequestKind::List, sent_at: self.env.now() });

        Ok(actions)
    }

    fn idle_state(&self) -> SessionState<E::Instant> {
        if self.connected && self.username.is_some() {
            SessionState::Identified
        } else {
            SessionState::Unidentified
        }
    }

    /// Take the outstanding create or join if `request_id` answers it.
    fn take_room_request(
        &mut self,
        request_id: RequestId,
        answers: impl FnOnce(&RequestKind) -> bool,
    ) -> Option<RoomName> {
        let SessionState::AwaitingRoomOutcome(request) = &self.state else {
            return None;
        };
        if request.id != request_id || !answers(&request.kind) {
            return None;
        }

        let room = match &request.kind {
            RequestKind::Create(room) | RequestKind::Join(room) => room.clone(),
            RequestKind::List => return None,
        };
        self.state = self.idle_state();
        Some(room)
    }

    fn handle_frame(&mut self, frame: &Frame) -> Vec<ClientAction> {
        let request_id = frame.request_id();
        let payload = match Payload::from_frame(frame) {
            Ok(payload) => payload,
            Err(e) => {
                let opcode = frame.header.opcode();
                return vec![ClientAction::Log {
                    message: format!("dropping undecodable frame {opcode:#06x}: {e}"),
                }];
            },
        };

        match payload {
            Payload::RoomCreated(confirmed) => {
                self.handle_confirmation(request_id, &confirmed, true)
            },
            Payload::RoomJoined(confirmed) => {
                self.handle_confirmation(request_id, &confirmed, false)
            },
            Payload::RoomNameTaken(rejection) => {
                self.handle_rejection(request_id, &rejection, ErrorSlot::RoomNameTaken)
            },
            Payload::RoomNotFound(rejection) => {
                self.handle_rejection(request_id, &rejection, ErrorSlot::RoomNotFound)
            },
            Payload::Error(error) => self.handle_error(request_id, error),
            Payload::RoomList(list) => match &self.pending_list {
                Some(pending) if pending.id == request_id => {
                    self.pending_list = None;
                    vec![ClientAction::RoomsListed(list.rooms)]
                },
                _ => stale("room_list", request_id),
            },
            Payload::RoomLeft(left) => vec![ClientAction::Log {
                message: format!("server confirmed leaving {:?}", left.room),
            }],
            other => vec![ClientAction::Log {
                message: format!("ignoring unexpected {} from server", other.opcode()),
            }],
        }
    }

    fn handle_confirmation(
        &mut self,
        request_id: RequestId,
        confirmed: &RoomRef,
        created: bool,
    ) -> Vec<ClientAction> {
        let answers = |kind: &RequestKind| match kind {
            RequestKind::Create(room) => created && room.as_str() == confirmed.room,
            RequestKind::Join(room) => !created && room.as_str() == confirmed.room,
            RequestKind::List => false,
        };

        let Some(room) = self.take_room_request(request_id, answers) else {
            if let Some(actions) = self.withdraw_abandoned(request_id, answers) {
                return actions;
            }
            return stale(if created { "room_created" } else { "room_joined" }, request_id);
        };

        self.errors.clear();
        self.state = SessionState::InRoom(room.clone());

        vec![ClientAction::ClearErrors, ClientAction::EnterRoom { room }]
    }

    /// Leave the room an abandoned request was confirmed into.
    ///
    /// Returns `None` when `request_id` does not answer the abandoned request.
    fn withdraw_abandoned(
        &mut self,
        request_id: RequestId,
        answers: impl FnOnce(&RequestKind) -> bool,
    ) -> Option<Vec<ClientAction>> {
        let abandoned = self.abandoned.as_ref()?;
        if abandoned.id != request_id || !answers(&abandoned.kind) {
            return None;
        }

        let describe = abandoned.kind.describe();
        self.abandoned = None;
        let log = ClientAction::Log {
            message: format!("request {request_id} ({describe}) was abandoned, leaving the room"),
        };

        match Payload::LeaveRoom.into_frame(self.next_request_id) {
            Ok(frame) => {
                self.next_request_id();
                Some(vec![log, ClientAction::Send(frame)])
            },
            Err(e) => Some(vec![ClientAction::Log {
                message: format!("cannot leave after abandoned request {request_id}: {e}"),
            }]),
        }
    }

    /// A rejection or error for the abandoned request means the server never
    /// added the session anywhere.
    fn forget_abandoned(&mut self, request_id: RequestId) {
        if self.abandoned.as_ref().is_some_and(|request| request.id == request_id) {
            self.abandoned = None;
        }
    }

    fn handle_rejection(
        &mut self,
        request_id: RequestId,
        rejection: &RoomRejection,
        slot: ErrorSlot,
    ) -> Vec<ClientAction> {
        let room = self.take_room_request(request_id, |kind| match (slot, kind) {
            (ErrorSlot::RoomNameTaken, RequestKind::Create(room))
            | (ErrorSlot::RoomNotFound, RequestKind::Join(room)) => {
                room.as_str() == rejection.room
            },
            _ => false,
        });

        if room.is_none() {
            self.forget_abandoned(request_id);
            let event = match slot {
                ErrorSlot::RoomNameTaken => "room_name_taken",
                _ => "room_not_found",
            };
            return stale(event, request_id);
        }

        self.errors.set(slot, rejection.message.clone());
        vec![ClientAction::ShowError { slot, message: rejection.message.clone() }]
    }

    fn handle_error(&mut self, request_id: RequestId, error: ErrorPayload) -> Vec<ClientAction> {
        if self.pending_list.as_ref().is_some_and(|pending| pending.id == request_id) {
            self.pending_list = None;
        } else if self.take_room_request(request_id, |_| true).is_none() {
            self.forget_abandoned(request_id);
            return vec![ClientAction::Log {
                message: format!(
                    "server error {} for request {request_id}: {}",
                    error.code, error.message
                ),
            }];
        }

        self.errors.set(ErrorSlot::RequestFailed, error.message.clone());
        vec![ClientAction::ShowError { slot: ErrorSlot::RequestFailed, message: error.message }]
    }

    fn handle_tick(&mut self, now: E::Instant) -> Vec<ClientAction> {
        let timeout = self.config.request_timeout;
        let expired = |request: &PendingRequest<E::Instant>| {
            now > request.sent_at && now - request.sent_at >= timeout
        };

        let mut actions = Vec::new();

        if self.pending_list.as_ref().is_some_and(expired) {
            self.pending_list = None;
            actions.push(ClientAction::Log { message: "room list request timed out".to_string() });
        }

        if self.outstanding_request().is_some_and(expired)
            && let Some(request) = self.abandon_room_request()
        {
            let message = format!("request {} ({}) timed out", request.id, request.kind.describe());
            actions.push(ClientAction::Log { message });
            self.errors.set(ErrorSlot::RequestFailed, TIMEOUT_MESSAGE.to_string());
            actions.push(ClientAction::ShowError {
                slot: ErrorSlot::RequestFailed,
                message: TIMEOUT_MESSAGE.to_string(),
            });
        }

        actions
    }

    fn handle_disconnected(&mut self) -> Vec<ClientAction> {
        let mut actions = Vec::new();

        match &self.state {
            SessionState::InRoom(room) => {
                actions.push(ClientAction::LeftRoom { room: room.clone() });
            },
            SessionState::AwaitingRoomOutcome(request) => actions.push(ClientAction::Log {
                message: format!(
                    "disconnected, abandoning request {} ({})",
                    request.id,
                    request.kind.describe()
                ),
            }),
            SessionState::Unidentified | SessionState::Identified => {},
        }

        if !self.errors.is_empty() {
            self.errors.clear();
            actions.push(ClientAction::ClearErrors);
        }

        self.connected = false;
        self.username = None;
        self.avatar = Avatar::default();
        self.pending_list = None;
        self.abandoned = None;
        self.state = SessionState::Unidentified;

        actions
    }
}

fn stale(event: &str, request_id: RequestId) -> Vec<ClientAction> {
    let message = format!("discarding stale {event} for request {request_id}");
    vec![ClientAction::Log { message }]
}

impl<E: Environment> std::fmt::Debug for Session<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("connected", &self.connected)
            .field("username", &self.username)
            .field("avatar", &self.avatar)
            .field("state", &self.state)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use easel_core::test_env::ManualEnv;

    use super::*;

    fn session() -> Session<ManualEnv> {
        Session::new(ManualEnv::default(), SessionConfig::default())
    }

    fn sent(actions: &[ClientAction]) -> Vec<(u32, Payload)> {
        actions
            .iter()
            .filter_map(|action| match action {
                ClientAction::Send(frame) => {
                    Some((frame.request_id(), Payload::from_frame(frame).unwrap()))
                },
                _ => None,
            })
            .collect()
    }

    #[test]
    fn new_session_is_unidentified() {
        let session = session();

        assert_eq!(session.state(), &SessionState::Unidentified);
        assert!(!session.can_request());
        assert!(session.errors().is_empty());
        assert_eq!(session.avatar(), Avatar::ElephantCircus);
    }

    #[test]
    fn valid_username_identifies() {
        let mut session = session();

        let actions = session.handle(ClientEvent::SetUsername("ada".into())).unwrap();

        assert!(actions.is_empty());
        assert_eq!(session.state(), &SessionState::Identified);
        assert_eq!(session.username().map(Username::as_str), Some("ada"));
    }

    #[test]
    fn create_sends_identity_then_request() {
        let mut session = session();
        session.handle(ClientEvent::SetUsername("ada".into())).unwrap();
        session.handle(ClientEvent::SetAvatar(Avatar::RubberDuck)).unwrap();

        let actions = session.handle(ClientEvent::CreateRoom("lobby".into())).unwrap();

        let frames = sent(&actions);
        assert_eq!(frames.len(), 3);
        assert!(matches!(&frames[0], (0, Payload::UpdateUsername(u)) if u.username == "ada"));
        assert!(matches!(
            &frames[1],
            (0, Payload::UpdateAvatar(a)) if a.avatar == Avatar::RubberDuck
        ));
        assert!(matches!(&frames[2], (1, Payload::CreateRoom(r)) if r.room == "lobby"));

        let pending = session.outstanding_request().unwrap();
        assert_eq!(pending.id, 1);
        assert_eq!(pending.kind, RequestKind::Create(RoomName::new("lobby").unwrap()));
    }

    #[test]
    fn request_ids_increase() {
        let mut session = session();
        session.handle(ClientEvent::SetUsername("ada".into())).unwrap();

        session.handle(ClientEvent::CreateRoom("a".into())).unwrap();
        session.handle(ClientEvent::JoinRoom("b".into())).unwrap();
        session.handle(ClientEvent::ListRooms).unwrap();

        assert_eq!(session.outstanding_request().unwrap().id, 2);
        assert_eq!(session.pending_list.as_ref().unwrap().id, 3);
    }

    #[test]
    fn late_confirmation_of_abandoned_request_sends_leave() {
        let mut session = session();
        session.handle(ClientEvent::SetUsername("ada".into())).unwrap();
        session.handle(ClientEvent::CreateRoom("lobby".into())).unwrap();
        session.handle(ClientEvent::EditRoomName("lob".into())).unwrap();

        let late = Payload::RoomCreated(RoomRef::new("lobby")).into_frame(1).unwrap();
        let actions = session.handle(ClientEvent::FrameReceived(late.clone())).unwrap();

        assert!(matches!(&sent(&actions)[..], [(2, Payload::LeaveRoom)]));
        assert_eq!(session.state(), &SessionState::Identified);

        // Withdrawn once only.
        let actions = session.handle(ClientEvent::FrameReceived(late)).unwrap();
        assert!(sent(&actions).is_empty());
    }

    #[test]
    fn newer_request_forgets_abandoned_one() {
        let mut session = session();
        session.handle(ClientEvent::SetUsername("ada".into())).unwrap();
        session.handle(ClientEvent::CreateRoom("lobby".into())).unwrap();
        session.handle(ClientEvent::EditRoomName("lounge".into())).unwrap();
        session.handle(ClientEvent::JoinRoom("lounge".into())).unwrap();

        let late = Payload::RoomCreated(RoomRef::new("lobby")).into_frame(1).unwrap();
        let actions = session.handle(ClientEvent::FrameReceived(late)).unwrap();

        assert!(sent(&actions).is_empty());
        assert_eq!(session.outstanding_request().map(|r| r.id), Some(2));
    }

    #[test]
    fn invalid_room_name_sends_nothing() {
        let mut session = session();
        session.handle(ClientEvent::SetUsername("ada".into())).unwrap();

        let result = session.handle(ClientEvent::JoinRoom("  ".into()));

        assert!(matches!(result, Err(ClientError::InvalidName(_))));
        assert_eq!(session.state(), &SessionState::Identified);
        assert_eq!(session.next_request_id, 1);
    }

    #[test]
    fn leave_room_outside_room_is_an_error() {
        let mut session = session();
        session.handle(ClientEvent::SetUsername("ada".into())).unwrap();

        assert_eq!(session.handle(ClientEvent::LeaveRoom), Err(ClientError::NotInRoom));
    }

    #[test]
    fn request_id_wraps_past_zero() {
        let mut session = session();
        session.next_request_id = u32::MAX;

        assert_eq!(session.next_request_id(), u32::MAX);
        assert_eq!(session.next_request_id(), 1);
    }

    #[test]
    fn undecodable_frame_is_logged() {
        let mut session = session();
        let garbage = Frame::new(
            easel_proto::FrameHeader::new(easel_proto::Opcode::RoomJoined),
            vec![0xFF],
        );

        let actions = session.handle(ClientEvent::FrameReceived(garbage)).unwrap();

        assert!(matches!(&actions[..], [ClientAction::Log { .. }]));
        assert_eq!(session.state(), &SessionState::Unidentified);
    }
}

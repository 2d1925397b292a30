//! Server driver.
//!
//! Ties together the ConnectionRegistry (per-session identity and current
//! room) and the RoomManager (room table). Pure logic: the runtime feeds it
//! [`ServerEvent`]s and executes the returned [`ServerAction`]s.
//!
//! Every method takes `&self`. Connections are driven concurrently and only
//! contend on the registry mutex (held briefly, never across a room operation)
//! and on the slot of the room name they touch.
//!
//! A session is in at most one room. Create and join requests leave the
//! current room before trying the new one, so a rejected request leaves the
//! session in no room, exactly where the client believes it is.

use std::sync::{Mutex, MutexGuard, PoisonError};

use easel_core::{RoomName, SessionId, Username, env::Environment};
use easel_proto::{
    Avatar, ErrorPayload, Frame, Payload,
    payloads::room::{RoomList, RoomRef, RoomRejection, RoomSummary},
};

use crate::{
    registry::{ConnectionRegistry, SessionInfo},
    room_manager::{RoomError, RoomManager},
    server_error::ServerError,
};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum concurrent connections
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { max_connections: 10_000 }
    }
}

/// Events that the server driver processes.
///
/// These are produced by the runtime.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// A new connection was accepted
    ConnectionAccepted {
        /// Unique connection ID assigned by the runtime
        session_id: SessionId,
    },

    /// A frame was received from a connection
    FrameReceived {
        /// Connection that sent the frame
        session_id: SessionId,
        /// The received frame
        frame: Frame,
    },

    /// A connection was closed (by peer or error)
    ConnectionClosed {
        /// Connection that was closed
        session_id: SessionId,
        /// Reason for closure
        reason: String,
    },
}

/// Actions that the server driver produces.
#[derive(Debug, Clone)]
pub enum ServerAction {
    /// Send a frame to a specific session
    SendToSession {
        /// Target session ID
        session_id: SessionId,
        /// Frame to send
        frame: Frame,
    },

    /// Close a connection
    CloseConnection {
        /// Session to close
        session_id: SessionId,
        /// Reason for closure
        reason: String,
    },

    /// Log a message (for debugging/monitoring)
    Log {
        /// Log level
        level: LogLevel,
        /// Message to log
        message: String,
    },
}

/// Log levels for server actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug information
    Debug,
    /// Informational message
    Info,
    /// Warning
    Warn,
    /// Error
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoomRequest {
    Create,
    Join,
}

/// Action-based server driver.
pub struct ServerDriver<E: Environment> {
    registry: Mutex<ConnectionRegistry>,
    rooms: RoomManager<E::Instant>,
    env: E,
    config: ServerConfig,
}

impl<E: Environment> ServerDriver<E> {
    /// Create a new server driver.
    pub fn new(env: E, config: ServerConfig) -> Self {
        Self {
            registry: Mutex::new(ConnectionRegistry::new()),
            rooms: RoomManager::new(),
            env,
            config,
        }
    }

    fn registry(&self) -> MutexGuard<'_, ConnectionRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Process a server event and return actions to execute.
    ///
    /// This is the main entry point for the server driver.
    pub fn process_event(&self, event: ServerEvent) -> Result<Vec<ServerAction>, ServerError> {
        match event {
            ServerEvent::ConnectionAccepted { session_id } => {
                self.handle_connection_accepted(session_id)
            },
            ServerEvent::FrameReceived { session_id, frame } => {
                self.handle_frame_received(session_id, &frame)
            },
            ServerEvent::ConnectionClosed { session_id, reason } => {
                Ok(self.handle_connection_closed(session_id, &reason))
            },
        }
    }

    fn handle_connection_accepted(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<ServerAction>, ServerError> {
        let mut registry = self.registry();

        if registry.session_count() >= self.config.max_connections {
            return Ok(vec![ServerAction::CloseConnection {
                session_id,
                reason: "max connections exceeded".to_string(),
            }]);
        }

        if !registry.register_session(session_id) {
            return Err(ServerError::SessionAlreadyExists(session_id));
        }

        Ok(vec![ServerAction::Log {
            level: LogLevel::Debug,
            message: format!("connection accepted, session_id={session_id}"),
        }])
    }

    fn handle_frame_received(
        &self,
        session_id: SessionId,
        frame: &Frame,
    ) -> Result<Vec<ServerAction>, ServerError> {
        if !self.registry().has_session(session_id) {
            return Err(ServerError::SessionNotFound(session_id));
        }

        let request_id = frame.request_id();
        let Some(opcode) = frame.opcode().filter(|op| op.is_request()) else {
            return Ok(self.reject(
                session_id,
                request_id,
                ErrorPayload::unsupported(frame.header.opcode()),
            ));
        };

        let payload = match Payload::from_frame(frame) {
            Ok(payload) => payload,
            Err(e) => {
                return Ok(self.reject(
                    session_id,
                    request_id,
                    ErrorPayload::invalid_payload(format!("{opcode}: {e}")),
                ));
            },
        };

        match payload {
            Payload::UpdateUsername(update) => {
                Ok(self.handle_update_username(session_id, request_id, update.username))
            },
            Payload::UpdateAvatar(update) => {
                Ok(self.handle_update_avatar(session_id, update.avatar))
            },
            Payload::CreateRoom(room) => {
                Ok(self.handle_room_request(session_id, request_id, RoomRequest::Create, &room))
            },
            Payload::JoinRoom(room) => {
                Ok(self.handle_room_request(session_id, request_id, RoomRequest::Join, &room))
            },
            Payload::LeaveRoom => Ok(self.handle_leave_room(session_id, request_id)),
            Payload::ListRooms => Ok(self.handle_list_rooms(session_id, request_id)),
            Payload::RoomCreated(_)
            | Payload::RoomJoined(_)
            | Payload::RoomLeft(_)
            | Payload::RoomList(_)
            | Payload::RoomNameTaken(_)
            | Payload::RoomNotFound(_)
            | Payload::Error(_) => {
                Ok(self.reject(session_id, request_id, ErrorPayload::unsupported(opcode.to_u16())))
            },
        }
    }

    fn handle_update_username(
        &self,
        session_id: SessionId,
        request_id: u32,
        username: String,
    ) -> Vec<ServerAction> {
        match Username::new(username) {
            Ok(username) => {
                let message = format!("session {session_id} is now known as {username:?}");
                self.registry().set_username(session_id, username);
                vec![ServerAction::Log { level: LogLevel::Debug, message }]
            },
            Err(e) => self.reject(
                session_id,
                request_id,
                ErrorPayload::invalid_name(format!("invalid username: {e}")),
            ),
        }
    }

    fn handle_update_avatar(&self, session_id: SessionId, avatar: Avatar) -> Vec<ServerAction> {
        self.registry().set_avatar(session_id, avatar);
        vec![ServerAction::Log {
            level: LogLevel::Debug,
            message: format!("session {session_id} picked avatar {}", avatar.slug()),
        }]
    }

    /// Create or join a room on behalf of a session.
    ///
    /// The session first leaves its current room (destroying it if it was the
    /// last member), then the create or join is attempted. A join of the room
    /// the session is already in is confirmed without leaving. Replies go to
    /// the requester only.
    fn handle_room_request(
        &self,
        session_id: SessionId,
        request_id: u32,
        kind: RoomRequest,
        room: &RoomRef,
    ) -> Vec<ServerAction> {
        let (identified, previous) = {
            let registry = self.registry();
            let info = registry.session(session_id);
            (
                info.is_some_and(SessionInfo::is_identified),
                info.and_then(|info| info.room.clone()),
            )
        };

        if !identified {
            return self.reject(session_id, request_id, ErrorPayload::unidentified());
        }

        let room = match RoomName::try_from(room) {
            Ok(room) => room,
            Err(e) => {
                return self.reject(
                    session_id,
                    request_id,
                    ErrorPayload::invalid_name(format!("invalid room name: {e}")),
                );
            },
        };

        let mut actions = Vec::new();

        if kind == RoomRequest::Join && previous.as_ref() == Some(&room) {
            let confirmation = Payload::RoomJoined(RoomRef::from(&room));
            actions.extend(self.reply(session_id, request_id, confirmation));
            return actions;
        }

        if let Some(previous) = &previous {
            self.registry().set_room(session_id, None);
            actions.extend(self.leave_room(session_id, previous));
        }

        let result = match kind {
            RoomRequest::Create => self.rooms.create_room(&room, session_id, &self.env),
            RoomRequest::Join => self.rooms.join_room(&room, session_id).map(|_| ()),
        };

        match result {
            Ok(()) => {
                self.registry().set_room(session_id, Some(room.clone()));

                let (confirmation, verb) = match kind {
                    RoomRequest::Create => (Payload::RoomCreated(RoomRef::from(&room)), "created"),
                    RoomRequest::Join => (Payload::RoomJoined(RoomRef::from(&room)), "joined"),
                };
                actions.extend(self.reply(session_id, request_id, confirmation));
                actions.push(ServerAction::Log {
                    level: LogLevel::Info,
                    message: format!("session {session_id} {verb} room {room:?}"),
                });
            },
            Err(RoomError::RoomNameTaken(room)) => {
                let rejection = Payload::RoomNameTaken(RoomRejection::name_taken(room.as_str()));
                actions.extend(self.reply(session_id, request_id, rejection));
                actions.push(ServerAction::Log {
                    level: LogLevel::Debug,
                    message: format!("session {session_id} create denied, {room:?} is taken"),
                });
            },
            Err(RoomError::RoomNotFound(room)) => {
                let rejection = Payload::RoomNotFound(RoomRejection::not_found(room.as_str()));
                actions.extend(self.reply(session_id, request_id, rejection));
                actions.push(ServerAction::Log {
                    level: LogLevel::Debug,
                    message: format!("session {session_id} join denied, {room:?} not found"),
                });
            },
        }

        actions
    }

    fn handle_leave_room(&self, session_id: SessionId, request_id: u32) -> Vec<ServerAction> {
        let previous = self.registry().set_room(session_id, None).flatten();

        let Some(room) = previous else {
            return self.reject(session_id, request_id, ErrorPayload::not_in_room());
        };

        let mut actions = self.leave_room(session_id, &room);
        actions.extend(self.reply(session_id, request_id, Payload::RoomLeft(RoomRef::from(&room))));
        actions
    }

    fn handle_list_rooms(&self, session_id: SessionId, request_id: u32) -> Vec<ServerAction> {
        let identified =
            self.registry().session(session_id).is_some_and(SessionInfo::is_identified);
        if !identified {
            return self.reject(session_id, request_id, ErrorPayload::unidentified());
        }

        let rooms = self
            .rooms
            .list_rooms()
            .into_iter()
            .map(|(name, members)| RoomSummary {
                name: name.into_string(),
                members: u32::try_from(members).unwrap_or(u32::MAX),
            })
            .collect();

        self.reply(session_id, request_id, Payload::RoomList(RoomList { rooms }))
    }

    fn handle_connection_closed(&self, session_id: SessionId, reason: &str) -> Vec<ServerAction> {
        let info = self.registry().unregister_session(session_id);
        let Some(info) = info else {
            return Vec::new();
        };

        let mut actions = vec![ServerAction::Log {
            level: LogLevel::Info,
            message: format!(
                "connection {session_id} closed: {reason}, was in room {:?}",
                info.room.as_ref().map(RoomName::as_str)
            ),
        }];

        if let Some(room) = &info.room {
            actions.extend(self.leave_room(session_id, room));
        }

        actions
    }

    /// Remove a session from a room it is leaving, logging the outcome.
    fn leave_room(&self, session_id: SessionId, room: &RoomName) -> Vec<ServerAction> {
        match self.rooms.leave_room(room, session_id) {
            Ok(outcome) if outcome.destroyed => vec![ServerAction::Log {
                level: LogLevel::Info,
                message: format!("room {room:?} destroyed, last member {session_id} left"),
            }],
            Ok(outcome) => vec![ServerAction::Log {
                level: LogLevel::Debug,
                message: format!(
                    "session {session_id} left room {room:?}, {} remaining",
                    outcome.remaining
                ),
            }],
            Err(e) => vec![ServerAction::Log {
                level: LogLevel::Warn,
                message: format!("session {session_id} leaving {room:?}: {e}"),
            }],
        }
    }

    /// Frame a reply for the requesting session, echoing its request id.
    fn reply(&self, session_id: SessionId, request_id: u32, payload: Payload) -> Vec<ServerAction> {
        match payload.into_frame(request_id) {
            Ok(frame) => vec![ServerAction::SendToSession { session_id, frame }],
            Err(e) => vec![ServerAction::Log {
                level: LogLevel::Error,
                message: format!("failed to encode reply for {session_id}: {e}"),
            }],
        }
    }

    fn reject(
        &self,
        session_id: SessionId,
        request_id: u32,
        error: ErrorPayload,
    ) -> Vec<ServerAction> {
        let message = format!("rejected request {request_id} from {session_id}: {}", error.message);
        let mut actions = self.reply(session_id, request_id, Payload::Error(error));
        actions.push(ServerAction::Log { level: LogLevel::Warn, message });
        actions
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.registry().session_count()
    }

    /// Snapshot of a session's identity and room.
    pub fn session_info(&self, session_id: SessionId) -> Option<SessionInfo> {
        self.registry().session(session_id).cloned()
    }

    /// Room a session is currently in.
    pub fn current_room(&self, session_id: SessionId) -> Option<RoomName> {
        self.registry().current_room(session_id).cloned()
    }

    /// An active room holds `name`.
    pub fn has_room(&self, name: &RoomName) -> bool {
        self.rooms.has_room(name)
    }

    /// Members of a room, sorted.
    pub fn room_members(&self, name: &RoomName) -> Vec<SessionId> {
        self.rooms.members(name)
    }

    /// Number of active rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.room_count()
    }

    /// Room table.
    pub fn rooms(&self) -> &RoomManager<E::Instant> {
        &self.rooms
    }
}

impl<E: Environment> std::fmt::Debug for ServerDriver<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerDriver")
            .field("session_count", &self.session_count())
            .field("room_count", &self.room_count())
            .finish_non_exhaustive()
    }
}

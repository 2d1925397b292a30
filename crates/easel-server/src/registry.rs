//! Connection registry for per-session identity and room tracking.
//!
//! One entry per live connection: the display name and avatar it announced,
//! and the single room it currently belongs to. Room membership itself lives in
//! the [`crate::RoomManager`]; the registry only remembers which room to leave
//! when the session moves or disconnects.

use std::collections::HashMap;

use easel_core::{RoomName, SessionId, Username};
use easel_proto::Avatar;

/// Information about a registered session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionInfo {
    /// Display name, set by `update_username`
    pub username: Option<Username>,
    /// Avatar, set by `update_avatar`
    pub avatar: Avatar,
    /// Room the session is currently in
    pub room: Option<RoomName>,
}

impl SessionInfo {
    /// Create info for a fresh, unidentified session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a username has been associated with the session.
    pub fn is_identified(&self) -> bool {
        self.username.is_some()
    }
}

/// Registry of live sessions.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    sessions: HashMap<SessionId, SessionInfo>,
}

impl ConnectionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session.
    ///
    /// Returns `false` if the session already exists.
    pub fn register_session(&mut self, session_id: SessionId) -> bool {
        if self.sessions.contains_key(&session_id) {
            return false;
        }
        self.sessions.insert(session_id, SessionInfo::new());
        true
    }

    /// Unregister a session, returning its last known info.
    pub fn unregister_session(&mut self, session_id: SessionId) -> Option<SessionInfo> {
        self.sessions.remove(&session_id)
    }

    /// Session metadata. `None` if session doesn't exist.
    pub fn session(&self, session_id: SessionId) -> Option<&SessionInfo> {
        self.sessions.get(&session_id)
    }

    /// Check if a session is registered.
    pub fn has_session(&self, session_id: SessionId) -> bool {
        self.sessions.contains_key(&session_id)
    }

    /// Associate a display name. Idempotent.
    ///
    /// Returns `false` if the session doesn't exist.
    pub fn set_username(&mut self, session_id: SessionId, username: Username) -> bool {
        self.sessions.get_mut(&session_id).map(|info| info.username = Some(username)).is_some()
    }

    /// Associate an avatar. Idempotent.
    ///
    /// Returns `false` if the session doesn't exist.
    pub fn set_avatar(&mut self, session_id: SessionId, avatar: Avatar) -> bool {
        self.sessions.get_mut(&session_id).map(|info| info.avatar = avatar).is_some()
    }

    /// Record the session's current room, returning the previous one.
    ///
    /// Returns `None` if the session doesn't exist.
    pub fn set_room(
        &mut self,
        session_id: SessionId,
        room: Option<RoomName>,
    ) -> Option<Option<RoomName>> {
        self.sessions.get_mut(&session_id).map(|info| std::mem::replace(&mut info.room, room))
    }

    /// Room the session is currently in.
    pub fn current_room(&self, session_id: SessionId) -> Option<&RoomName> {
        self.sessions.get(&session_id).and_then(|info| info.room.as_ref())
    }

    /// Number of registered sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

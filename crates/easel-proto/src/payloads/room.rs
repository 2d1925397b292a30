//! Room lifecycle payloads.

use serde::{Deserialize, Serialize};

/// Room named by a request or a confirmation.
///
/// Used by `create_room`, `join_room`, `room_created`, `room_joined` and
/// `room_left`. The name is carried verbatim: the server compares names
/// case-sensitively and never trims them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRef {
    /// Room name
    pub room: String,
}

impl RoomRef {
    /// Create a reference to `room`.
    pub fn new(room: impl Into<String>) -> Self {
        Self { room: room.into() }
    }
}

/// Denial of a create or join request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRejection {
    /// Room the request named
    pub room: String,
    /// Human-readable message, shown to the requesting user verbatim
    pub message: String,
}

impl RoomRejection {
    /// Rejection for a `create_room` whose name is held by an active room.
    pub fn name_taken(room: impl Into<String>) -> Self {
        let room = room.into();
        let message = format!("Room \"{room}\" already exists. Pick another name.");
        Self { room, message }
    }

    /// Rejection for a `join_room` naming no active room.
    pub fn not_found(room: impl Into<String>) -> Self {
        let room = room.into();
        let message = format!("Room \"{room}\" does not exist.");
        Self { room, message }
    }
}

/// One active room in a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    /// Room name
    pub name: String,
    /// Number of connected members
    pub members: u32,
}

/// Listing of active rooms, sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomList {
    /// Active rooms
    pub rooms: Vec<RoomSummary>,
}

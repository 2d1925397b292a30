//! Client events and actions.

use easel_core::RoomName;
use easel_proto::{Avatar, Frame, payloads::room::RoomSummary};

use crate::session::ErrorSlot;

/// Events the caller feeds into the session.
///
/// The caller is responsible for:
/// - Forwarding user input (names, avatar, button presses)
/// - Receiving frames from the network
/// - Driving time forward via ticks
/// - Reporting loss of the connection
///
/// Generic over `I` (Instant type) so tests can drive a manual clock.
#[derive(Debug, Clone)]
pub enum ClientEvent<I = std::time::Instant> {
    /// User entered a username.
    ///
    /// Validated and stored locally. Nothing is sent until the next request.
    SetUsername(String),

    /// User picked an avatar.
    SetAvatar(Avatar),

    /// User edited the room-name field.
    ///
    /// Clears every error slot and abandons an outstanding create or join.
    EditRoomName(String),

    /// User asked to create a room.
    CreateRoom(String),

    /// User asked to join a room.
    JoinRoom(String),

    /// User asked to leave the current room.
    LeaveRoom,

    /// User asked for the list of active rooms.
    ListRooms,

    /// Frame received from server.
    FrameReceived(Frame),

    /// Time tick for timeout processing.
    Tick {
        /// Current time from the environment.
        now: I,
    },

    /// The connection to the server was lost.
    Disconnected,
}

/// Actions the session produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Send a frame to the server.
    Send(Frame),

    /// A create or join was confirmed; navigate into the room.
    EnterRoom {
        /// Confirmed room
        room: RoomName,
    },

    /// The session is no longer in this room.
    LeftRoom {
        /// Room that was left
        room: RoomName,
    },

    /// Show a message in one error slot.
    ShowError {
        /// Slot the message belongs to
        slot: ErrorSlot,
        /// Text shown to the user
        message: String,
    },

    /// Hide every error slot.
    ClearErrors,

    /// Active rooms, answering a list request.
    RoomsListed(Vec<RoomSummary>),

    /// Log message for debugging.
    Log {
        /// Log message.
        message: String,
    },
}

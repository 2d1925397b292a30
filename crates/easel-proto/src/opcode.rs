//! Named protocol events.

/// Operation code identifying which named event a frame carries.
///
/// Client-to-server requests live in `0x00xx`-`0x001x`, server confirmations in
/// `0x002x`, and rejections in `0x003x` and `0x00FF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Opcode {
    /// Associate a display name with the connection
    UpdateUsername = 0x0001,
    /// Associate an avatar with the connection
    UpdateAvatar = 0x0002,

    /// Attempt to create a room
    CreateRoom = 0x0010,
    /// Attempt to join an existing room
    JoinRoom = 0x0011,
    /// Leave the current room
    LeaveRoom = 0x0012,
    /// List active rooms
    ListRooms = 0x0013,

    /// Room creation confirmed
    RoomCreated = 0x0020,
    /// Room join confirmed
    RoomJoined = 0x0021,
    /// Room departure confirmed
    RoomLeft = 0x0022,
    /// Active rooms
    RoomList = 0x0023,

    /// Creation denied: an active room already holds the name
    RoomNameTaken = 0x0030,
    /// Join denied: no active room holds the name
    RoomNotFound = 0x0031,

    /// Generic request rejection
    Error = 0x00FF,
}

impl Opcode {
    /// Raw wire value.
    #[must_use]
    pub const fn to_u16(self) -> u16 {
        self as u16
    }

    /// Parse a raw wire value. `None` if unrecognized.
    #[must_use]
    pub const fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0001 => Some(Self::UpdateUsername),
            0x0002 => Some(Self::UpdateAvatar),
            0x0010 => Some(Self::CreateRoom),
            0x0011 => Some(Self::JoinRoom),
            0x0012 => Some(Self::LeaveRoom),
            0x0013 => Some(Self::ListRooms),
            0x0020 => Some(Self::RoomCreated),
            0x0021 => Some(Self::RoomJoined),
            0x0022 => Some(Self::RoomLeft),
            0x0023 => Some(Self::RoomList),
            0x0030 => Some(Self::RoomNameTaken),
            0x0031 => Some(Self::RoomNotFound),
            0x00FF => Some(Self::Error),
            _ => None,
        }
    }

    /// Event name as it appears in logs and the protocol table.
    #[must_use]
    pub const fn event_name(self) -> &'static str {
        match self {
            Self::UpdateUsername => "update_username",
            Self::UpdateAvatar => "update_avatar",
            Self::CreateRoom => "create_room",
            Self::JoinRoom => "join_room",
            Self::LeaveRoom => "leave_room",
            Self::ListRooms => "list_rooms",
            Self::RoomCreated => "room_created",
            Self::RoomJoined => "room_joined",
            Self::RoomLeft => "room_left",
            Self::RoomList => "room_list",
            Self::RoomNameTaken => "room_name_taken",
            Self::RoomNotFound => "room_not_found",
            Self::Error => "error",
        }
    }

    /// Whether clients may send this opcode to the server.
    #[must_use]
    pub const fn is_request(self) -> bool {
        matches!(
            self,
            Self::UpdateUsername
                | Self::UpdateAvatar
                | Self::CreateRoom
                | Self::JoinRoom
                | Self::LeaveRoom
                | Self::ListRooms
        )
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.event_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Opcode; 13] = [
        Opcode::UpdateUsername,
        Opcode::UpdateAvatar,
        Opcode::CreateRoom,
        Opcode::JoinRoom,
        Opcode::LeaveRoom,
        Opcode::ListRooms,
        Opcode::RoomCreated,
        Opcode::RoomJoined,
        Opcode::RoomLeft,
        Opcode::RoomList,
        Opcode::RoomNameTaken,
        Opcode::RoomNotFound,
        Opcode::Error,
    ];

    #[test]
    fn wire_values_are_stable() {
        for opcode in ALL {
            assert_eq!(Opcode::from_u16(opcode.to_u16()), Some(opcode));
        }
        assert_eq!(Opcode::RoomNameTaken.to_u16(), 0x0030);
        assert_eq!(Opcode::from_u16(0x1234), None);
    }

    #[test]
    fn only_client_events_are_requests() {
        let requests: Vec<_> = ALL.iter().filter(|op| op.is_request()).collect();
        assert_eq!(requests.len(), 6);
        assert!(!Opcode::RoomCreated.is_request());
        assert!(!Opcode::Error.is_request());
    }

    #[test]
    fn display_uses_event_name() {
        assert_eq!(Opcode::RoomNotFound.to_string(), "room_not_found");
    }
}

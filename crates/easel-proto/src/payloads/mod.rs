//! CBOR-encoded protocol messages.
//!
//! Frame headers are raw binary, payloads are CBOR. The opcode in the header
//! identifies the payload type, so only the inner struct is serialized (no
//! variant tag).
//!
//! # Invariants
//!
//! Each payload variant maps to exactly one opcode (enforced by match
//! exhaustiveness).

pub mod identity;
pub mod room;

use bytes::BufMut;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

pub use self::identity::Avatar;
use crate::{
    Frame, FrameHeader, Opcode,
    errors::{ProtocolError, Result},
};

/// All possible frame payloads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    // Identity
    /// Associate a display name with the connection
    UpdateUsername(identity::UpdateUsername),
    /// Associate an avatar with the connection
    UpdateAvatar(identity::UpdateAvatar),

    // Requests
    /// Attempt to create a room
    CreateRoom(room::RoomRef),
    /// Attempt to join a room
    JoinRoom(room::RoomRef),
    /// Leave the current room
    LeaveRoom,
    /// List active rooms
    ListRooms,

    // Confirmations
    /// Room created, requester is its sole member
    RoomCreated(room::RoomRef),
    /// Room joined
    RoomJoined(room::RoomRef),
    /// Room left
    RoomLeft(room::RoomRef),
    /// Active rooms
    RoomList(room::RoomList),

    // Rejections
    /// Create denied, name held by an active room
    RoomNameTaken(room::RoomRejection),
    /// Join denied, no active room holds the name
    RoomNotFound(room::RoomRejection),
    /// Generic rejection
    Error(ErrorPayload),
}

/// Error payload for error frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Error code identifying the type of error.
    pub code: u16,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorPayload {
    /// Connection has no username yet.
    pub const UNIDENTIFIED: u16 = 0x0001;
    /// Username or room name failed validation.
    pub const INVALID_NAME: u16 = 0x0002;
    /// Payload could not be decoded.
    pub const INVALID_PAYLOAD: u16 = 0x0003;
    /// Opcode is not accepted from clients.
    pub const UNSUPPORTED: u16 = 0x0004;
    /// Operation requires room membership.
    pub const NOT_IN_ROOM: u16 = 0x0005;

    /// Create an unidentified-connection error.
    pub fn unidentified() -> Self {
        Self { code: Self::UNIDENTIFIED, message: "set a username before using rooms".into() }
    }

    /// Create an invalid-name error.
    pub fn invalid_name(msg: impl Into<String>) -> Self {
        Self { code: Self::INVALID_NAME, message: msg.into() }
    }

    /// Create an invalid payload error.
    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        Self { code: Self::INVALID_PAYLOAD, message: msg.into() }
    }

    /// Create an unsupported-opcode error.
    pub fn unsupported(opcode: u16) -> Self {
        Self { code: Self::UNSUPPORTED, message: format!("unsupported opcode: {opcode:#06x}") }
    }

    /// Create a not-in-room error.
    pub fn not_in_room() -> Self {
        Self { code: Self::NOT_IN_ROOM, message: "not in a room".into() }
    }
}

impl Payload {
    /// Opcode corresponding to this payload type.
    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::UpdateUsername(_) => Opcode::UpdateUsername,
            Self::UpdateAvatar(_) => Opcode::UpdateAvatar,
            Self::CreateRoom(_) => Opcode::CreateRoom,
            Self::JoinRoom(_) => Opcode::JoinRoom,
            Self::LeaveRoom => Opcode::LeaveRoom,
            Self::ListRooms => Opcode::ListRooms,
            Self::RoomCreated(_) => Opcode::RoomCreated,
            Self::RoomJoined(_) => Opcode::RoomJoined,
            Self::RoomLeft(_) => Opcode::RoomLeft,
            Self::RoomList(_) => Opcode::RoomList,
            Self::RoomNameTaken(_) => Opcode::RoomNameTaken,
            Self::RoomNotFound(_) => Opcode::RoomNotFound,
            Self::Error(_) => Opcode::Error,
        }
    }

    /// Encode payload to buffer
    ///
    /// Serializes only the inner struct, NOT the variant tag. Size limits are
    /// enforced later by [`Frame::encode`].
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborEncode` if serialization fails
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        let mut writer = dst.writer();

        match self {
            Self::UpdateUsername(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::UpdateAvatar(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::CreateRoom(inner)
            | Self::JoinRoom(inner)
            | Self::RoomCreated(inner)
            | Self::RoomJoined(inner)
            | Self::RoomLeft(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::LeaveRoom | Self::ListRooms => Ok(()), // Zero-byte payloads
            Self::RoomList(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::RoomNameTaken(inner) | Self::RoomNotFound(inner) => {
                ciborium::ser::into_writer(inner, &mut writer)
            },
            Self::Error(inner) => ciborium::ser::into_writer(inner, &mut writer),
        }
        .map_err(|e| ProtocolError::CborEncode(e.to_string()))
    }

    /// Decode payload from bytes based on opcode
    ///
    /// The size check happens before CBOR parsing begins.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::PayloadTooLarge` if bytes exceed `MAX_PAYLOAD_SIZE`
    /// - `ProtocolError::CborDecode` if CBOR deserialization fails
    pub fn decode(opcode: Opcode, bytes: &[u8]) -> Result<Self> {
        if bytes.len() > FrameHeader::MAX_PAYLOAD_SIZE as usize {
            return Err(ProtocolError::PayloadTooLarge {
                size: bytes.len(),
                max: FrameHeader::MAX_PAYLOAD_SIZE as usize,
            });
        }

        let payload = match opcode {
            Opcode::UpdateUsername => Self::UpdateUsername(from_cbor(bytes)?),
            Opcode::UpdateAvatar => Self::UpdateAvatar(from_cbor(bytes)?),
            Opcode::CreateRoom => Self::CreateRoom(from_cbor(bytes)?),
            Opcode::JoinRoom => Self::JoinRoom(from_cbor(bytes)?),
            Opcode::LeaveRoom => Self::LeaveRoom,
            Opcode::ListRooms => Self::ListRooms,
            Opcode::RoomCreated => Self::RoomCreated(from_cbor(bytes)?),
            Opcode::RoomJoined => Self::RoomJoined(from_cbor(bytes)?),
            Opcode::RoomLeft => Self::RoomLeft(from_cbor(bytes)?),
            Opcode::RoomList => Self::RoomList(from_cbor(bytes)?),
            Opcode::RoomNameTaken => Self::RoomNameTaken(from_cbor(bytes)?),
            Opcode::RoomNotFound => Self::RoomNotFound(from_cbor(bytes)?),
            Opcode::Error => Self::Error(from_cbor(bytes)?),
        };

        Ok(payload)
    }

    /// Convert payload into a transport frame carrying `request_id`.
    ///
    /// Uncorrelated frames use request id 0.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborEncode` if serialization fails
    pub fn into_frame(self, request_id: u32) -> Result<Frame> {
        let mut buf = Vec::new();
        self.encode(&mut buf)?;
        let mut header = FrameHeader::new(self.opcode());
        header.set_request_id(request_id);
        Ok(Frame::new(header, buf))
    }

    /// Parse payload from a raw transport frame
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnknownOpcode` if the opcode is not recognized
    /// - `ProtocolError::CborDecode` if CBOR deserialization fails
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        let opcode = frame
            .header
            .opcode_enum()
            .ok_or_else(|| ProtocolError::UnknownOpcode(frame.header.opcode()))?;
        Self::decode(opcode, &frame.payload)
    }
}

fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::CborDecode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_room_carries_request_id() {
        let payload = Payload::CreateRoom(room::RoomRef::new("lobby"));

        let frame = payload.clone().into_frame(7).expect("should create frame");
        assert_eq!(frame.opcode(), Some(Opcode::CreateRoom));
        assert_eq!(frame.request_id(), 7);

        let decoded = Payload::from_frame(&frame).expect("should parse payload");
        assert_eq!(payload, decoded);
    }

    #[test]
    fn empty_payloads_have_no_bytes() {
        let frame = Payload::ListRooms.into_frame(3).expect("frame");
        assert!(frame.payload.is_empty());
        assert_eq!(Payload::from_frame(&frame).expect("decode"), Payload::ListRooms);
    }

    #[test]
    fn room_name_is_not_normalized() {
        let payload = Payload::JoinRoom(room::RoomRef::new("  Lobby "));
        let frame = payload.into_frame(1).expect("frame");
        let Payload::JoinRoom(decoded) = Payload::from_frame(&frame).expect("decode") else {
            panic!("wrong variant");
        };
        assert_eq!(decoded.room, "  Lobby ");
    }

    #[test]
    fn rejection_round_trip() {
        let payload = Payload::RoomNameTaken(room::RoomRejection::name_taken("lobby"));
        let frame = payload.clone().into_frame(2).expect("frame");
        assert_eq!(Payload::from_frame(&frame).expect("decode"), payload);
    }

    #[test]
    fn avatar_encodes_as_snake_case() {
        let payload =
            Payload::UpdateAvatar(identity::UpdateAvatar { avatar: Avatar::SantasLittleHelper });
        let frame = payload.clone().into_frame(0).expect("frame");

        let value: ciborium::Value =
            ciborium::de::from_reader(&frame.payload[..]).expect("valid cbor");
        let text = format!("{value:?}");
        assert!(text.contains("santas_little_helper"));
        assert_eq!(Payload::from_frame(&frame).expect("decode"), payload);
    }

    #[test]
    fn unknown_opcode_is_rejected() {
        let mut header = FrameHeader::new(Opcode::Error);
        header.opcode = 0x7777u16.to_be_bytes();
        let frame = Frame::new(header, Vec::new());

        assert_eq!(Payload::from_frame(&frame), Err(ProtocolError::UnknownOpcode(0x7777)));
    }

    #[test]
    fn garbage_payload_is_decode_error() {
        let frame = Frame::new(FrameHeader::new(Opcode::CreateRoom), vec![0xFF, 0x00, 0x13]);
        assert!(matches!(Payload::from_frame(&frame), Err(ProtocolError::CborDecode(_))));
    }
}

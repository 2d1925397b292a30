//! Frame header implementation with zero-copy parsing.
//!
//! The `FrameHeader` is a fixed 16-byte structure serialized as raw binary
//! (Big Endian). The opcode and request id can be read without touching the
//! CBOR payload.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{
    Opcode,
    errors::{ProtocolError, Result},
};

/// Fixed 16-byte frame header (Big Endian network byte order)
///
/// Fields are stored as raw byte arrays so every 16-byte pattern is a valid
/// value and the struct can be cast from untrusted network bytes.
///
/// | Bytes | Field |
/// |-------|-------|
/// | 0-3   | magic (`"EASL"`) |
/// | 4     | version |
/// | 5     | flags (reserved) |
/// | 6-7   | opcode |
/// | 8-11  | request id (0 = uncorrelated) |
/// | 12-15 | payload size |
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct FrameHeader {
    magic: [u8; 4],
    version: u8,
    flags: u8,
    pub(crate) opcode: [u8; 2],
    request_id: [u8; 4],
    pub(crate) payload_size: [u8; 4],
}

impl FrameHeader {
    /// Size of the serialized header
    pub const SIZE: usize = 16;

    /// Magic number: "EASL" in ASCII
    pub const MAGIC: u32 = 0x4541_534C;

    /// Current protocol version
    pub const VERSION: u8 = 0x01;

    /// Maximum payload size (64 KiB)
    pub const MAX_PAYLOAD_SIZE: u32 = 64 * 1024;

    /// Create a new header with the specified opcode and no request id.
    #[must_use]
    pub fn new(opcode: Opcode) -> Self {
        Self {
            magic: Self::MAGIC.to_be_bytes(),
            version: Self::VERSION,
            flags: 0,
            opcode: opcode.to_u16().to_be_bytes(),
            request_id: [0; 4],
            payload_size: [0; 4],
        }
    }

    /// Parse header from network bytes (zero-copy)
    ///
    /// Checks are ordered cheapest first so garbage input fails fast.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::FrameTooShort` if buffer is shorter than 16 bytes
    /// - `ProtocolError::InvalidMagic` if magic number is invalid
    /// - `ProtocolError::UnsupportedVersion` if protocol version is unsupported
    /// - `ProtocolError::PayloadTooLarge` if payload size exceeds maximum
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        let header = Self::ref_from_prefix(bytes)
            .map_err(|_| ProtocolError::FrameTooShort {
                expected: Self::SIZE,
                actual: bytes.len(),
            })?
            .0;

        if u32::from_be_bytes(header.magic) != Self::MAGIC {
            return Err(ProtocolError::InvalidMagic);
        }

        if header.version != Self::VERSION {
            return Err(ProtocolError::UnsupportedVersion(header.version));
        }

        let payload_size = u32::from_be_bytes(header.payload_size);
        if payload_size > Self::MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload_size as usize,
                max: Self::MAX_PAYLOAD_SIZE as usize,
            });
        }

        Ok(header)
    }

    /// Serialize header to bytes
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(IntoBytes::as_bytes(self));
        arr
    }

    /// Protocol magic number.
    #[must_use]
    pub fn magic(&self) -> u32 {
        u32::from_be_bytes(self.magic)
    }

    /// Protocol version byte.
    #[must_use]
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Reserved flag bits. Always zero in version 1.
    #[must_use]
    pub fn flags(&self) -> u8 {
        self.flags
    }

    /// Operation code as raw u16.
    #[must_use]
    pub fn opcode(&self) -> u16 {
        u16::from_be_bytes(self.opcode)
    }

    /// Operation code as enum. `None` if unrecognized.
    #[must_use]
    pub fn opcode_enum(&self) -> Option<Opcode> {
        Opcode::from_u16(self.opcode())
    }

    /// Client-assigned token correlating a response with its request.
    #[must_use]
    pub fn request_id(&self) -> u32 {
        u32::from_be_bytes(self.request_id)
    }

    /// Payload size in bytes.
    #[must_use]
    pub fn payload_size(&self) -> u32 {
        u32::from_be_bytes(self.payload_size)
    }

    /// Set the request token. Servers echo the request's token on replies.
    pub fn set_request_id(&mut self, request_id: u32) {
        self.request_id = request_id.to_be_bytes();
    }

    /// Set payload size. [`crate::Frame::new`] does this automatically.
    pub fn set_payload_size(&mut self, size: u32) {
        self.payload_size = size.to_be_bytes();
    }
}

// Manual Debug implementation (can't derive due to packed repr)
impl std::fmt::Debug for FrameHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("FrameHeader");
        s.field("magic", &format!("{:#010x}", self.magic()))
            .field("version", &self.version())
            .field("flags", &self.flags());
        match self.opcode_enum() {
            Some(opcode) => s.field("opcode", &opcode),
            None => s.field("opcode", &format!("{:#06x}", self.opcode())),
        };
        s.field("request_id", &self.request_id())
            .field("payload_size", &self.payload_size())
            .finish()
    }
}

// Manual PartialEq implementation (can't derive due to packed repr)
impl PartialEq for FrameHeader {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for FrameHeader {}

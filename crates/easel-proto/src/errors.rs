//! Protocol errors.

use thiserror::Error;

/// Errors raised while framing or (de)serializing protocol messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Buffer is shorter than a frame header.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Minimum number of bytes required
        expected: usize,
        /// Bytes available
        actual: usize,
    },

    /// Header does not start with the protocol magic.
    #[error("invalid magic number")]
    InvalidMagic,

    /// Header carries a version this build does not speak.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// Payload exceeds [`crate::FrameHeader::MAX_PAYLOAD_SIZE`].
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Claimed or actual payload size
        size: usize,
        /// Protocol limit
        max: usize,
    },

    /// Fewer payload bytes than the header claims.
    #[error("frame truncated: expected {expected} payload bytes, got {actual}")]
    FrameTruncated {
        /// Payload size claimed by the header
        expected: usize,
        /// Payload bytes available
        actual: usize,
    },

    /// Opcode is not part of the protocol.
    #[error("unknown opcode: {0:#06x}")]
    UnknownOpcode(u16),

    /// CBOR serialization failed.
    #[error("CBOR encode error: {0}")]
    CborEncode(String),

    /// CBOR deserialization failed.
    #[error("CBOR decode error: {0}")]
    CborDecode(String),
}

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

//! Protocol
//!
//! Wire format for the Easel room protocol. Every message on the connection
//! channel is a [`Frame`]: a fixed 16-byte binary [`FrameHeader`] followed by
//! a CBOR-encoded [`Payload`].
//!
//! The header carries the [`Opcode`] (which named event this is) and the
//! request id that correlates a response with the request that caused it.
//! Routing and correlation never require decoding the payload.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
mod frame;
mod header;
mod opcode;
pub mod payloads;

pub use errors::{ProtocolError, Result};
pub use frame::Frame;
pub use header::FrameHeader;
pub use opcode::Opcode;
pub use payloads::{Avatar, ErrorPayload, Payload};

/// ALPN protocol identifier negotiated during the QUIC handshake.
pub const ALPN_PROTOCOL: &[u8] = b"easel";

//! Client error types.

use easel_core::NameError;
use thiserror::Error;

/// Errors returned by [`crate::Session::handle`].
///
/// Every variant is detected locally. When one is returned the session emitted
/// no frames.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// A room operation was attempted before a username was set.
    #[error("set a username before creating or joining a room")]
    Unidentified,

    /// A username or room name failed validation.
    #[error("invalid name: {0}")]
    InvalidName(#[from] NameError),

    /// The channel to the server is gone.
    #[error("disconnected from server")]
    Disconnected,

    /// Leave was requested outside a room.
    #[error("not in a room")]
    NotInRoom,

    /// Failed to build an outgoing frame.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<easel_proto::ProtocolError> for ClientError {
    fn from(err: easel_proto::ProtocolError) -> Self {
        Self::Protocol(err.to_string())
    }
}

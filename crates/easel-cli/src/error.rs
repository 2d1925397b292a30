//! CLI runtime errors.

use easel_client::{ClientError, transport::TransportError};
use thiserror::Error;

/// Errors that end a CLI run.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Could not reach the server.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The session refused the input.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The connection closed while a request was outstanding.
    #[error("disconnected from server")]
    Disconnected,

    /// The server never answered.
    #[error("no answer from server within {0:?}")]
    TimedOut(std::time::Duration),

    /// Unknown avatar name on the command line.
    #[error("unknown avatar {0:?}")]
    UnknownAvatar(String),
}

//! Server error types.

use std::fmt;

use crate::server_error::ServerError as DriverError;

/// Errors that can occur in the server runtime.
#[derive(Debug)]
pub enum ServerError {
    /// Configuration error (invalid bind address, missing TLS certs, etc.).
    ///
    /// Fatal at startup. Fix configuration and restart.
    Config(String),

    /// Transport/network error (connection failure, stream I/O, etc.).
    ///
    /// Fatal for the affected connection only.
    Transport(String),

    /// Protocol error (undecodable frame header on a stream).
    ///
    /// The stream cannot be resynchronized, so the connection is dropped.
    Protocol(String),

    /// Driver error (from `ServerDriver` processing).
    Driver(DriverError),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Self::Driver(err) => write!(f, "driver error: {err}"),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Driver(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DriverError> for ServerError {
    fn from(err: DriverError) -> Self {
        Self::Driver(err)
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<easel_proto::ProtocolError> for ServerError {
    fn from(err: easel_proto::ProtocolError) -> Self {
        Self::Protocol(err.to_string())
    }
}

//! Driver error types.
//!
//! Errors the [`crate::ServerDriver`] returns to its runtime. Request-level
//! failures (taken names, missing rooms, malformed payloads) never surface
//! here: they become reply frames for the requesting session.

use std::fmt;

use easel_core::SessionId;

/// Errors that can occur during driver operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerError {
    /// Session not found in registry.
    ///
    /// A frame arrived for a connection the driver never accepted or already
    /// closed. The runtime should drop the frame.
    SessionNotFound(SessionId),

    /// Session already registered.
    ///
    /// The runtime reused a session id. Session ids must be unique.
    SessionAlreadyExists(SessionId),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionNotFound(id) => write!(f, "session not found: {id}"),
            Self::SessionAlreadyExists(id) => write!(f, "session already exists: {id}"),
        }
    }
}

impl std::error::Error for ServerError {}

//! Core
//!
//! Domain types shared by the Easel server and client:
//!
//! - [`Username`] and [`RoomName`]: validated, verbatim, case-sensitive names
//! - [`SessionId`] and [`RequestId`]: connection handles and request tokens
//! - [`env::Environment`]: time and randomness, injected so protocol logic can
//!   run against a manual clock in tests
//!
//! The `system` feature adds `system_env::SystemEnv`, the real-clock
//! environment, and `test-utils` adds `test_env::ManualEnv`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod env;
mod error;
mod names;
#[cfg(feature = "system")]
pub mod system_env;
#[cfg(feature = "test-utils")]
pub mod test_env;

pub use error::NameError;
pub use names::{MAX_NAME_CHARS, RoomName, Username};

/// Server-assigned handle for one client connection.
pub type SessionId = u64;

/// Client-assigned token correlating a response with its request.
///
/// Tokens are monotonically increasing per client, starting at 1. Zero marks
/// frames that answer no particular request.
pub type RequestId = u32;

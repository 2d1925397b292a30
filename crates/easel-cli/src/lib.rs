//! Easel command-line client.
//!
//! Connects over QUIC, announces a username and avatar, and runs one create,
//! join or list request through a [`runtime::Runtime`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
pub mod runtime;

pub use error::RuntimeError;
pub use runtime::{Command, Outcome, Runtime, RuntimeConfig};

//! Client
//!
//! Action-based client session for the Easel room protocol. Tracks identity,
//! the outstanding create/join request, the confirmed room and the error
//! messages shown to the user.
//!
//! # Architecture
//!
//! The session is Sans-IO. It receives events ([`ClientEvent`]), processes
//! them through pure state machine logic, and returns actions
//! ([`ClientAction`]) for the caller to execute.
//!
//! # Components
//!
//! - [`Session`]: Room lifecycle state machine for one connection
//! - [`ClientEvent`]: Events fed into the session
//! - [`ClientAction`]: Actions produced by the session
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::ConnectedClient`]: Frame channels over one QUIC stream
//! - [`transport::connect`]: Connect to a server

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod event;
mod session;

#[cfg(feature = "transport")]
pub mod transport;

pub use easel_core::{RoomName, Username, env::Environment};
pub use error::ClientError;
pub use event::{ClientAction, ClientEvent};
pub use session::{
    ErrorSlot, PendingErrors, PendingRequest, RequestKind, Session, SessionConfig, SessionState,
    TIMEOUT_MESSAGE,
};

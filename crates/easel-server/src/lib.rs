//! Easel room server.
//!
//! Authoritative owner of the room table. Clients connect over QUIC, announce
//! a username and avatar, then create, join, leave and list rooms. Every
//! request is answered on the requester's own stream, echoing its request id.
//!
//! # Architecture
//!
//! [`ServerDriver`] is pure logic: it consumes [`ServerEvent`]s and returns
//! [`ServerAction`]s. [`Server`] is the production runtime that executes those
//! actions with Quinn and Tokio.
//!
//! # Components
//!
//! - [`ServerDriver`]: Action-based orchestrator (pure logic, no I/O)
//! - [`RoomManager`]: Room table with per-name locking
//! - [`ConnectionRegistry`]: Per-session identity and current room
//! - [`Server`]: Production runtime that executes driver actions
//! - [`QuinnTransport`]: QUIC transport via Quinn
//! - [`SystemEnv`]: Production environment (real time, OS RNG)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod driver;
mod error;
mod registry;
mod room_manager;
mod server_error;
mod transport;

use std::{collections::HashMap, sync::Arc};

use bytes::BytesMut;
pub use driver::{LogLevel, ServerAction, ServerConfig as DriverConfig, ServerDriver, ServerEvent};
use easel_core::{SessionId, env::Environment};
use easel_proto::Frame;
pub use error::ServerError;
pub use registry::{ConnectionRegistry, SessionInfo};
pub use room_manager::{LeaveError, LeaveOutcome, RoomError, RoomManager, RoomMetadata};
pub use server_error::ServerError as DriverError;
pub use easel_core::system_env::SystemEnv;
use tokio::sync::{RwLock, mpsc};
pub use transport::{QuinnConnection, QuinnTransport};

/// Shared state for all connections.
///
/// Routes driver actions to the connection they name.
#[derive(Default)]
struct SharedState {
    /// Session ID to QUIC connection (for closing)
    connections: RwLock<HashMap<SessionId, QuinnConnection>>,
    /// Session ID to the queue feeding its writer task.
    ///
    /// One writer per session keeps replies in the order the driver produced
    /// them.
    outbound: RwLock<HashMap<SessionId, mpsc::Sender<Frame>>>,
}

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "0.0.0.0:4433")
    pub bind_address: String,
    /// Path to TLS certificate (PEM format)
    pub cert_path: Option<String>,
    /// Path to TLS private key (PEM format)
    pub key_path: Option<String>,
    /// Driver configuration (limits)
    pub driver: DriverConfig,
    /// Frames buffered per session before the driver waits on a slow reader
    pub outbound_capacity: usize,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4433".to_string(),
            cert_path: None,
            key_path: None,
            driver: DriverConfig::default(),
            outbound_capacity: 64,
        }
    }
}

/// Production Easel server.
///
/// Wraps [`ServerDriver`] with Quinn QUIC transport and the system
/// environment.
pub struct Server {
    driver: Arc<ServerDriver<SystemEnv>>,
    transport: QuinnTransport,
    env: SystemEnv,
    outbound_capacity: usize,
}

impl Server {
    /// Create and bind a new server.
    pub fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        let env = SystemEnv::new();
        let driver = Arc::new(ServerDriver::new(env.clone(), config.driver));

        let transport =
            QuinnTransport::bind(&config.bind_address, config.cert_path, config.key_path)?;

        Ok(Self { driver, transport, env, outbound_capacity: config.outbound_capacity.max(1) })
    }

    /// Driver shared by every connection task.
    pub fn driver(&self) -> Arc<ServerDriver<SystemEnv>> {
        Arc::clone(&self.driver)
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, ServerError> {
        self.transport.local_addr()
    }

    /// Run the server, accepting connections and processing frames.
    ///
    /// Returns once the endpoint is closed.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("Server starting on {}", self.transport.local_addr()?);

        let shared = Arc::new(SharedState::default());

        loop {
            match self.transport.accept().await {
                Ok(Some(conn)) => {
                    let driver = Arc::clone(&self.driver);
                    let shared = Arc::clone(&shared);
                    let env = self.env.clone();
                    let capacity = self.outbound_capacity;

                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, driver, shared, env, capacity).await
                        {
                            tracing::error!("Connection error: {}", e);
                        }
                    });
                },
                Ok(None) => {
                    tracing::info!("Endpoint closed, server stopping");
                    return Ok(());
                },
                Err(e) => {
                    tracing::warn!("Accept error: {}", e);
                },
            }
        }
    }
}

/// Handle a single QUIC connection for its whole lifetime.
async fn handle_connection(
    conn: QuinnConnection,
    driver: Arc<ServerDriver<SystemEnv>>,
    shared: Arc<SharedState>,
    env: SystemEnv,
    outbound_capacity: usize,
) -> Result<(), ServerError> {
    let session_id = env.random_u64();

    tracing::debug!("New connection {} from {}", session_id, conn.remote_addr());

    shared.connections.write().await.insert(session_id, conn.clone());

    let actions = match driver.process_event(ServerEvent::ConnectionAccepted { session_id }) {
        Ok(actions) => actions,
        Err(e) => {
            shared.connections.write().await.remove(&session_id);
            conn.close(1u32.into(), b"session id collision");
            return Err(e.into());
        },
    };
    execute_actions(actions, &shared).await;

    if driver.session_info(session_id).is_none() {
        return Ok(());
    }

    let result = serve_session(session_id, &conn, &driver, &shared, outbound_capacity).await;

    shared.outbound.write().await.remove(&session_id);
    shared.connections.write().await.remove(&session_id);

    let reason = match &result {
        Ok(()) => "stream finished".to_string(),
        Err(e) => e.to_string(),
    };
    let actions = driver.process_event(ServerEvent::ConnectionClosed { session_id, reason })?;
    execute_actions(actions, &shared).await;

    result
}

/// Accept the session stream and pump frames until the client goes away.
async fn serve_session(
    session_id: SessionId,
    conn: &QuinnConnection,
    driver: &ServerDriver<SystemEnv>,
    shared: &SharedState,
    outbound_capacity: usize,
) -> Result<(), ServerError> {
    let (send, mut recv) = conn.accept_bi().await?;

    let (tx, rx) = mpsc::channel(outbound_capacity);
    shared.outbound.write().await.insert(session_id, tx);
    tokio::spawn(write_frames(session_id, send, rx));

    let mut buf = BytesMut::with_capacity(4096);
    let mut chunk = vec![0u8; 4096];

    loop {
        while let Some(frame) = Frame::take_from(&mut buf)? {
            match driver.process_event(ServerEvent::FrameReceived { session_id, frame }) {
                Ok(actions) => execute_actions(actions, shared).await,
                Err(e) => tracing::warn!("Frame processing error: {}", e),
            }
        }

        match recv.read(&mut chunk).await {
            Ok(Some(n)) => buf.extend_from_slice(&chunk[..n]),
            Ok(None) => return Ok(()),
            Err(e) => return Err(ServerError::Transport(format!("read failed: {e}"))),
        }
    }
}

/// Drain a session's outbound queue onto its stream.
///
/// Ends when the queue's sender is dropped or the peer stops reading.
async fn write_frames(
    session_id: SessionId,
    mut send: quinn::SendStream,
    mut rx: mpsc::Receiver<Frame>,
) {
    let mut buf = BytesMut::new();

    while let Some(frame) = rx.recv().await {
        buf.clear();
        if let Err(e) = frame.encode(&mut buf) {
            tracing::error!("Failed to encode frame for {}: {}", session_id, e);
            continue;
        }
        if let Err(e) = send.write_all(&buf).await {
            tracing::debug!("Write to {} failed: {}", session_id, e);
            return;
        }
    }

    if let Err(e) = send.finish() {
        tracing::debug!("Finishing stream for {} failed: {}", session_id, e);
    }
}

/// Execute server actions.
async fn execute_actions(actions: Vec<ServerAction>, shared: &SharedState) {
    for action in actions {
        match action {
            ServerAction::SendToSession { session_id, frame } => {
                let sender = shared.outbound.read().await.get(&session_id).cloned();
                match sender {
                    Some(sender) => {
                        if sender.send(frame).await.is_err() {
                            tracing::debug!("SendToSession: writer for {} is gone", session_id);
                        }
                    },
                    None => tracing::warn!("SendToSession: session {} not found", session_id),
                }
            },

            ServerAction::CloseConnection { session_id, reason } => {
                tracing::info!("Closing connection {}: {}", session_id, reason);
                let conn = shared.connections.write().await.remove(&session_id);
                if let Some(conn) = conn {
                    conn.close(0u32.into(), reason.as_bytes());
                }
            },

            ServerAction::Log { level, message } => match level {
                LogLevel::Debug => tracing::debug!("{}", message),
                LogLevel::Info => tracing::info!("{}", message),
                LogLevel::Warn => tracing::warn!("{}", message),
                LogLevel::Error => tracing::error!("{}", message),
            },
        }
    }
}

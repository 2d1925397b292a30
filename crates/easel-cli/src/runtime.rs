//! Runtime driving one [`Session`] over a pair of frame channels.
//!
//! The channels usually come from [`easel_client::transport::ConnectedClient`],
//! but any pair works, which is how the tests attach an in-process server.

use std::time::Duration;

use easel_client::{
    ClientAction, ClientEvent, Environment, ErrorSlot, RoomName, Session, SessionConfig,
};
use easel_proto::{Avatar, Frame, payloads::room::RoomSummary};
use tokio::{sync::mpsc, time::MissedTickBehavior};

use crate::error::RuntimeError;

/// One user request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a room with this name.
    Create(String),
    /// Join the room with this name.
    Join(String),
    /// List active rooms.
    List,
}

/// How the server answered a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Create or join confirmed.
    Entered(RoomName),
    /// Request denied; the message is meant for the user.
    Rejected {
        /// Error slot the message landed in
        slot: ErrorSlot,
        /// Message text
        message: String,
    },
    /// Active rooms.
    Listed(Vec<RoomSummary>),
}

/// Runtime tuning.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Session settings, including the request timeout
    pub session: SessionConfig,
    /// How often the session is ticked while waiting
    pub tick_interval: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { session: SessionConfig::default(), tick_interval: Duration::from_millis(250) }
    }
}

/// Drives a session: feeds it commands, frames and ticks, and executes the
/// actions it returns.
pub struct Runtime<E: Environment> {
    env: E,
    session: Session<E>,
    to_server: mpsc::Sender<Frame>,
    from_server: mpsc::Receiver<Frame>,
    tick_interval: Duration,
    request_timeout: Duration,
}

impl<E: Environment> Runtime<E> {
    /// Create a runtime for a freshly opened connection.
    pub fn new(
        env: E,
        to_server: mpsc::Sender<Frame>,
        from_server: mpsc::Receiver<Frame>,
        config: RuntimeConfig,
    ) -> Self {
        let request_timeout = config.session.request_timeout;
        Self {
            session: Session::new(env.clone(), config.session),
            env,
            to_server,
            from_server,
            tick_interval: config.tick_interval,
            request_timeout,
        }
    }

    /// The underlying session.
    pub fn session(&self) -> &Session<E> {
        &self.session
    }

    /// Set the username and avatar sent ahead of every request.
    pub fn identify(&mut self, username: &str, avatar: Avatar) -> Result<(), RuntimeError> {
        self.session.handle(ClientEvent::SetUsername(username.to_string()))?;
        self.session.handle(ClientEvent::SetAvatar(avatar))?;
        Ok(())
    }

    /// Send `command` and wait for its outcome.
    pub async fn execute(&mut self, command: Command) -> Result<Outcome, RuntimeError> {
        let event = match command {
            Command::Create(room) => ClientEvent::CreateRoom(room),
            Command::Join(room) => ClientEvent::JoinRoom(room),
            Command::List => ClientEvent::ListRooms,
        };

        let actions = self.session.handle(event)?;
        if let Some(outcome) = self.apply(actions).await? {
            return Ok(outcome);
        }

        // The session times out create and join itself; this bound covers
        // list requests, which it only logs.
        let patience = self.request_timeout * 2;
        let deadline = tokio::time::Instant::now() + patience;
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let actions = tokio::select! {
                frame = self.from_server.recv() => match frame {
                    Some(frame) => self.session.handle(ClientEvent::FrameReceived(frame))?,
                    None => {
                        let actions = self.session.handle(ClientEvent::Disconnected)?;
                        self.apply(actions).await?;
                        return Err(RuntimeError::Disconnected);
                    },
                },
                _ = ticker.tick() => {
                    self.session.handle(ClientEvent::Tick { now: self.env.now() })?
                },
                () = tokio::time::sleep_until(deadline) => {
                    return Err(RuntimeError::TimedOut(patience));
                },
            };

            if let Some(outcome) = self.apply(actions).await? {
                return Ok(outcome);
            }
        }
    }

    /// Leave the current room and give the server a moment to confirm.
    pub async fn leave(&mut self) -> Result<(), RuntimeError> {
        let actions = self.session.handle(ClientEvent::LeaveRoom)?;
        self.apply(actions).await?;

        match tokio::time::timeout(self.request_timeout, self.from_server.recv()).await {
            Ok(Some(frame)) => {
                let actions = self.session.handle(ClientEvent::FrameReceived(frame))?;
                self.apply(actions).await?;
            },
            Ok(None) => return Err(RuntimeError::Disconnected),
            Err(_) => tracing::warn!("Server did not confirm leaving"),
        }

        Ok(())
    }

    /// Process frames until the server closes the connection.
    pub async fn wait_for_disconnect(&mut self) -> Result<(), RuntimeError> {
        while let Some(frame) = self.from_server.recv().await {
            let actions = self.session.handle(ClientEvent::FrameReceived(frame))?;
            self.apply(actions).await?;
        }

        let actions = self.session.handle(ClientEvent::Disconnected)?;
        self.apply(actions).await?;
        Ok(())
    }

    /// Execute session actions, returning the first outcome among them.
    async fn apply(&mut self, actions: Vec<ClientAction>) -> Result<Option<Outcome>, RuntimeError> {
        let mut outcome = None;

        for action in actions {
            match action {
                ClientAction::Send(frame) => {
                    self.to_server.send(frame).await.map_err(|_| RuntimeError::Disconnected)?;
                },
                ClientAction::EnterRoom { room } => {
                    tracing::info!("Entered room {}", room);
                    outcome.get_or_insert(Outcome::Entered(room));
                },
                ClientAction::LeftRoom { room } => tracing::info!("Left room {}", room),
                ClientAction::ShowError { slot, message } => {
                    tracing::debug!("{:?}: {}", slot, message);
                    outcome.get_or_insert(Outcome::Rejected { slot, message });
                },
                ClientAction::ClearErrors => tracing::trace!("Errors cleared"),
                ClientAction::RoomsListed(rooms) => {
                    outcome.get_or_insert(Outcome::Listed(rooms));
                },
                ClientAction::Log { message } => tracing::debug!("{}", message),
            }
        }

        Ok(outcome)
    }
}

impl<E: Environment> std::fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("session", &self.session)
            .field("tick_interval", &self.tick_interval)
            .finish_non_exhaustive()
    }
}

//! Easel CLI entry point.
//!
//! # Usage
//!
//! ```bash
//! easel --username ada create lobby
//! easel --username bob --avatar rubber_duck join lobby
//! easel --username eve list
//! ```

use std::{io::Write, process::ExitCode, time::Duration};

use clap::{Parser, Subcommand};
use easel_cli::{Command, Outcome, Runtime, RuntimeConfig, RuntimeError};
use easel_client::{
    SessionConfig,
    transport::{self, TransportConfig},
};
use easel_core::system_env::SystemEnv;
use easel_proto::Avatar;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Easel room client
#[derive(Parser, Debug)]
#[command(name = "easel")]
#[command(about = "Create, join and list rooms on an Easel server")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:4433")]
    server: String,

    /// Username shown to other members
    #[arg(short, long)]
    username: String,

    /// Avatar (elephant_circus, kawaii_dinosaur, rubber_duck,
    /// santas_little_helper)
    #[arg(short, long, default_value = "elephant_circus")]
    avatar: String,

    /// Seconds to wait for the server to answer
    #[arg(long, default_value = "10")]
    timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Create a room and stay in it until Ctrl-C
    Create {
        /// Room name
        room: String,
    },
    /// Join a room and stay in it until Ctrl-C
    Join {
        /// Room name
        room: String,
    },
    /// List active rooms
    List,
}

impl From<Action> for Command {
    fn from(action: Action) -> Self {
        match action {
            Action::Create { room } => Self::Create(room),
            Action::Join { room } => Self::Join(room),
            Action::List => Self::List,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let avatar = Avatar::parse(&args.avatar)
        .ok_or_else(|| RuntimeError::UnknownAvatar(args.avatar.clone()))?;
    let timeout = Duration::from_secs(args.timeout_secs);

    let transport_config =
        TransportConfig { connect_timeout: timeout, ..TransportConfig::default() };
    let client = transport::connect_with_config(&args.server, transport_config)
        .await
        .map_err(RuntimeError::from)?;
    tracing::info!("Connected to {}", args.server);

    let (to_server, from_server, _guard) = client.into_parts();
    let config = RuntimeConfig {
        session: SessionConfig { request_timeout: timeout },
        ..RuntimeConfig::default()
    };
    let mut runtime = Runtime::new(SystemEnv::new(), to_server, from_server, config);
    runtime.identify(&args.username, avatar)?;

    let mut out = std::io::stdout().lock();
    match runtime.execute(args.command.into()).await? {
        Outcome::Entered(room) => {
            writeln!(out, "In room \"{room}\". Press Ctrl-C to leave.")?;
            out.flush()?;
            tokio::select! {
                result = runtime.wait_for_disconnect() => {
                    result?;
                    writeln!(out, "Disconnected from server.")?;
                    return Ok(ExitCode::FAILURE);
                },
                result = tokio::signal::ctrl_c() => result?,
            }
            runtime.leave().await?;
            writeln!(out, "Left room \"{room}\".")?;
        },
        Outcome::Rejected { message, .. } => {
            writeln!(out, "{message}")?;
            return Ok(ExitCode::FAILURE);
        },
        Outcome::Listed(rooms) if rooms.is_empty() => writeln!(out, "No active rooms.")?,
        Outcome::Listed(rooms) => {
            for summary in rooms {
                writeln!(out, "{:<15}  {} member(s)", summary.name, summary.members)?;
            }
        },
    }

    Ok(ExitCode::SUCCESS)
}

//! Terminal client for the autonomous vehicle telemetry server
//! Observers watch live telemetry; admins can also drive the vehicle.

mod display;
mod input;

use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use input::ConsoleAction;
use tlp_core::config::DEFAULT_PORT;
use tlp_core::session::spawn_poller;
use tlp_core::transport::{connect_with_backoff, ReconnectConfig};
use tlp_core::{
    spawn_listener, ClientConfig, CoreError, Role, RoleRequest, Session, TelemetryRecord,
    TracingLogSink, WireFormat,
};
use tokio::io::AsyncWrite;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RoleArg {
    Observer,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Tokenized,
    Json,
}

impl From<FormatArg> for WireFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Tokenized => WireFormat::Tokenized,
            FormatArg::Json => WireFormat::JsonFragment,
        }
    }
}

/// Remote telemetry client for the autonomous vehicle server
#[derive(Parser, Debug)]
#[command(name = "tlp_client")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Watch and command the autonomous vehicle", long_about = None)]
struct Args {
    /// Server host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Role to request
    #[arg(short, long, value_enum, default_value_t = RoleArg::Observer)]
    role: RoleArg,

    /// Admin token (sent in cleartext)
    #[arg(short, long)]
    token: Option<String>,

    /// Outbound wire format
    #[arg(short, long, value_enum, default_value_t = FormatArg::Tokenized)]
    format: FormatArg,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Seconds to wait for the TCP connect
    #[arg(long, default_value_t = 5)]
    connect_timeout_secs: u64,

    /// Connection attempts before giving up
    #[arg(long, default_value_t = 1)]
    connect_attempts: usize,

    /// Request a telemetry snapshot every N seconds (json format only)
    #[arg(long)]
    poll_interval_secs: Option<u64>,
}

impl Args {
    fn client_config(&self) -> Result<ClientConfig> {
        let role = match (self.role, &self.token) {
            (RoleArg::Observer, _) => RoleRequest::Observer,
            (RoleArg::Admin, Some(token)) if !token.trim().is_empty() => RoleRequest::Admin {
                token: token.trim().to_string(),
            },
            (RoleArg::Admin, _) => bail!("--role admin requires --token"),
        };

        Ok(ClientConfig::with_endpoint(self.host.clone(), self.port)
            .with_connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .with_wire_format(self.format.into())
            .with_role(role))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(&args.log_level)?;

    let config = args.client_config()?;
    info!("Starting TLP client v{}", env!("CARGO_PKG_VERSION"));
    println!("Connecting to {} as {:?}...", config.addr(), config.role);

    let reconnect = ReconnectConfig::with_attempts(Some(args.connect_attempts.max(1)));
    let conn = connect_with_backoff(&config.host, config.port, config.connect_timeout, &reconnect)
        .await
        .with_context(|| format!("Failed to connect to {}", config.addr()))?;

    let (reader, writer, _closer) = conn.split();
    let (telemetry_tx, mut telemetry_rx) = mpsc::unbounded_channel::<TelemetryRecord>();
    let mut listener = spawn_listener(reader, telemetry_tx, TracingLogSink);

    let session = Arc::new(Mutex::new(Session::new(writer, config.wire_format)));
    let role = session
        .lock()
        .await
        .handshake(&config.role)
        .await
        .context("Handshake failed")?;
    println!("Session started as {} ({} format). Type 'help' for commands.", role, config.wire_format);

    let poller = match args.poll_interval_secs {
        Some(secs) => Some(
            spawn_poller(session.clone(), Duration::from_secs(secs))
                .await
                .context("Cannot start poller")?,
        ),
        None => None,
    };

    // Blocking stdin on a plain thread so shutdown never waits on it
    let (stdin_tx, mut stdin_rx) = mpsc::channel::<String>(32);
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if stdin_tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });

    let mut stdin_open = true;
    loop {
        tokio::select! {
            Some(record) = telemetry_rx.recv() => {
                println!("{}", display::render(&record));
            }
            line = stdin_rx.recv(), if stdin_open => {
                let Some(line) = line else {
                    // Piped input ended; keep watching telemetry
                    stdin_open = false;
                    continue;
                };
                if !handle_action(&session, ConsoleAction::parse(&line)).await? {
                    break;
                }
            }
            state = listener.stopped() => {
                warn!(?state, "Listener stopped");
                break;
            }
        }
    }

    while let Ok(record) = telemetry_rx.try_recv() {
        println!("{}", display::render(&record));
    }

    session.lock().await.disconnect().await?;
    if let Some(poller) = poller {
        poller.abort();
    }

    match listener.join().await {
        Ok(()) => println!("Connection closed."),
        Err(e) => {
            error!("Connection lost: {}", e);
            println!("Connection lost: {}", e);
        }
    }

    Ok(())
}

/// Run one console action. Returns false when the user asked to leave.
async fn handle_action<W>(session: &Mutex<Session<W>>, action: ConsoleAction) -> Result<bool>
where
    W: AsyncWrite + Unpin,
{
    let mut session = session.lock().await;

    let result = match action {
        ConsoleAction::Exit => return Ok(false),
        ConsoleAction::Empty => return Ok(true),
        ConsoleAction::Help => {
            println!("{}", input::HELP);
            return Ok(true);
        }
        ConsoleAction::Unknown(text) => {
            println!("Unknown command: {} (try 'help')", text);
            return Ok(true);
        }
        ConsoleAction::Move(verb) => {
            if session.role() != Role::Admin {
                println!("Only admins can move the vehicle (role {})", session.role());
                return Ok(true);
            }
            session.command(verb).await
        }
        ConsoleAction::ListUsers => session.list_users().await,
        ConsoleAction::GetData => session.get_data().await,
        ConsoleAction::Ping => session.ping().await,
        ConsoleAction::Auth(token) => session.auth_admin(&token).await,
    };

    match result {
        Ok(()) => Ok(true),
        Err(e) if e.is_disconnect() => Err(e).context("Connection lost while sending"),
        Err(e @ (CoreError::Unsupported { .. } | CoreError::PermissionDenied { .. })) => {
            println!("{}", e);
            Ok(true)
        }
        Err(e) => {
            warn!("Command failed: {}", e);
            println!("Command failed: {}", e);
            Ok(true)
        }
    }
}

fn setup_logging(level: &str) -> Result<()> {
    let log_level = level.parse::<Level>().unwrap_or(Level::INFO);

    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}

//! TLP Core - client protocol handling for the autonomous vehicle server
//!
//! This crate provides:
//! - Line transport over TCP (connect, split, close)
//! - Protocol commands in the tokenized and JSON wire formats
//! - Session client with role tracking
//! - Telemetry parser for both inbound encodings
//! - Background listener feeding log and telemetry sinks

pub const APP_VERSION_STRING: &str = "0.1.0";

pub mod config;
pub mod error;
pub mod listener;
pub mod protocol;
pub mod session;
pub mod sink;
pub mod telemetry;
pub mod transport;
pub mod types;

// Re-export common types
pub use config::ClientConfig;
pub use error::{CoreError, Result};
pub use listener::{spawn_listener, ListenerHandle, ListenerState};
pub use protocol::{LineCodec, WireFormat, PROTOCOL_BANNER};
pub use session::{Role, RoleRequest, Session};
pub use sink::{LogSink, NoopLogSink, TelemetrySink, TracingLogSink};
pub use transport::{Closer, Connection, LineReader, LineWriter};
pub use types::{ProtocolCommand, ServerReply, TelemetryOrigin, TelemetryRecord, Verb, MISSING};

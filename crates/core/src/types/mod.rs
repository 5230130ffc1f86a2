//! Domain types for the vehicle telemetry protocol

mod command;
mod reply;
mod telemetry;

pub use command::{ProtocolCommand, Verb};
pub use reply::ServerReply;
pub use telemetry::{TelemetryOrigin, TelemetryRecord, MISSING};

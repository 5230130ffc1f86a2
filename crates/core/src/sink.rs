//! Collaborator interfaces fed by the listener

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::types::TelemetryRecord;

/// Receives every inbound line, whether or not it parsed
pub trait LogSink: Send + Sync {
    fn log_line(&self, line: &str);
}

/// Receives each parsed telemetry record
///
/// Called on the listener task; implementations must return quickly.
pub trait TelemetrySink: Send + Sync {
    fn on_telemetry(&self, record: TelemetryRecord);
}

/// Emits each inbound line as a tracing event on target `tlp::rx`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn log_line(&self, line: &str) {
        tracing::info!(target: "tlp::rx", "Server -> {}", line);
    }
}

/// Discards every line
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogSink;

impl LogSink for NoopLogSink {
    fn log_line(&self, _line: &str) {}
}

impl TelemetrySink for mpsc::UnboundedSender<TelemetryRecord> {
    fn on_telemetry(&self, record: TelemetryRecord) {
        // Display gone means nobody is watching; keep reading anyway
        if self.send(record).is_err() {
            tracing::trace!("Telemetry receiver dropped");
        }
    }
}

impl<T: TelemetrySink + ?Sized> TelemetrySink for Arc<T> {
    fn on_telemetry(&self, record: TelemetryRecord) {
        (**self).on_telemetry(record)
    }
}

impl<T: LogSink + ?Sized> LogSink for Arc<T> {
    fn log_line(&self, line: &str) {
        (**self).log_line(line)
    }
}

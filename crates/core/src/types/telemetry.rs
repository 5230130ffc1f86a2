//! Telemetry record delivered to the display layer

use std::fmt;

use chrono::{DateTime, Utc};

use crate::protocol::WireFormat;

/// Placeholder shown for a field the server did not send
pub const MISSING: &str = "--";

/// Why the server sent the values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TelemetryOrigin {
    /// Periodic `TELEMETRY` broadcast
    Push,
    /// `DATA` reply to a `GET_DATA` request
    Snapshot,
}

impl fmt::Display for TelemetryOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TelemetryOrigin::Push => "TELEMETRY",
            TelemetryOrigin::Snapshot => "DATA",
        })
    }
}

/// One parsed telemetry line
///
/// Field values are opaque display strings. The server's own timestamp is
/// not carried; `received_at` is the local receipt time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryRecord {
    pub speed: String,
    pub battery: String,
    pub temperature: String,
    pub direction: String,
    /// Encoding the line was detected as
    pub format: WireFormat,
    pub origin: TelemetryOrigin,
    pub received_at: DateTime<Utc>,
}

impl TelemetryRecord {
    /// Pushed record with every field set to the placeholder
    pub fn empty(format: WireFormat, received_at: DateTime<Utc>) -> Self {
        Self {
            speed: MISSING.to_string(),
            battery: MISSING.to_string(),
            temperature: MISSING.to_string(),
            direction: MISSING.to_string(),
            format,
            origin: TelemetryOrigin::Push,
            received_at,
        }
    }

    pub fn is_snapshot(&self) -> bool {
        self.origin == TelemetryOrigin::Snapshot
    }

    /// True if no field carried a value
    pub fn is_blank(&self) -> bool {
        [&self.speed, &self.battery, &self.temperature, &self.direction]
            .iter()
            .all(|v| v.as_str() == MISSING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_record_uses_placeholder() {
        let record = TelemetryRecord::empty(WireFormat::Tokenized, Utc::now());
        assert_eq!(record.speed, "--");
        assert_eq!(record.direction, "--");
        assert!(record.is_blank());
        assert_eq!(record.origin, TelemetryOrigin::Push);
        assert!(!record.is_snapshot());
    }

    #[test]
    fn test_not_blank_once_a_field_is_set() {
        let mut record = TelemetryRecord::empty(WireFormat::JsonFragment, Utc::now());
        record.battery = "92".to_string();
        assert!(!record.is_blank());
    }
}

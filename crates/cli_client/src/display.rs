//! Terminal rendering of telemetry records

use chrono::{DateTime, Local, TimeZone};
use tlp_core::TelemetryRecord;

/// One status line per record, stamped with local receipt time and tagged
/// with its format and origin
pub fn render(record: &TelemetryRecord) -> String {
    render_in(record, &Local)
}

fn render_in<Tz: TimeZone>(record: &TelemetryRecord, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let at: DateTime<Tz> = record.received_at.with_timezone(tz);
    format!(
        "[{}] speed={} battery={} temp={} dir={} ({} {})",
        at.format("%H:%M:%S"),
        record.speed,
        record.battery,
        record.temperature,
        record.direction,
        record.format,
        record.origin
    )
}

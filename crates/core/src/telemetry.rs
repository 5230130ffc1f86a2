//! Telemetry line parser
//!
//! Accepts both server encodings without configuration:
//! - tokenized: `TELEMETRY speed=12 battery=92 temp=25 dir=LEFT ts=1759525432`
//! - JSON fragment: any line containing `TELEMETRY` with quoted field markers,
//!   e.g. `{"t":"TELEMETRY","speed":12,"battery":92,"temp":25,"dir":"LEFT"}`
//!
//! The JSON variant is a textual extraction, not a JSON parse, so truncated or
//! otherwise invalid JSON still yields whatever fields can be found.
//!
//! The JSON server answers `GET_DATA` with a `{"t":"DATA",...}` snapshot that
//! carries no `TELEMETRY` marker. `parse_snapshot` handles those lines.

use chrono::{DateTime, Utc};

use crate::protocol::{WireFormat, TELEMETRY_MARKER};
use crate::types::{TelemetryOrigin, TelemetryRecord, MISSING};

const SPEED_MARKER: &str = "\"speed\":";
const BATTERY_MARKER: &str = "\"battery\":";
const TEMP_MARKER: &str = "\"temp\":";
const DIR_MARKER: &str = "\"dir\":\"";
const KIND_MARKER: &str = "\"t\":";
const SNAPSHOT_KIND: &str = "DATA";

const JSON_MARKERS: [&str; 4] = [SPEED_MARKER, BATTERY_MARKER, TEMP_MARKER, DIR_MARKER];

/// Parse a line received now. `None` means the line is not telemetry.
pub fn parse(line: &str) -> Option<TelemetryRecord> {
    parse_at(line, Utc::now())
}

/// Parse a line with an explicit receipt time
pub fn parse_at(line: &str, received_at: DateTime<Utc>) -> Option<TelemetryRecord> {
    let format = detect(line)?;
    let mut record = TelemetryRecord::empty(format, received_at);

    match format {
        WireFormat::Tokenized => fill_tokenized(&mut record, line),
        WireFormat::JsonFragment => fill_json_fragment(&mut record, line),
    }

    Some(record)
}

/// Parse a `GET_DATA` reply received now. `None` if the line is not one.
pub fn parse_snapshot(line: &str) -> Option<TelemetryRecord> {
    parse_snapshot_at(line, Utc::now())
}

/// Parse a `GET_DATA` reply with an explicit receipt time
pub fn parse_snapshot_at(line: &str, received_at: DateTime<Utc>) -> Option<TelemetryRecord> {
    let trimmed = line.trim();
    if !trimmed.starts_with('{') || json_kind(trimmed) != Some(SNAPSHOT_KIND) {
        return None;
    }

    let mut record = TelemetryRecord::empty(WireFormat::JsonFragment, received_at);
    record.origin = TelemetryOrigin::Snapshot;
    fill_json_fragment(&mut record, trimmed);
    Some(record)
}

/// Decide which encoding a line uses, if it is telemetry at all
pub fn detect(line: &str) -> Option<WireFormat> {
    let trimmed = line.trim();
    if trimmed.is_empty() || !trimmed.contains(TELEMETRY_MARKER) {
        return None;
    }

    let has_json_markers = JSON_MARKERS.iter().any(|m| trimmed.contains(m));
    if trimmed.starts_with(TELEMETRY_MARKER) && !has_json_markers {
        Some(WireFormat::Tokenized)
    } else {
        Some(WireFormat::JsonFragment)
    }
}

fn fill_tokenized(record: &mut TelemetryRecord, line: &str) {
    let body = line
        .trim()
        .strip_prefix(TELEMETRY_MARKER)
        .unwrap_or_default();

    for token in body.split_whitespace() {
        let Some((key, value)) = token.split_once('=') else {
            continue;
        };
        if key.is_empty() || value.is_empty() {
            continue;
        }

        let slot = match key {
            "speed" => &mut record.speed,
            "battery" => &mut record.battery,
            "temp" => &mut record.temperature,
            "dir" => &mut record.direction,
            _ => continue,
        };
        *slot = value.to_string();
    }
}

fn fill_json_fragment(record: &mut TelemetryRecord, line: &str) {
    record.speed = scalar_after(line, SPEED_MARKER);
    record.battery = scalar_after(line, BATTERY_MARKER);
    record.temperature = scalar_after(line, TEMP_MARKER);
    record.direction = quoted_after(line, DIR_MARKER);
}

/// Value between `marker` and the next `,` or `}`
fn scalar_after(line: &str, marker: &str) -> String {
    let Some(start) = line.find(marker) else {
        return MISSING.to_string();
    };
    let rest = &line[start + marker.len()..];
    let end = rest.find([',', '}']).unwrap_or(rest.len());
    non_empty(rest[..end].trim().trim_matches('"'))
}

/// Value between `marker` (which ends in a quote) and the closing quote
fn quoted_after(line: &str, marker: &str) -> String {
    let Some(start) = line.find(marker) else {
        return MISSING.to_string();
    };
    let rest = &line[start + marker.len()..];
    let value = match rest.find('"') {
        Some(end) => &rest[..end],
        None => rest.trim_end().trim_end_matches('}'),
    };
    non_empty(value.trim())
}

/// Value of the `"t"` tag, tolerating spaces after the colon
fn json_kind(line: &str) -> Option<&str> {
    let start = line.find(KIND_MARKER)? + KIND_MARKER.len();
    let rest = line[start..].trim_start().strip_prefix('"')?;
    rest.find('"').map(|end| &rest[..end])
}

fn non_empty(value: &str) -> String {
    if value.is_empty() {
        MISSING.to_string()
    } else {
        value.to_string()
    }
}

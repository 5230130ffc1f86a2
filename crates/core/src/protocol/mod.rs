//! Wire formats and line encoding

mod codec;

pub use codec::LineCodec;

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Protocol banner sent with the tokenized HELLO
pub const PROTOCOL_BANNER: &str = "TLP/1.0";

/// Marker that identifies a telemetry line in both formats
pub const TELEMETRY_MARKER: &str = "TELEMETRY";

/// Line terminator appended to every outbound line
pub const LINE_TERMINATOR: &str = "\n";

/// The two line encodings the vehicle servers speak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WireFormat {
    /// `HELLO TLP/1.0`, `TELEMETRY speed=12 battery=92 ...`
    #[default]
    Tokenized,

    /// `{"t":"HELLO","role":"OBSERVER"}`, `{"t":"TELEMETRY","speed":12,...}`
    JsonFragment,
}

impl WireFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            WireFormat::Tokenized => "tokenized",
            WireFormat::JsonFragment => "json",
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WireFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tokenized" | "text" => Ok(WireFormat::Tokenized),
            "json" | "json-fragment" => Ok(WireFormat::JsonFragment),
            other => Err(CoreError::InvalidState(format!(
                "unknown wire format: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format_from_str() {
        assert_eq!("tokenized".parse::<WireFormat>().unwrap(), WireFormat::Tokenized);
        assert_eq!("JSON".parse::<WireFormat>().unwrap(), WireFormat::JsonFragment);
        assert!("xml".parse::<WireFormat>().is_err());
    }

    #[test]
    fn test_wire_format_display_roundtrip() {
        for format in [WireFormat::Tokenized, WireFormat::JsonFragment] {
            assert_eq!(format.to_string().parse::<WireFormat>().unwrap(), format);
        }
    }
}

//! Outbound protocol commands

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Movement verb accepted by the vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    SpeedUp,
    SlowDown,
    TurnLeft,
    TurnRight,
}

impl Verb {
    pub const ALL: [Verb; 4] = [Verb::SpeedUp, Verb::SlowDown, Verb::TurnLeft, Verb::TurnRight];

    /// Spelling used by the tokenized format (`SPEED UP`)
    pub fn as_tokenized(&self) -> &'static str {
        match self {
            Verb::SpeedUp => "SPEED UP",
            Verb::SlowDown => "SLOW DOWN",
            Verb::TurnLeft => "TURN LEFT",
            Verb::TurnRight => "TURN RIGHT",
        }
    }

    /// Spelling used by the JSON format (`SPEED_UP`)
    pub fn as_json_name(&self) -> &'static str {
        match self {
            Verb::SpeedUp => "SPEED_UP",
            Verb::SlowDown => "SLOW_DOWN",
            Verb::TurnLeft => "TURN_LEFT",
            Verb::TurnRight => "TURN_RIGHT",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tokenized())
    }
}

impl FromStr for Verb {
    type Err = CoreError;

    /// Accepts `SPEED UP`, `SPEED_UP` and `speed-up`, case-insensitive
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();

        Verb::ALL
            .into_iter()
            .find(|verb| verb.as_tokenized() == normalized)
            .ok_or_else(|| CoreError::InvalidVerb(s.trim().to_string()))
    }
}

/// Closed set of messages the client sends to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolCommand {
    /// Protocol greeting
    Hello,

    /// Subscribe to periodic telemetry
    Subscribe,

    /// Request the admin role. The token travels in cleartext.
    AuthAdmin { token: String },

    /// Ask the server for its connected users
    ListUsers,

    /// Movement command (admin only)
    Command(Verb),

    /// Request an immediate telemetry snapshot
    GetData,

    /// Liveness check
    Ping,
}

impl ProtocolCommand {
    /// True if the server only honors this command from an admin
    pub fn requires_admin(&self) -> bool {
        matches!(self, ProtocolCommand::Command(_))
    }

    /// Short name for logs and error messages. Never includes the token.
    pub fn name(&self) -> String {
        match self {
            ProtocolCommand::Hello => "HELLO".to_string(),
            ProtocolCommand::Subscribe => "SUBSCRIBE".to_string(),
            ProtocolCommand::AuthAdmin { .. } => "AUTH ADMIN".to_string(),
            ProtocolCommand::ListUsers => "LIST USERS".to_string(),
            ProtocolCommand::Command(verb) => format!("COMMAND {}", verb),
            ProtocolCommand::GetData => "GET_DATA".to_string(),
            ProtocolCommand::Ping => "PING".to_string(),
        }
    }
}

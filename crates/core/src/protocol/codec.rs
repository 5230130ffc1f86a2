//! Line codec for outbound protocol commands

use serde::Serialize;

use super::{WireFormat, PROTOCOL_BANNER};
use crate::error::{CoreError, Result};
use crate::types::ProtocolCommand;

/// JSON frame shapes understood by the JSON-speaking server
#[derive(Serialize)]
#[serde(tag = "t")]
enum JsonFrame<'a> {
    #[serde(rename = "HELLO")]
    Hello {
        role: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        token: Option<&'a str>,
    },
    #[serde(rename = "CMD")]
    Cmd { name: &'a str },
    #[serde(rename = "LIST_USERS")]
    ListUsers,
    #[serde(rename = "GET_DATA")]
    GetData,
    #[serde(rename = "PING")]
    Ping,
}

/// Serializes commands to single protocol lines (without terminator)
pub struct LineCodec;

impl LineCodec {
    /// Encode a command for the given wire format
    ///
    /// Fails with `Unsupported` when the format has no shape for the command
    /// (`SUBSCRIBE` in JSON, `GET_DATA`/`PING` in tokenized).
    pub fn encode(cmd: &ProtocolCommand, format: WireFormat) -> Result<String> {
        if let ProtocolCommand::AuthAdmin { token } = cmd {
            if token.trim().is_empty() {
                return Err(CoreError::InvalidMessageFormat(
                    "admin token must not be empty".into(),
                ));
            }
        }

        match format {
            WireFormat::Tokenized => Self::encode_tokenized(cmd),
            WireFormat::JsonFragment => Self::encode_json(cmd),
        }
    }

    fn encode_tokenized(cmd: &ProtocolCommand) -> Result<String> {
        let line = match cmd {
            ProtocolCommand::Hello => format!("HELLO {}", PROTOCOL_BANNER),
            ProtocolCommand::Subscribe => "SUBSCRIBE".to_string(),
            ProtocolCommand::AuthAdmin { token } => format!("AUTH ADMIN {}", token),
            ProtocolCommand::ListUsers => "LIST USERS".to_string(),
            ProtocolCommand::Command(verb) => format!("COMMAND {}", verb.as_tokenized()),
            ProtocolCommand::GetData | ProtocolCommand::Ping => {
                return Err(unsupported(cmd, WireFormat::Tokenized))
            }
        };
        Ok(line)
    }

    fn encode_json(cmd: &ProtocolCommand) -> Result<String> {
        let frame = match cmd {
            ProtocolCommand::Hello => JsonFrame::Hello {
                role: "OBSERVER",
                token: None,
            },
            ProtocolCommand::AuthAdmin { token } => JsonFrame::Hello {
                role: "ADMIN",
                token: Some(token.as_str()),
            },
            ProtocolCommand::ListUsers => JsonFrame::ListUsers,
            ProtocolCommand::Command(verb) => JsonFrame::Cmd {
                name: verb.as_json_name(),
            },
            ProtocolCommand::GetData => JsonFrame::GetData,
            ProtocolCommand::Ping => JsonFrame::Ping,
            ProtocolCommand::Subscribe => return Err(unsupported(cmd, WireFormat::JsonFragment)),
        };
        Ok(serde_json::to_string(&frame)?)
    }
}

fn unsupported(cmd: &ProtocolCommand, format: WireFormat) -> CoreError {
    CoreError::Unsupported {
        command: cmd.name(),
        format: format.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Verb;

    fn tokenized(cmd: ProtocolCommand) -> String {
        LineCodec::encode(&cmd, WireFormat::Tokenized).unwrap()
    }

    fn json(cmd: ProtocolCommand) -> String {
        LineCodec::encode(&cmd, WireFormat::JsonFragment).unwrap()
    }

    #[test]
    fn test_tokenized_templates() {
        assert_eq!(tokenized(ProtocolCommand::Hello), "HELLO TLP/1.0");
        assert_eq!(tokenized(ProtocolCommand::Subscribe), "SUBSCRIBE");
        assert_eq!(
            tokenized(ProtocolCommand::AuthAdmin {
                token: "SECRETO_2025".into()
            }),
            "AUTH ADMIN SECRETO_2025"
        );
        assert_eq!(tokenized(ProtocolCommand::ListUsers), "LIST USERS");
    }

    #[test]
    fn test_tokenized_command_is_lossless() {
        let line = tokenized(ProtocolCommand::Command(Verb::TurnLeft));
        assert_eq!(line, "COMMAND TURN LEFT");

        let verb: Verb = line.strip_prefix("COMMAND ").unwrap().parse().unwrap();
        assert_eq!(verb, Verb::TurnLeft);
    }

    #[test]
    fn test_json_templates() {
        assert_eq!(
            json(ProtocolCommand::Hello),
            r#"{"t":"HELLO","role":"OBSERVER"}"#
        );
        assert_eq!(
            json(ProtocolCommand::AuthAdmin {
                token: "SECRETO_2025".into()
            }),
            r#"{"t":"HELLO","role":"ADMIN","token":"SECRETO_2025"}"#
        );
        assert_eq!(
            json(ProtocolCommand::Command(Verb::SlowDown)),
            r#"{"t":"CMD","name":"SLOW_DOWN"}"#
        );
        assert_eq!(json(ProtocolCommand::GetData), r#"{"t":"GET_DATA"}"#);
        assert_eq!(json(ProtocolCommand::Ping), r#"{"t":"PING"}"#);
        assert_eq!(json(ProtocolCommand::ListUsers), r#"{"t":"LIST_USERS"}"#);
    }

    #[test]
    fn test_json_escapes_token() {
        let line = json(ProtocolCommand::AuthAdmin {
            token: "a\"b".into(),
        });
        assert_eq!(line, r#"{"t":"HELLO","role":"ADMIN","token":"a\"b"}"#);
    }

    #[test]
    fn test_unsupported_combinations() {
        let err = LineCodec::encode(&ProtocolCommand::Subscribe, WireFormat::JsonFragment)
            .unwrap_err();
        assert!(matches!(err, CoreError::Unsupported { .. }));

        let err = LineCodec::encode(&ProtocolCommand::GetData, WireFormat::Tokenized).unwrap_err();
        assert!(matches!(err, CoreError::Unsupported { ref command, .. } if command == "GET_DATA"));
    }

    #[test]
    fn test_empty_token_rejected() {
        let cmd = ProtocolCommand::AuthAdmin { token: "  ".into() };
        assert!(LineCodec::encode(&cmd, WireFormat::Tokenized).is_err());
        assert!(LineCodec::encode(&cmd, WireFormat::JsonFragment).is_err());
    }
}

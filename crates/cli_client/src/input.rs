//! Console input parsing
//!
//! Maps one line typed by the user to an action on the session.

use tlp_core::Verb;

/// What a console line asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleAction {
    Move(Verb),
    ListUsers,
    GetData,
    Ping,
    Auth(String),
    Help,
    Exit,
    Empty,
    Unknown(String),
}

impl ConsoleAction {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ConsoleAction::Empty;
        }

        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        match head.to_ascii_lowercase().as_str() {
            "/exit" | "exit" | "quit" => ConsoleAction::Exit,
            "help" | "?" => ConsoleAction::Help,
            "users" => ConsoleAction::ListUsers,
            "data" => ConsoleAction::GetData,
            "ping" => ConsoleAction::Ping,
            "up" | "+" => ConsoleAction::Move(Verb::SpeedUp),
            "down" | "-" => ConsoleAction::Move(Verb::SlowDown),
            "left" => ConsoleAction::Move(Verb::TurnLeft),
            "right" => ConsoleAction::Move(Verb::TurnRight),
            "auth" if !rest.is_empty() => ConsoleAction::Auth(rest.to_string()),
            _ => match line.parse::<Verb>() {
                Ok(verb) => ConsoleAction::Move(verb),
                Err(_) => ConsoleAction::Unknown(line.to_string()),
            },
        }
    }
}

pub const HELP: &str = "\
Commands:
  up | down | left | right   move the vehicle (admin)
  SPEED UP, TURN_LEFT, ...   same, by verb name
  users                      list connected users
  data                       request a telemetry snapshot (json format)
  ping                       liveness check (json format)
  auth <token>               claim the admin role
  help                       this text
  /exit                      disconnect";

//! Best-effort classification of non-telemetry server lines
//!
//! Used for logging only. A reply never changes the session role: the
//! protocol has no reliable ACK contract, so an `ERROR AUTH` line is
//! reported but not acted on.

/// Classified server reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerReply {
    /// `OK ...`, `{"t":"HELLO_OK"...}`, `{"t":"ACK"...}`
    Ok(String),

    /// `ERROR <CODE> <detail>`, `{"t":"NACK"...}`, `{"t":"ERR"...}`
    Error { code: String, detail: String },

    /// `USERS <n>` header of a user listing
    Users(usize),

    /// `USER <addr> <role> <since>` entry of a user listing
    User(String),

    /// Anything else, including telemetry
    Other,
}

impl ServerReply {
    pub fn classify(line: &str) -> Self {
        let line = line.trim();

        if line.starts_with('{') {
            return Self::classify_json(line);
        }

        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        match head {
            "OK" => ServerReply::Ok(rest.to_string()),
            "ERROR" => {
                let (code, detail) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                ServerReply::Error {
                    code: code.to_string(),
                    detail: detail.trim().to_string(),
                }
            }
            "USERS" => rest
                .parse()
                .map(ServerReply::Users)
                .unwrap_or(ServerReply::Other),
            "USER" if !rest.is_empty() => ServerReply::User(rest.to_string()),
            _ => ServerReply::Other,
        }
    }

    /// True for an authentication rejection
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, ServerReply::Error { code, .. } if code == "AUTH")
    }

    fn classify_json(line: &str) -> Self {
        let Some(kind) = quoted_value(line, "\"t\":\"") else {
            return ServerReply::Other;
        };

        match kind {
            "HELLO_OK" | "ACK" | "WELCOME" => {
                ServerReply::Ok(quoted_value(line, "\"name\":\"").unwrap_or(kind).to_string())
            }
            "NACK" | "ERR" => ServerReply::Error {
                code: quoted_value(line, "\"code\":\"").unwrap_or(kind).to_string(),
                detail: quoted_value(line, "\"reason\":\"").unwrap_or_default().to_string(),
            },
            _ => ServerReply::Other,
        }
    }
}

fn quoted_value<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let start = line.find(marker)? + marker.len();
    let rest = &line[start..];
    rest.find('"').map(|end| &rest[..end])
}

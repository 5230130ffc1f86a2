//! Client connection configuration

use std::time::Duration;

use crate::protocol::WireFormat;
use crate::session::RoleRequest;

/// Default vehicle server port
pub const DEFAULT_PORT: u16 = 5000;

/// Default connect timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server hostname or IP
    pub host: String,

    /// Server port
    pub port: u16,

    /// Maximum time to wait for the TCP connect
    pub connect_timeout: Duration,

    /// Outbound wire format
    pub wire_format: WireFormat,

    /// Role requested during the handshake
    pub role: RoleRequest,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            wire_format: WireFormat::Tokenized,
            role: RoleRequest::Observer,
        }
    }
}

impl ClientConfig {
    /// Create with custom endpoint
    pub fn with_endpoint(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Set connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set outbound wire format
    pub fn with_wire_format(mut self, format: WireFormat) -> Self {
        self.wire_format = format;
        self
    }

    /// Set requested role
    pub fn with_role(mut self, role: RoleRequest) -> Self {
        self.role = role;
        self
    }

    /// `host:port` for display and logging
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

//! Error types for tlp-core

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Write error: {0}")]
    Write(String),

    #[error("Read error: {0}")]
    Read(String),

    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Invalid message format: {0}")]
    InvalidMessageFormat(String),

    #[error("Permission denied: {command} requires the admin role")]
    PermissionDenied { command: String },

    #[error("{command} is not supported by the {format} wire format")]
    Unsupported { command: String, format: String },

    #[error("Unknown command verb: {0}")]
    InvalidVerb(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// True for errors that mean the connection is gone
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            CoreError::Connection(_) | CoreError::Write(_) | CoreError::Read(_)
        )
    }
}

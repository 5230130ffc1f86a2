//! Connect with exponential backoff
//!
//! The transport itself never retries. This helper is for front ends that
//! want a retry policy around the initial connect.

use std::time::Duration;
use tokio::time::sleep;

use super::Connection;
use crate::{CoreError, Result};

/// Reconnection configuration
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Maximum backoff time between attempts
    pub max_backoff: Duration,
    /// Initial backoff time
    pub initial_backoff: Duration,
    /// Maximum number of connection attempts (None = infinite)
    pub max_attempts: Option<usize>,
}

impl Default for ReconnectConfig {
    /// A single attempt, matching the transport's no-retry contract
    fn default() -> Self {
        Self {
            max_backoff: Duration::from_secs(30),
            initial_backoff: Duration::from_secs(1),
            max_attempts: Some(1),
        }
    }
}

impl ReconnectConfig {
    /// Default backoff with a custom attempt limit
    pub fn with_attempts(max_attempts: Option<usize>) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Delay before attempt `attempt + 1`, given `attempt` failures so far
    pub fn backoff_after(&self, attempt: usize) -> Duration {
        let mut backoff = self.initial_backoff;
        for _ in 1..attempt {
            backoff = std::cmp::min(backoff * 2, self.max_backoff);
        }
        backoff
    }
}

/// Attempt to connect with exponential backoff
///
/// # Behavior
/// 1. Try to connect immediately
/// 2. On failure, wait with exponential backoff (1s, 2s, 4s, ..., max 30s)
/// 3. Retry up to max_attempts (or forever if None)
/// 4. Return the connection on success, the last error otherwise
pub async fn connect_with_backoff(
    host: &str,
    port: u16,
    connect_timeout: Duration,
    config: &ReconnectConfig,
) -> Result<Connection> {
    if host.is_empty() {
        return Err(CoreError::Connection("Host cannot be empty".to_string()));
    }

    let mut attempt = 0;

    loop {
        attempt += 1;

        match Connection::connect(host, port, connect_timeout).await {
            Ok(conn) => {
                if attempt > 1 {
                    tracing::info!("Connected after {} attempts", attempt);
                }
                return Ok(conn);
            }
            Err(e) => {
                let exhausted = config.max_attempts.is_some_and(|max| attempt >= max);
                if exhausted {
                    if attempt > 1 {
                        tracing::error!("Giving up after {} connection attempts", attempt);
                    }
                    return Err(e);
                }

                let backoff = config.backoff_after(attempt);
                tracing::warn!(
                    "Connect attempt {} failed: {}, retrying in {:?}",
                    attempt,
                    e,
                    backoff
                );
                sleep(backoff).await;
            }
        }
    }
}

//! Periodic snapshot requests for the JSON server
//!
//! The JSON server pushes telemetry only every few seconds. The poller asks
//! for an immediate snapshot (`GET_DATA`) on a fixed interval so the display
//! stays fresh between pushes.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWrite;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use super::Session;
use crate::error::{CoreError, Result};
use crate::protocol::WireFormat;

/// Spawn the poller task
///
/// The first request goes out after one full `period`; the handshake
/// already asked for the initial snapshot. The task ends with
/// the first send error, which is usually the connection closing.
///
/// # Returns
/// * `Err(CoreError::Unsupported)` - the session speaks the tokenized format
/// * `Ok(JoinHandle)` - resolves when polling stops
pub async fn spawn_poller<W>(
    session: Arc<Mutex<Session<W>>>,
    period: Duration,
) -> Result<JoinHandle<Result<()>>>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let format = session.lock().await.format();
    if format != WireFormat::JsonFragment {
        return Err(CoreError::Unsupported {
            command: "GET_DATA".to_string(),
            format: format.to_string(),
        });
    }
    if period.is_zero() {
        return Err(CoreError::InvalidState("poll period must be non-zero".into()));
    }

    Ok(tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval() fires immediately; skip that tick
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let mut session = session.lock().await;
            if session.closer().is_closed() {
                tracing::debug!("Connection closed, poller stopping");
                return Ok(());
            }
            if let Err(e) = session.get_data().await {
                tracing::warn!("Poll request failed: {}", e);
                return Err(e);
            }
            tracing::trace!("Requested telemetry snapshot");
        }
    }))
}

//! Background listener loop
//!
//! One task per connection reads lines, forwards each one to the log sink,
//! and hands parsed telemetry (pushed or `GET_DATA` snapshots) to the
//! telemetry sink. The loop is single-use:
//!
//! ```text
//! Running --(end of stream / local close)--> StoppedClean
//! Running --(read error)------------------> StoppedError
//! ```

use tokio::io::AsyncRead;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{CoreError, Result};
use crate::sink::{LogSink, TelemetrySink};
use crate::telemetry;
use crate::transport::LineReader;
use crate::types::ServerReply;

/// Listener lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Running,
    StoppedClean,
    StoppedError,
}

impl ListenerState {
    pub fn is_stopped(&self) -> bool {
        !matches!(self, ListenerState::Running)
    }
}

/// Handle to a spawned listener
pub struct ListenerHandle {
    state: watch::Receiver<ListenerState>,
    task: JoinHandle<Result<()>>,
}

impl ListenerHandle {
    pub fn state(&self) -> ListenerState {
        *self.state.borrow()
    }

    /// Wait until the listener leaves `Running`
    pub async fn stopped(&mut self) -> ListenerState {
        match self.state.wait_for(|s| s.is_stopped()).await {
            Ok(state) => *state,
            // Sender gone means the task ended without publishing (panic)
            Err(_) => ListenerState::StoppedError,
        }
    }

    /// Wait for the task to finish
    ///
    /// # Returns
    /// * `Ok(())` - stream ended or the connection was closed locally
    /// * `Err(CoreError::Read)` - the read failed
    pub async fn join(self) -> Result<()> {
        self.task
            .await
            .map_err(|e| CoreError::Read(format!("listener task failed: {}", e)))?
    }
}

/// Spawn the listener on the current tokio runtime
pub fn spawn_listener<R, T, L>(reader: LineReader<R>, telemetry: T, log: L) -> ListenerHandle
where
    R: AsyncRead + Unpin + Send + 'static,
    T: TelemetrySink + 'static,
    L: LogSink + 'static,
{
    let (state_tx, state_rx) = watch::channel(ListenerState::Running);
    let task = tokio::spawn(async move {
        let result = run_listener(reader, &telemetry, &log).await;
        let final_state = match result {
            Ok(()) => ListenerState::StoppedClean,
            Err(_) => ListenerState::StoppedError,
        };
        state_tx.send_replace(final_state);
        result
    });

    ListenerHandle {
        state: state_rx,
        task,
    }
}

/// Run the read loop to completion on the calling task
pub async fn run_listener<R, T, L>(mut reader: LineReader<R>, telemetry: &T, log: &L) -> Result<()>
where
    R: AsyncRead + Unpin,
    T: TelemetrySink + ?Sized,
    L: LogSink + ?Sized,
{
    let mut lines = 0u64;
    let mut records = 0u64;

    loop {
        let line = match reader.read_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::info!(lines, records, "Listener stopped: end of stream");
                return Ok(());
            }
            Err(e) => {
                tracing::error!(lines, records, "Listener stopped: {}", e);
                return Err(e);
            }
        };
        lines += 1;

        log.log_line(&line);
        note_reply(&line);

        if let Some(record) = telemetry::parse(&line).or_else(|| telemetry::parse_snapshot(&line)) {
            records += 1;
            telemetry.on_telemetry(record);
        }
    }
}

fn note_reply(line: &str) {
    match ServerReply::classify(line) {
        reply @ ServerReply::Error { .. } if reply.is_auth_rejection() => {
            tracing::warn!("Server rejected admin token; local role is unchanged");
        }
        ServerReply::Error { code, detail } => {
            tracing::warn!(%code, %detail, "Server reported an error");
        }
        ServerReply::Users(count) => tracing::debug!(count, "User listing"),
        ServerReply::Ok(text) => tracing::debug!(%text, "Server OK"),
        ServerReply::User(_) | ServerReply::Other => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::NoopLogSink;
    use crate::transport::line_pair;
    use crate::types::TelemetryRecord;
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};
    use std::task::{Context, Poll};
    use tokio::io::{duplex, AsyncWriteExt, ReadBuf};
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct Recorder {
        lines: Mutex<Vec<String>>,
    }

    impl LogSink for Recorder {
        fn log_line(&self, line: &str) {
            self.lines.lock().unwrap().push(line.to_string());
        }
    }

    /// Reader that fails on first poll
    struct Broken;

    impl AsyncRead for Broken {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset by peer",
            )))
        }
    }

    #[tokio::test]
    async fn test_logs_every_line_and_forwards_telemetry() {
        let (mut peer, local) = duplex(4096);
        let (read, write) = tokio::io::split(local);
        let (reader, _writer, _closer) = line_pair(read, write);
        let (tx, mut rx) = mpsc::unbounded_channel::<TelemetryRecord>();
        let log = Arc::new(Recorder::default());

        let mut handle = spawn_listener(reader, tx, log.clone());
        assert_eq!(handle.state(), ListenerState::Running);

        peer.write_all(
            b"OK Welcome to TLP/1.0\n\
              TELEMETRY speed=12 battery=92 temp=25 dir=LEFT ts=1759525432\n\
              ERROR AUTH bad_token\n\
              TELEMETRY speed=17 battery=91\n",
        )
        .await
        .unwrap();
        drop(peer);

        assert_eq!(handle.stopped().await, ListenerState::StoppedClean);
        handle.join().await.unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(
            (first.speed.as_str(), first.battery.as_str(), first.temperature.as_str(), first.direction.as_str()),
            ("12", "92", "25", "LEFT")
        );
        let second = rx.recv().await.unwrap();
        assert_eq!(second.speed, "17");
        assert_eq!(second.direction, "--");
        assert!(rx.recv().await.is_none());

        assert_eq!(log.lines.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_snapshot_reply_reaches_sink() {
        let (mut peer, local) = duplex(4096);
        let (read, write) = tokio::io::split(local);
        let (reader, _writer, _closer) = line_pair(read, write);
        let (tx, mut rx) = mpsc::unbounded_channel::<TelemetryRecord>();

        let mut handle = spawn_listener(reader, tx, NoopLogSink);
        peer.write_all(
            b"{\"t\":\"HELLO_OK\",\"role\":\"OBSERVER\"}\n\
              {\"t\":\"DATA\",\"speed\":50,\"battery\":80,\"temp\":30,\"dir\":\"LEFT\",\"ts\":1}\n",
        )
        .await
        .unwrap();
        drop(peer);

        assert_eq!(handle.stopped().await, ListenerState::StoppedClean);
        let record = rx.recv().await.unwrap();
        assert!(record.is_snapshot());
        assert_eq!(record.speed, "50");
        assert_eq!(record.direction, "LEFT");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_local_close_stops_clean_without_more_sink_calls() {
        let (mut peer, local) = duplex(4096);
        let (read, write) = tokio::io::split(local);
        let (reader, _writer, closer) = line_pair(read, write);
        let (tx, mut rx) = mpsc::unbounded_channel::<TelemetryRecord>();

        let mut handle = spawn_listener(reader, tx, NoopLogSink);

        peer.write_all(b"TELEMETRY speed=1\n").await.unwrap();
        assert_eq!(rx.recv().await.unwrap().speed, "1");

        closer.close();
        assert_eq!(handle.stopped().await, ListenerState::StoppedClean);

        // Lines written after close are never delivered
        let _ = peer.write_all(b"TELEMETRY speed=2\n").await;
        handle.join().await.unwrap();
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_read_error_stops_with_error() {
        let (_closer, closed) = crate::transport::Closer::new();
        let reader = LineReader::new(Broken, closed);
        let (tx, mut rx) = mpsc::unbounded_channel::<TelemetryRecord>();

        let mut handle = spawn_listener(reader, tx, NoopLogSink);
        assert_eq!(handle.stopped().await, ListenerState::StoppedError);

        let err = handle.join().await.unwrap_err();
        assert!(matches!(err, CoreError::Read(_)));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_run_listener_inline() {
        let (mut peer, local) = duplex(1024);
        let (read, write) = tokio::io::split(local);
        let (reader, _writer, _closer) = line_pair(read, write);
        let (tx, mut rx) = mpsc::unbounded_channel::<TelemetryRecord>();

        peer.write_all(b"hello world\n\nTELEMETRY {\"speed\":5}\n").await.unwrap();
        drop(peer);

        run_listener(reader, &tx, &NoopLogSink).await.unwrap();
        let record = rx.try_recv().unwrap();
        assert_eq!(record.speed, "5");
        assert!(rx.try_recv().is_err());
    }
}

//! TCP line transport
//!
//! This module provides the client's only I/O path:
//! - `Connection::connect` with a connect timeout and no retries
//! - `Connection::split` into independent reader and writer halves
//! - `Closer` to end the connection from either side

pub mod line;
pub mod reconnect;

pub use line::{Closer, LineReader, LineWriter, MAX_LINE_BYTES};
pub use reconnect::{connect_with_backoff, ReconnectConfig};

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::{CoreError, Result};

/// Build a reader/writer pair sharing one close signal
pub fn line_pair<R, W>(read: R, write: W) -> (LineReader<R>, LineWriter<W>, Closer)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (closer, closed) = Closer::new();
    let reader = LineReader::new(read, closed);
    let writer = LineWriter::new(write, closer.clone());
    (reader, writer, closer)
}

/// An established TCP connection to the vehicle server
#[derive(Debug)]
pub struct Connection {
    host: String,
    port: u16,
    peer: Option<SocketAddr>,
    stream: TcpStream,
}

impl Connection {
    /// Connect once, failing after `timeout`
    ///
    /// # Returns
    /// * `Err(CoreError::Connection)` - unreachable, refused or unresolvable
    /// * `Err(CoreError::Timeout)` - no answer within `timeout`
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        if host.is_empty() {
            return Err(CoreError::Connection("Host cannot be empty".to_string()));
        }

        let stream = match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(CoreError::Connection(format!(
                    "Failed to connect to {}:{}: {}",
                    host, port, e
                )))
            }
            Err(_) => return Err(CoreError::Timeout(timeout_millis(timeout))),
        };

        // Commands are tiny and must not wait for Nagle
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("Could not set TCP_NODELAY: {}", e);
        }

        let peer = stream.peer_addr().ok();
        tracing::info!(host, port, "Connected");

        Ok(Self {
            host: host.to_string(),
            port,
            peer,
            stream,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Resolved peer address, if the OS reported one
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Split into the listener's reader and the session's writer
    pub fn split(self) -> (LineReader<OwnedReadHalf>, LineWriter<OwnedWriteHalf>, Closer) {
        let (read, write) = self.stream.into_split();
        line_pair(read, write)
    }
}

/// Milliseconds for the timeout error, saturating at `u64::MAX`
fn timeout_millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_connect_and_exchange_lines() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (read, mut write) = socket.into_split();
            let mut lines = BufReader::new(read).lines();
            let first = lines.next_line().await.unwrap().unwrap();
            write.write_all(b"OK HELLO\n").await.unwrap();
            first
        });

        let conn = Connection::connect("127.0.0.1", port, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(conn.host(), "127.0.0.1");
        assert_eq!(conn.port(), port);
        assert!(conn.peer_addr().is_some());

        let (mut reader, mut writer, _closer) = conn.split();
        writer.send_line("HELLO TLP/1.0").await.unwrap();
        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("OK HELLO"));
        assert_eq!(server.await.unwrap(), "HELLO TLP/1.0");
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port nobody listens on
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let err = Connection::connect("127.0.0.1", port, Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Connection(_)));
    }

    #[test]
    fn test_timeout_millis_saturates() {
        assert_eq!(timeout_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(timeout_millis(Duration::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn test_connect_empty_host() {
        let err = Connection::connect("", 5000, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Connection(_)));
    }
}

//! Newline-framed reader and writer halves
//!
//! One call to `send_line` is one flushed line on the wire, so outbound
//! order always matches call order. `read_line` returns `Ok(None)` as the
//! end-of-stream sentinel, both when the peer closes and after `Closer::close`.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::watch;

use crate::error::{CoreError, Result};
use crate::protocol::LINE_TERMINATOR;

/// Maximum accepted inbound line (64KB)
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Close signal shared by both halves of a connection
#[derive(Debug, Clone)]
pub struct Closer {
    tx: watch::Sender<bool>,
}

impl Closer {
    pub(crate) fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, rx)
    }

    /// Mark the connection closed
    ///
    /// A pending `read_line` returns the end-of-stream sentinel and later
    /// sends fail with `CoreError::Write`.
    pub fn close(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Inbound half: yields one line at a time
pub struct LineReader<R> {
    inner: BufReader<R>,
    closed: watch::Receiver<bool>,
    buf: Vec<u8>,
    eof: bool,
}

impl<R> LineReader<R>
where
    R: AsyncRead + Unpin,
{
    pub(crate) fn new(inner: R, closed: watch::Receiver<bool>) -> Self {
        Self {
            inner: BufReader::new(inner),
            closed,
            buf: Vec::with_capacity(256),
            eof: false,
        }
    }

    /// Read the next line, terminator stripped
    ///
    /// Blocks until a full line arrives, the stream ends, or the connection
    /// is closed locally.
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        if self.eof || *self.closed.borrow() {
            return Ok(None);
        }

        self.buf.clear();
        let limit = (MAX_LINE_BYTES + 1) as u64;

        let read = {
            let mut limited = (&mut self.inner).take(limit);
            let buf = &mut self.buf;
            let closed = &mut self.closed;

            // A dropped Closer disables the first branch instead of ending the read
            tokio::select! {
                biased;

                Ok(_) = closed.wait_for(|closed| *closed) => None,
                result = limited.read_until(b'\n', buf) => Some(result),
            }
        };

        let n = match read {
            None => {
                tracing::debug!("Connection closed locally, ending read");
                self.eof = true;
                return Ok(None);
            }
            Some(result) => result.map_err(|e| CoreError::Read(e.to_string()))?,
        };

        if n == 0 {
            tracing::debug!("Peer closed the stream");
            self.eof = true;
            return Ok(None);
        }

        let terminated = self.buf.last() == Some(&b'\n');
        if !terminated && self.buf.len() > MAX_LINE_BYTES {
            return Err(CoreError::MessageTooLarge {
                size: self.buf.len(),
                max: MAX_LINE_BYTES,
            });
        }

        if terminated {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }

        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }
}

/// Outbound half: writes and flushes one line per call
pub struct LineWriter<W> {
    inner: W,
    closer: Closer,
}

impl<W> LineWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub(crate) fn new(inner: W, closer: Closer) -> Self {
        Self { inner, closer }
    }

    /// Send one line and flush it
    pub async fn send_line(&mut self, text: &str) -> Result<()> {
        if text.contains(['\n', '\r']) {
            return Err(CoreError::InvalidMessageFormat(
                "line must not contain a line break".into(),
            ));
        }
        if self.closer.is_closed() {
            return Err(CoreError::Write("connection closed".into()));
        }

        let mut frame = String::with_capacity(text.len() + LINE_TERMINATOR.len());
        frame.push_str(text);
        frame.push_str(LINE_TERMINATOR);

        self.inner
            .write_all(frame.as_bytes())
            .await
            .map_err(|e| CoreError::Write(e.to_string()))?;
        self.inner
            .flush()
            .await
            .map_err(|e| CoreError::Write(e.to_string()))?;

        tracing::trace!("Sent {} bytes", frame.len());
        Ok(())
    }

    /// Half-close the outbound direction
    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner
            .shutdown()
            .await
            .map_err(|e| CoreError::Write(e.to_string()))
    }

    pub fn closer(&self) -> &Closer {
        &self.closer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::line_pair;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_lines_arrive_in_send_order() {
        let (client, server) = duplex(1024);
        let (client_read, client_write) = tokio::io::split(client);
        let (server_read, server_write) = tokio::io::split(server);
        let (_, mut writer, _closer) = line_pair(client_read, client_write);
        let (mut reader, _, _server_closer) = line_pair(server_read, server_write);

        for i in 0..20 {
            writer.send_line(&format!("LINE {}", i)).await.unwrap();
        }
        for i in 0..20 {
            assert_eq!(reader.read_line().await.unwrap(), Some(format!("LINE {}", i)));
        }
    }

    #[tokio::test]
    async fn test_crlf_is_stripped() {
        let (mut peer, local) = duplex(256);
        let (read, write) = tokio::io::split(local);
        let (mut reader, _writer, _closer) = line_pair(read, write);

        peer.write_all(b"OK HELLO\r\nTELEMETRY speed=1\n").await.unwrap();
        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("OK HELLO"));
        assert_eq!(
            reader.read_line().await.unwrap().as_deref(),
            Some("TELEMETRY speed=1")
        );
    }

    #[tokio::test]
    async fn test_peer_close_returns_sentinel() {
        let (mut peer, local) = duplex(256);
        let (read, write) = tokio::io::split(local);
        let (mut reader, _writer, _closer) = line_pair(read, write);

        peer.write_all(b"last\npartial").await.unwrap();
        drop(peer);

        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("last"));
        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("partial"));
        assert_eq!(reader.read_line().await.unwrap(), None);
        assert_eq!(reader.read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_close_unblocks_pending_read() {
        let (_peer, local) = duplex(256);
        let (read, write) = tokio::io::split(local);
        let (mut reader, _writer, closer) = line_pair(read, write);

        let pending = tokio::spawn(async move { reader.read_line().await });
        tokio::task::yield_now().await;
        closer.close();

        assert_eq!(pending.await.unwrap().unwrap(), None);
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let (_peer, local) = duplex(256);
        let (read, write) = tokio::io::split(local);
        let (_reader, mut writer, closer) = line_pair(read, write);

        closer.close();
        let err = writer.send_line("SUBSCRIBE").await.unwrap_err();
        assert!(matches!(err, CoreError::Write(_)));
    }

    #[tokio::test]
    async fn test_embedded_newline_rejected() {
        let (_peer, local) = duplex(256);
        let (read, write) = tokio::io::split(local);
        let (_reader, mut writer, _closer) = line_pair(read, write);

        let err = writer.send_line("AUTH ADMIN x\nCOMMAND SPEED UP").await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidMessageFormat(_)));
    }

    #[tokio::test]
    async fn test_oversized_line_rejected() {
        let (mut peer, local) = duplex(MAX_LINE_BYTES * 2 + 16);
        let (read, write) = tokio::io::split(local);
        let (mut reader, _writer, _closer) = line_pair(read, write);

        let long = vec![b'x'; MAX_LINE_BYTES + 10];
        peer.write_all(&long).await.unwrap();
        peer.write_all(b"\n").await.unwrap();

        let err = reader.read_line().await.unwrap_err();
        assert!(matches!(err, CoreError::MessageTooLarge { .. }));
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced() {
        let (mut peer, local) = duplex(256);
        let (read, write) = tokio::io::split(local);
        let (mut reader, _writer, _closer) = line_pair(read, write);

        peer.write_all(b"dir=\xffLEFT\n").await.unwrap();
        let line = reader.read_line().await.unwrap().unwrap();
        assert!(line.starts_with("dir="));
        assert!(line.ends_with("LEFT"));
    }
}

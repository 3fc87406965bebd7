//! Buffered read half of a connection.
//!
//! The reader keeps whatever the socket delivered past the last request in
//! its own buffer, so the bytes following an HTTP header block are the first
//! bytes the frame decoder sees.

use bytes::BytesMut;
use tokio::io::{self, AsyncRead, AsyncReadExt};
use tracing::debug;

use super::{READ_CHUNK, TransportError};

const BLANK_LINE: &[u8] = b"\r\n\r\n";

/// Read half of a transport with an internal carry-over buffer.
#[derive(Debug)]
pub struct TransportReader<R> {
    reader: R,
    buffer: BytesMut,
}

impl<R> TransportReader<R> {
    /// Wrap a read half.
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(READ_CHUNK),
        }
    }

    /// Number of bytes received but not yet handed out.
    #[must_use]
    pub fn buffered(&self) -> usize { self.buffer.len() }

    /// Release the inner reader together with any unread bytes.
    #[must_use]
    pub fn into_parts(self) -> (R, BytesMut) { (self.reader, self.buffer) }
}

impl<R: AsyncRead + Unpin> TransportReader<R> {
    /// Read more bytes into the buffer. `Ok(false)` means the peer closed.
    async fn fill(&mut self) -> Result<bool, TransportError> {
        loop {
            self.buffer.reserve(READ_CHUNK);
            match self.reader.read_buf(&mut self.buffer).await {
                Ok(0) => return Ok(false),
                Ok(_) => return Ok(true),
                Err(err) if is_retryable(&err) => {}
                Err(err) if is_peer_closure(&err) => {
                    debug!(error = %err, "peer reset treated as close");
                    return Ok(false);
                }
                Err(err) => return Err(TransportError::Recv(err)),
            }
        }
    }

    /// Read exactly `n` bytes.
    ///
    /// Returns `Ok(None)` if the peer shuts down or resets the connection
    /// before `n` bytes arrive.
    ///
    /// # Errors
    /// Returns [`TransportError::Recv`] on any other read failure.
    pub async fn recv_exact(&mut self, n: usize) -> Result<Option<BytesMut>, TransportError> {
        while self.buffer.len() < n {
            if !self.fill().await? {
                return Ok(None);
            }
        }
        Ok(Some(self.buffer.split_to(n)))
    }

    /// Read up to and including the first `\r\n\r\n`.
    ///
    /// Bytes after the terminator stay buffered. Returns `Ok(None)` if the
    /// peer closes before a complete block arrives.
    ///
    /// # Errors
    /// Returns [`TransportError::HeaderTooLarge`] once the block exceeds
    /// `limit` bytes, or [`TransportError::Recv`] on read failure.
    pub async fn recv_until_blank_line(
        &mut self,
        limit: usize,
    ) -> Result<Option<BytesMut>, TransportError> {
        let mut scanned = 0;
        loop {
            if let Some(end) = find_blank_line(&self.buffer, scanned) {
                if end > limit {
                    return Err(TransportError::HeaderTooLarge { limit });
                }
                return Ok(Some(self.buffer.split_to(end)));
            }
            if self.buffer.len() > limit {
                return Err(TransportError::HeaderTooLarge { limit });
            }
            scanned = self.buffer.len().saturating_sub(BLANK_LINE.len() - 1);
            if !self.fill().await? {
                return Ok(None);
            }
        }
    }

    /// Discard inbound bytes until EOF or an error, returning how many were
    /// dropped.
    pub async fn drain(&mut self) -> usize {
        let mut discarded = self.buffer.len();
        self.buffer.clear();
        loop {
            match self.fill().await {
                Ok(true) => {
                    discarded += self.buffer.len();
                    self.buffer.clear();
                }
                Ok(false) => return discarded,
                Err(err) => {
                    debug!(error = %err, "drain stopped on read error");
                    return discarded;
                }
            }
        }
    }
}

/// Offset one past the end of the first blank line at or after `from`.
fn find_blank_line(buf: &[u8], from: usize) -> Option<usize> {
    buf.get(from..)?
        .windows(BLANK_LINE.len())
        .position(|window| window == BLANK_LINE)
        .map(|pos| from + pos + BLANK_LINE.len())
}

fn is_retryable(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

fn is_peer_closure(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
    )
}

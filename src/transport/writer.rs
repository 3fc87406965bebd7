//! Write half of a connection.

use std::time::Duration;

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    time::timeout,
};

use super::TransportError;

/// Write half of a transport.
#[derive(Debug)]
pub struct TransportWriter<W> {
    writer: W,
}

impl<W> TransportWriter<W> {
    /// Wrap a write half.
    #[must_use]
    pub const fn new(writer: W) -> Self { Self { writer } }

    /// Release the inner writer.
    #[must_use]
    pub fn into_inner(self) -> W { self.writer }
}

impl<W: AsyncWrite + Unpin> TransportWriter<W> {
    /// Write all of `bytes`.
    ///
    /// Partial writes are resumed until every byte is out, since async writers
    /// report readiness rather than blocking for the whole buffer. Only a write
    /// that accepts zero bytes is treated as a short write, and it is not
    /// retried.
    ///
    /// A non-zero `send_timeout` bounds this call only; nothing carries over
    /// to later sends.
    ///
    /// # Errors
    /// Returns [`TransportError::SendTimeout`] when the timeout expires,
    /// [`TransportError::ShortWrite`] if the socket stops accepting bytes and
    /// [`TransportError::Send`] for OS failures.
    pub async fn send(
        &mut self,
        bytes: &[u8],
        send_timeout: Option<Duration>,
    ) -> Result<(), TransportError> {
        match send_timeout.filter(|limit| !limit.is_zero()) {
            Some(limit) => timeout(limit, self.write_all(bytes))
                .await
                .map_err(|_| TransportError::SendTimeout(limit))?,
            None => self.write_all(bytes).await,
        }
    }

    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut sent = 0;
        while let Some(rest) = bytes.get(sent..).filter(|rest| !rest.is_empty()) {
            let written = self
                .writer
                .write(rest)
                .await
                .map_err(TransportError::Send)?;
            if written == 0 {
                return Err(TransportError::ShortWrite {
                    sent,
                    expected: bytes.len(),
                });
            }
            sent += written;
        }
        self.writer.flush().await.map_err(TransportError::Send)
    }

    /// Half-close the send side.
    ///
    /// # Errors
    /// Returns [`TransportError::Send`] if the shutdown fails.
    pub async fn shutdown(&mut self) -> Result<(), TransportError> {
        self.writer.shutdown().await.map_err(TransportError::Send)
    }
}

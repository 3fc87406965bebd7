//! Shared per-connection state.

use std::{
    fmt,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use bytes::BytesMut;
use tokio::{
    sync::{Mutex, watch},
    time::timeout,
};
use tokio_util::codec::Encoder;
use tracing::debug;

use crate::{
    codec::{FrameEncoder, MAX_HEADER_LEN, Masking, OutboundFrame, Opcode},
    error::{ClientError, ProtocolViolation},
    transport::{BoxedWriter, TransportError, TransportWriter},
};

/// What is known about the remote end of a connection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PeerIdentity {
    /// Target host as configured.
    pub host: String,
    /// Target port.
    pub port: u16,
    /// Request path.
    pub path: String,
    /// Address that accepted the connection, when known.
    pub addr: Option<SocketAddr>,
    /// Reverse-resolved peer name; the Negotiate service principal host.
    pub canonical_name: Option<String>,
}

/// Handle to a live connection.
///
/// Cheap to clone. Handlers receive one on every callback and may send
/// through it; sends from different tasks are serialized so frames never
/// interleave on the wire.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Shared>,
}

struct Shared {
    peer: PeerIdentity,
    masking: Masking,
    open: AtomicBool,
    writer: Mutex<TransportWriter<BoxedWriter>>,
    shutdown: watch::Sender<bool>,
    finished: watch::Receiver<bool>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.inner.peer)
            .field("masking", &self.inner.masking)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl Connection {
    pub(super) fn new(
        peer: PeerIdentity,
        masking: Masking,
        writer: TransportWriter<BoxedWriter>,
        shutdown: watch::Sender<bool>,
        finished: watch::Receiver<bool>,
    ) -> Self {
        Self {
            inner: Arc::new(Shared {
                peer,
                masking,
                open: AtomicBool::new(true),
                writer: Mutex::new(writer),
                shutdown,
                finished,
            }),
        }
    }

    /// Remote end of this connection.
    #[must_use]
    pub fn peer(&self) -> &PeerIdentity { &self.inner.peer }

    /// Best-effort liveness snapshot.
    #[must_use]
    pub fn is_open(&self) -> bool { self.inner.open.load(Ordering::Acquire) }

    pub(super) fn mark_closed(&self) { self.inner.open.store(false, Ordering::Release); }

    /// Send one complete frame.
    ///
    /// A non-zero `timeout` bounds this call only.
    ///
    /// # Errors
    /// Returns [`ClientError::NotOpen`] once the connection has closed and a
    /// [`ClientError::Transport`] if the write fails.
    pub async fn send(
        &self,
        payload: &[u8],
        opcode: Opcode,
        timeout: Option<Duration>,
    ) -> Result<(), ClientError> {
        if !self.is_open() {
            return Err(ClientError::NotOpen);
        }
        let mut frame = BytesMut::with_capacity(MAX_HEADER_LEN + payload.len());
        FrameEncoder::new(self.inner.masking)
            .encode(OutboundFrame::new(opcode, payload), &mut frame)
            .map_err(ProtocolViolation::Encode)?;
        let mut writer = self.inner.writer.lock().await;
        writer.send(&frame, timeout).await?;
        Ok(())
    }

    /// Send a text message.
    ///
    /// # Errors
    /// See [`Connection::send`].
    pub async fn send_text(&self, text: &str) -> Result<(), ClientError> {
        self.send(text.as_bytes(), Opcode::Text, None).await
    }

    /// Send a binary message.
    ///
    /// # Errors
    /// See [`Connection::send`].
    pub async fn send_binary(&self, payload: &[u8]) -> Result<(), ClientError> {
        self.send(payload, Opcode::Binary, None).await
    }

    /// Send a ping carrying `payload`.
    ///
    /// # Errors
    /// See [`Connection::send`].
    pub async fn ping(&self, payload: &[u8]) -> Result<(), ClientError> {
        self.send(payload, Opcode::Ping, None).await
    }

    /// Send one frame, bounding both the wait for the writer and the write
    /// itself by `limit`.
    pub(super) async fn send_within(
        &self,
        payload: &[u8],
        opcode: Opcode,
        limit: Duration,
    ) -> Result<(), ClientError> {
        timeout(limit, self.send(payload, opcode, Some(limit)))
            .await
            .unwrap_or(Err(ClientError::Transport(TransportError::SendTimeout(limit))))
    }

    /// Ask the receive loop to close the connection without waiting.
    ///
    /// Safe to call from inside a handler.
    pub fn request_close(&self) { self.inner.shutdown.send_replace(true); }

    /// Wait until the receive loop has exited.
    pub async fn closed(&self) {
        let mut finished = self.inner.finished.clone();
        if finished.wait_for(|done| *done).await.is_err() {
            debug!("receive loop ended without reporting completion");
        }
    }

    /// Whether the receive loop has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool { *self.inner.finished.borrow() }

    pub(super) async fn shutdown_writer(&self) -> Result<(), TransportError> {
        self.inner.writer.lock().await.shutdown().await
    }
}

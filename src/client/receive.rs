//! Background receive loop.
//!
//! One task per connection decodes frames, reassembles fragments, answers
//! pings and hands each message to the [`Handler`]. It is the only owner of
//! the reassembly state. When it exits for any reason it clears the open
//! flag, calls [`Handler::on_disconnect`] once and then reports completion.

use std::{sync::Arc, time::Duration};

use tokio::{sync::watch, time::timeout};
use tracing::{debug, info, warn};

use super::{Connection, Handler};
use crate::{
    codec::{Message, Opcode, Reassembler, read_frame},
    error::ClientError,
    transport::{BoxedReader, TransportReader},
};

/// State owned by the receive task.
pub(super) struct ReceiveLoop {
    reader: TransportReader<BoxedReader>,
    connection: Connection,
    handler: Arc<dyn Handler>,
    reassembler: Reassembler,
    max_message_size: Option<u64>,
    close_timeout: Duration,
    shutdown: watch::Receiver<bool>,
    finished: watch::Sender<bool>,
}

impl ReceiveLoop {
    pub(super) fn new(
        reader: TransportReader<BoxedReader>,
        connection: Connection,
        handler: Arc<dyn Handler>,
        max_message_size: Option<u64>,
        close_timeout: Duration,
        shutdown: watch::Receiver<bool>,
        finished: watch::Sender<bool>,
    ) -> Self {
        Self {
            reader,
            connection,
            handler,
            reassembler: Reassembler::new(max_message_size),
            max_message_size,
            close_timeout,
            shutdown,
            finished,
        }
    }

    /// Run until the connection ends, then notify the handler.
    pub(super) async fn run(mut self) {
        let outcome = self.pump().await;
        self.connection.mark_closed();
        let peer = self.connection.peer();
        match &outcome {
            Ok(()) => info!(host = %peer.host, port = peer.port, "connection closed"),
            Err(err) => warn!(host = %peer.host, port = peer.port, error = %err, "connection failed"),
        }
        self.handler
            .on_disconnect(&self.connection, outcome.err())
            .await;
        self.finished.send_replace(true);
    }

    async fn pump(&mut self) -> Result<(), ClientError> {
        loop {
            let frame = tokio::select! {
                biased;
                _ = self.shutdown.changed() => {
                    self.close_locally().await;
                    return Ok(());
                }
                frame = read_frame(&mut self.reader, self.max_message_size) => frame?,
            };
            let Some(frame) = frame else {
                debug!("peer closed the stream");
                return Ok(());
            };
            let Some(message) = self.reassembler.push(frame)? else {
                continue;
            };
            match message.opcode {
                Opcode::Close => {
                    debug!(len = message.payload.len(), "close frame received");
                    self.connection.mark_closed();
                    return Ok(());
                }
                Opcode::Ping => answer_ping(&self.connection, &message, self.close_timeout).await,
                _ => {}
            }
            self.handler.on_message(&self.connection, message).await;
        }
    }

    /// Half-close, then discard inbound bytes until the peer finishes or the
    /// close timeout runs out. Each phase gets its own `close_timeout`, so a
    /// send stalled on the writer cannot hold the loop open.
    async fn close_locally(&mut self) {
        self.connection.mark_closed();
        match timeout(self.close_timeout, self.connection.shutdown_writer()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => debug!(error = %err, "half-close failed"),
            Err(_) => warn!(timeout = ?self.close_timeout, "writer busy; skipping half-close"),
        }
        match timeout(self.close_timeout, self.reader.drain()).await {
            Ok(discarded) => debug!(discarded, "drained inbound bytes"),
            Err(_) => warn!(timeout = ?self.close_timeout, "peer did not close in time"),
        }
    }
}

/// Reply to `ping` with a pong carrying the same payload.
///
/// Waiting for the writer and writing are both bounded by `limit`; a writer
/// held by a stalled send costs one pong, not the loop.
async fn answer_ping(connection: &Connection, ping: &Message, limit: Duration) {
    if let Err(err) = connection
        .send_within(&ping.payload, Opcode::Pong, limit)
        .await
    {
        warn!(error = %err, "failed to answer ping");
    }
}

//! Consumer-facing client.
//!
//! [`ClientBuilder::connect`] resolves and connects, runs the upgrade
//! handshake, and on success spawns the receive loop that feeds a
//! [`Handler`]. Any failure up to that point is returned to the caller and
//! leaves no task behind.
//!
//! Handlers run on the receive task. They may send through the
//! [`Connection`] they are given and may call
//! [`Connection::request_close`], but must not await
//! [`Client::join`], [`Client::close`] or [`Connection::closed`]: those
//! wait for the very task running the handler and never return.

mod connection;
mod receive;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::watch,
    task::JoinHandle,
    time::timeout,
};
use tracing::{info, warn};

pub use self::connection::{Connection, PeerIdentity};
use self::receive::ReceiveLoop;
pub use crate::codec::Message;
use crate::{
    auth::{Authenticate, NoAuthenticator, Negotiator, SecurityProvider},
    codec::Opcode,
    config::ClientConfig,
    error::ClientError,
    handshake::{self, HandshakeError, HandshakeOptions, UpgradeRequest},
    transport,
};

/// Callbacks invoked on the receive task.
///
/// Calling [`Client::join`] or [`Client::close`] from inside a callback waits
/// on the task running that callback and never returns. Use
/// [`Connection::request_close`] to end the session from a callback.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// A complete message arrived. Pings are delivered after the pong has
    /// been sent; close frames are never delivered.
    async fn on_message(&self, connection: &Connection, message: Message);

    /// The receive loop exited. Called exactly once; `error` is `None` for
    /// an orderly close by either side.
    async fn on_disconnect(&self, connection: &Connection, error: Option<ClientError>) {
        let _ = (connection, error);
    }
}

/// Configures and opens a [`Client`].
pub struct ClientBuilder {
    config: ClientConfig,
    authenticator: Box<dyn Authenticate>,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ClientBuilder {
    /// Start from `config` with no authentication support.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            authenticator: Box::new(NoAuthenticator),
        }
    }

    /// Answer NTLM and Negotiate challenges with `provider`.
    #[must_use]
    pub fn security_provider<P: SecurityProvider>(self, provider: P) -> Self {
        self.authenticator(Negotiator::new(provider))
    }

    /// Answer challenges with a custom authenticator.
    #[must_use]
    pub fn authenticator(mut self, authenticator: impl Authenticate + 'static) -> Self {
        self.authenticator = Box::new(authenticator);
        self
    }

    /// Connect over TCP, upgrade, and start the receive loop.
    ///
    /// # Errors
    /// Returns [`ClientError::Transport`] if the target cannot be reached and
    /// [`ClientError::Handshake`] if the upgrade fails.
    pub async fn connect<H: Handler>(self, handler: H) -> Result<Client, ClientError> {
        let connected = transport::connect(
            &self.config.host,
            self.config.port,
            self.config.connect_timeout,
        )
        .await?;
        let peer = PeerIdentity {
            host: self.config.host.clone(),
            port: self.config.port,
            path: self.config.path.clone(),
            addr: Some(connected.peer_addr),
            canonical_name: connected.canonical_name,
        };
        self.connect_stream(connected.stream, peer, handler).await
    }

    /// Upgrade an already connected stream and start the receive loop.
    ///
    /// `stream` may be any decorated transport, such as a TLS session.
    /// `peer.canonical_name` supplies the Negotiate service principal.
    ///
    /// # Errors
    /// Returns [`ClientError::Handshake`] if the upgrade fails.
    pub async fn connect_stream<S, H>(
        mut self,
        stream: S,
        peer: PeerIdentity,
        handler: H,
    ) -> Result<Client, ClientError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
        H: Handler,
    {
        let (mut reader, mut writer) = transport::split(stream);
        let request = UpgradeRequest::new(&self.config.host, self.config.port, &self.config.path);
        let options = HandshakeOptions {
            max_header_size: self.config.max_header_size,
            max_auth_rounds: self.config.max_auth_rounds,
            peer_name: peer.canonical_name.clone(),
        };
        let exchange = handshake::perform(
            &mut reader,
            &mut writer,
            &request,
            self.authenticator.as_mut(),
            &options,
        );
        let outcome = match self.config.handshake_timeout {
            Some(limit) => timeout(limit, exchange)
                .await
                .unwrap_or_else(|_| Err(HandshakeError::TimedOut(limit))),
            None => exchange.await,
        };
        self.authenticator.finish();
        outcome?;
        info!(
            host = %peer.host,
            port = peer.port,
            path = %peer.path,
            "websocket handshake complete"
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (finished_tx, finished_rx) = watch::channel(false);
        let connection = Connection::new(
            peer,
            self.config.masking,
            writer,
            shutdown_tx,
            finished_rx,
        );
        let receive = ReceiveLoop::new(
            reader,
            connection.clone(),
            Arc::new(handler),
            self.config.max_message_size,
            self.config.close_timeout,
            shutdown_rx,
            finished_tx,
        );
        let task = tokio::spawn(receive.run());
        Ok(Client {
            connection,
            task: Some(task),
        })
    }
}

/// An open WebSocket client.
///
/// Dropping the client asks the receive loop to close the connection; use
/// [`Client::close`] to also wait for it.
#[derive(Debug)]
pub struct Client {
    connection: Connection,
    task: Option<JoinHandle<()>>,
}

impl Client {
    /// Connect with default options and no authentication support.
    ///
    /// # Errors
    /// See [`ClientBuilder::connect`].
    pub async fn connect<H: Handler>(config: ClientConfig, handler: H) -> Result<Self, ClientError> {
        ClientBuilder::new(config).connect(handler).await
    }

    /// Start configuring a client.
    #[must_use]
    pub fn builder(config: ClientConfig) -> ClientBuilder { ClientBuilder::new(config) }

    /// Handle to the underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &Connection { &self.connection }

    /// Best-effort liveness snapshot.
    #[must_use]
    pub fn is_open(&self) -> bool { self.connection.is_open() }

    /// Send one complete frame.
    ///
    /// # Errors
    /// See [`Connection::send`].
    pub async fn send(
        &self,
        payload: &[u8],
        opcode: Opcode,
        timeout: Option<std::time::Duration>,
    ) -> Result<(), ClientError> {
        self.connection.send(payload, opcode, timeout).await
    }

    /// Send a text message.
    ///
    /// # Errors
    /// See [`Connection::send`].
    pub async fn send_text(&self, text: &str) -> Result<(), ClientError> {
        self.connection.send_text(text).await
    }

    /// Send a binary message.
    ///
    /// # Errors
    /// See [`Connection::send`].
    pub async fn send_binary(&self, payload: &[u8]) -> Result<(), ClientError> {
        self.connection.send_binary(payload).await
    }

    /// Send a ping.
    ///
    /// # Errors
    /// See [`Connection::send`].
    pub async fn ping(&self, payload: &[u8]) -> Result<(), ClientError> {
        self.connection.ping(payload).await
    }

    /// Wait until the receive loop has exited.
    pub async fn join(&self) { self.connection.closed().await; }

    /// Close the connection and wait for the receive loop to finish.
    ///
    /// Idempotent with respect to [`Drop`].
    pub async fn close(mut self) {
        self.connection.request_close();
        let Some(task) = self.task.take() else {
            return;
        };
        if let Err(err) = task.await {
            warn!(error = %err, "receive task failed");
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.connection.request_close();
        }
    }
}

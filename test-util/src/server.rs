//! Scripted WebSocket server used by integration suites.
//!
//! [`MockServer`] binds an ephemeral loopback port, accepts exactly one
//! connection and plays a list of [`Step`]s against it. Everything it reads
//! is kept in a [`Transcript`] returned by [`MockServer::finish`].

use std::{net::SocketAddr, time::Duration};

use anyhow::{Context, bail};
use tokio::{net::TcpListener, task::JoinHandle, time::timeout};
use tracing::debug;
use wsclient::{
    codec::{Frame, read_frame},
    handshake::accept_key,
    transport::{self, BoxedReader, BoxedWriter, TransportReader, TransportWriter},
};

use crate::AnyError;

const MAX_REQUEST: usize = 16 * 1024;
const STEP_TIMEOUT: Duration = Duration::from_secs(10);

/// One action performed by the server.
#[derive(Clone, Debug)]
pub enum Step {
    /// Read one request header block.
    ReadRequest,
    /// Answer the latest request with `101 Switching Protocols`.
    Accept,
    /// Answer with `401 Unauthorized` and the given `WWW-Authenticate` value.
    Challenge(String),
    /// Write raw bytes.
    Raw(Vec<u8>),
    /// Read one client frame.
    ReadFrame,
    /// Pause before the next step.
    Sleep(Duration),
    /// Shut down the server's write half.
    Shutdown,
    /// Discard input until the client closes its side.
    AwaitClose,
}

/// One HTTP request as received.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    text: String,
}

impl RecordedRequest {
    /// The request line, such as `GET / HTTP/1.1`.
    #[must_use]
    pub fn request_line(&self) -> &str { self.text.lines().next().unwrap_or_default() }

    /// Value of the first header called `name`, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.text
            .lines()
            .skip(1)
            .filter_map(|line| line.split_once(": "))
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Raw request text.
    #[must_use]
    pub fn as_str(&self) -> &str { &self.text }
}

/// Everything the server observed.
#[derive(Debug, Default)]
pub struct Transcript {
    /// Requests in arrival order.
    pub requests: Vec<RecordedRequest>,
    /// Client frames in arrival order.
    pub frames: Vec<Frame>,
    /// Bytes discarded while waiting for the client to close.
    pub drained: usize,
}

/// A one-connection scripted server.
#[derive(Debug)]
pub struct MockServer {
    addr: SocketAddr,
    task: JoinHandle<Result<Transcript, AnyError>>,
}

impl MockServer {
    /// Bind to loopback and start playing `steps` once a client connects.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start(steps: Vec<Step>) -> Result<Self, AnyError> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind mock server")?;
        let addr = listener.local_addr()?;
        let task = tokio::spawn(async move {
            let (stream, peer) = listener.accept().await.context("accept client")?;
            debug!(%peer, "mock server accepted connection");
            let (reader, writer) = transport::split(stream);
            Script {
                reader,
                writer,
                transcript: Transcript::default(),
            }
            .play(steps)
            .await
        });
        Ok(Self { addr, task })
    }

    /// Address the server listens on.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr { self.addr }

    /// Port the server listens on.
    #[must_use]
    pub const fn port(&self) -> u16 { self.addr.port() }

    /// Wait for the script to finish and return what it saw.
    ///
    /// # Errors
    ///
    /// Returns the first step failure, or an error if the script does not
    /// finish in time.
    pub async fn finish(self) -> Result<Transcript, AnyError> {
        timeout(STEP_TIMEOUT, self.task)
            .await
            .context("mock server timed out")?
            .context("mock server panicked")?
    }
}

struct Script {
    reader: TransportReader<BoxedReader>,
    writer: TransportWriter<BoxedWriter>,
    transcript: Transcript,
}

impl Script {
    async fn play(mut self, steps: Vec<Step>) -> Result<Transcript, AnyError> {
        for step in steps {
            debug!(?step, "mock server step");
            timeout(STEP_TIMEOUT, self.apply(step))
                .await
                .context("mock server step timed out")??;
        }
        Ok(self.transcript)
    }

    async fn apply(&mut self, step: Step) -> Result<(), AnyError> {
        match step {
            Step::ReadRequest => {
                let Some(block) = self.reader.recv_until_blank_line(MAX_REQUEST).await? else {
                    bail!("client closed before sending a request");
                };
                self.transcript.requests.push(RecordedRequest {
                    text: String::from_utf8_lossy(&block).into_owned(),
                });
            }
            Step::Accept => {
                let key = self
                    .transcript
                    .requests
                    .last()
                    .and_then(|request| request.header("Sec-WebSocket-Key"))
                    .context("no request key to accept")?;
                let reply = format!(
                    "HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: \
                     Upgrade\r\nSec-WebSocket-Accept: {}\r\n\r\n",
                    accept_key(key)
                );
                self.writer.send(reply.as_bytes(), None).await?;
            }
            Step::Challenge(value) => {
                let reply = format!(
                    "HTTP/1.1 401 Unauthorized\r\nWWW-Authenticate: {value}\r\nContent-Length: \
                     0\r\n\r\n"
                );
                self.writer.send(reply.as_bytes(), None).await?;
            }
            Step::Raw(bytes) => self.writer.send(&bytes, None).await?,
            Step::ReadFrame => {
                let Some(frame) = read_frame(&mut self.reader, None).await? else {
                    bail!("client closed before sending a frame");
                };
                self.transcript.frames.push(frame);
            }
            Step::Sleep(pause) => tokio::time::sleep(pause).await,
            Step::Shutdown => self.writer.shutdown().await?,
            Step::AwaitClose => self.transcript.drained += self.reader.drain().await,
        }
        Ok(())
    }
}

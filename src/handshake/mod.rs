//! HTTP upgrade handshake.
//!
//! The engine sends the upgrade request, reads one response header block at
//! a time and either answers an authentication challenge, fails, or
//! validates the switch to the WebSocket protocol:
//!
//! ```text
//! Connecting -> AwaitingResponse -> (Authenticating)* -> Established | Failed
//! ```
//!
//! Bytes the server sends after the final header block stay buffered in the
//! [`TransportReader`] and become the start of the frame stream.

mod errors;
mod request;
mod response;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

pub use self::{
    errors::HandshakeError,
    request::{UpgradeRequest, accept_key, generate_key},
    response::{HttpResponse, parse_response},
};
use crate::{
    auth::{Authenticate, Challenge},
    transport::{DEFAULT_MAX_HEADER_SIZE, TransportReader, TransportWriter},
};

/// GUID appended to the client key before hashing.
pub const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";
/// Protocol version sent in `Sec-WebSocket-Version`.
pub const WEBSOCKET_VERSION: &str = "13";
/// Status confirming the protocol switch.
pub const HTTP_SWITCHING_PROTOCOLS: u16 = 101;
/// Status carrying an authentication challenge.
pub const HTTP_UNAUTHORIZED: u16 = 401;
/// Default bound on authentication round trips.
pub const DEFAULT_MAX_AUTH_ROUNDS: usize = 8;

/// Progress of one handshake.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandshakeState {
    /// Transport is up; nothing sent yet.
    Connecting,
    /// Request sent; waiting for the server's header block.
    AwaitingResponse,
    /// Answering challenge number `round`.
    Authenticating {
        /// One-based authentication round.
        round: usize,
    },
    /// The server switched protocols.
    Established,
    /// The handshake was abandoned.
    Failed,
}

/// Limits and peer facts the engine needs besides the request.
#[derive(Clone, Debug)]
pub struct HandshakeOptions {
    /// Largest accepted response header block.
    pub max_header_size: usize,
    /// Most challenges answered before giving up.
    pub max_auth_rounds: usize,
    /// Reverse-resolved peer name, used as the Negotiate principal.
    pub peer_name: Option<String>,
}

impl Default for HandshakeOptions {
    fn default() -> Self {
        Self {
            max_header_size: DEFAULT_MAX_HEADER_SIZE,
            max_auth_rounds: DEFAULT_MAX_AUTH_ROUNDS,
            peer_name: None,
        }
    }
}

/// Check that `response` completes the upgrade requested with `key`.
///
/// # Errors
/// Returns [`HandshakeError::UnexpectedStatus`] for any status but 101,
/// [`HandshakeError::MalformedResponse`] when a required header is missing
/// or differs, and [`HandshakeError::InvalidAccept`] when the accept value
/// does not match.
pub fn validate_upgrade(response: &HttpResponse, key: &str) -> Result<(), HandshakeError> {
    if response.status() != HTTP_SWITCHING_PROTOCOLS {
        return Err(HandshakeError::UnexpectedStatus(response.status()));
    }
    if response.header("Upgrade") != Some("websocket") {
        return Err(HandshakeError::MalformedResponse("missing Upgrade: websocket"));
    }
    if response.header("Connection") != Some("Upgrade") {
        return Err(HandshakeError::MalformedResponse("missing Connection: Upgrade"));
    }
    let accept = response
        .header("Sec-WebSocket-Accept")
        .ok_or(HandshakeError::MalformedResponse("missing Sec-WebSocket-Accept"))?;
    if accept.as_bytes() != accept_key(key).as_bytes() {
        return Err(HandshakeError::InvalidAccept);
    }
    Ok(())
}

/// Drive the handshake for `request` to completion.
///
/// Every 401 response carrying `WWW-Authenticate` is answered through
/// `authenticator` by replaying the request with an `Authorization` header.
///
/// # Errors
/// Returns a [`HandshakeError`] describing the first failure.
pub async fn perform<R, W>(
    reader: &mut TransportReader<R>,
    writer: &mut TransportWriter<W>,
    request: &UpgradeRequest,
    authenticator: &mut dyn Authenticate,
    options: &HandshakeOptions,
) -> Result<HttpResponse, HandshakeError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut state = HandshakeState::Connecting;
    let result = exchange(reader, writer, request, authenticator, options, &mut state).await;
    state = if result.is_ok() {
        HandshakeState::Established
    } else {
        HandshakeState::Failed
    };
    debug!(?state, "handshake finished");
    result
}

async fn exchange<R, W>(
    reader: &mut TransportReader<R>,
    writer: &mut TransportWriter<W>,
    request: &UpgradeRequest,
    authenticator: &mut dyn Authenticate,
    options: &HandshakeOptions,
    state: &mut HandshakeState,
) -> Result<HttpResponse, HandshakeError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    writer.send(request.render(None).as_bytes(), None).await?;
    *state = HandshakeState::AwaitingResponse;
    let mut round = 0;
    loop {
        let block = reader
            .recv_until_blank_line(options.max_header_size)
            .await?
            .ok_or(HandshakeError::ClosedDuringHandshake)?;
        let response = parse_response(&block)?;
        debug!(status = response.status(), ?state, "handshake response");

        let challenge = (response.status() == HTTP_UNAUTHORIZED)
            .then(|| response.header("WWW-Authenticate"))
            .flatten();
        let Some(header) = challenge else {
            validate_upgrade(&response, request.key())?;
            return Ok(response);
        };

        let challenge = Challenge::parse(header)?;
        if !authenticator.supports(challenge.scheme()) {
            return Err(HandshakeError::UnsupportedAuthScheme(
                challenge.scheme().to_owned(),
            ));
        }
        round += 1;
        if round > options.max_auth_rounds {
            return Err(HandshakeError::TooManyAuthRounds(options.max_auth_rounds));
        }
        *state = HandshakeState::Authenticating { round };
        debug!(scheme = challenge.scheme(), round, "answering challenge");
        let authorization = authenticator.respond(&challenge, options.peer_name.as_deref())?;
        writer
            .send(request.render(Some(&authorization)).as_bytes(), None)
            .await?;
    }
}

#[cfg(test)]
mod tests;

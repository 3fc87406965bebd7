//! Handshake failure taxonomy.

use std::time::Duration;

use thiserror::Error;

use crate::{auth::AuthError, transport::TransportError};

/// Reasons an upgrade handshake can fail.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The final response carried a status other than 101.
    #[error("server answered with HTTP status {0}, expected 101")]
    UnexpectedStatus(u16),
    /// A required upgrade header was missing or had the wrong value.
    #[error("malformed upgrade response: {0}")]
    MalformedResponse(&'static str),
    /// `Sec-WebSocket-Accept` did not match the request key.
    #[error("Sec-WebSocket-Accept does not match the request key")]
    InvalidAccept,
    /// The server demanded an authentication scheme nobody can answer.
    #[error("unsupported authentication scheme {0:?}")]
    UnsupportedAuthScheme(String),
    /// Negotiate needs the peer's canonical name and none was resolved.
    #[error("no service principal name available for Negotiate")]
    NoServicePrincipalName,
    /// The security provider failed.
    #[error("authentication failed: {0}")]
    Auth(#[source] AuthError),
    /// The status line carried a non-numeric status code.
    #[error("invalid HTTP status line {0:?}")]
    InvalidStatusLine(String),
    /// The peer closed the connection before a full response arrived.
    #[error("connection closed during handshake")]
    ClosedDuringHandshake,
    /// The server kept challenging past the round limit.
    #[error("gave up after {0} authentication rounds")]
    TooManyAuthRounds(usize),
    /// The handshake did not finish in time.
    #[error("handshake timed out after {0:?}")]
    TimedOut(Duration),
    /// Socket failure while exchanging the handshake.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<AuthError> for HandshakeError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NoServicePrincipalName => Self::NoServicePrincipalName,
            AuthError::UnsupportedScheme(scheme) => Self::UnsupportedAuthScheme(scheme),
            other => Self::Auth(other),
        }
    }
}

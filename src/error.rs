//! Client-level error types.

use thiserror::Error;
use tokio::io;

use crate::{handshake::HandshakeError, transport::TransportError};

/// Violations of the framing rules detected while decoding or encoding.
#[derive(Debug, Error)]
pub enum ProtocolViolation {
    /// A frame or reassembled message exceeded the configured size limit.
    #[error("message of {size} bytes exceeds limit of {limit} bytes")]
    MessageTooLarge {
        /// Announced or accumulated size.
        size: u64,
        /// Configured limit.
        limit: u64,
    },
    /// An outbound frame could not be encoded.
    #[error("failed to encode frame: {0}")]
    Encode(#[source] io::Error),
}

/// Any failure surfaced by the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Socket-level failure.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The upgrade handshake was rejected or could not complete.
    #[error(transparent)]
    Handshake(#[from] HandshakeError),
    /// The peer broke the framing rules.
    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),
    /// The connection has already closed.
    #[error("connection is not open")]
    NotOpen,
}

//! Errors raised by the socket layer.

use std::time::Duration;

use thiserror::Error;
use tokio::io;

/// Failures while resolving, connecting, sending or receiving.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Name resolution failed or produced no addresses.
    #[error("failed to resolve {host}: {source}")]
    Resolve {
        /// Host that was looked up.
        host: String,
        /// Resolver error.
        source: io::Error,
    },
    /// Every resolved address refused or timed out.
    #[error("could not connect to {host}:{port}: {source}")]
    Connect {
        /// Target host.
        host: String,
        /// Target port.
        port: u16,
        /// Error from the last candidate address.
        source: io::Error,
    },
    /// The OS rejected a write.
    #[error("send failed: {0}")]
    Send(#[source] io::Error),
    /// A send did not finish within its timeout.
    #[error("send timed out after {0:?}")]
    SendTimeout(Duration),
    /// The socket accepted fewer bytes than requested.
    #[error("short write: sent {sent} of {expected} bytes")]
    ShortWrite {
        /// Bytes written before the socket stopped accepting data.
        sent: usize,
        /// Bytes requested.
        expected: usize,
    },
    /// The OS reported a read failure other than a peer reset.
    #[error("receive failed: {0}")]
    Recv(#[source] io::Error),
    /// An HTTP header block grew past the configured limit.
    #[error("HTTP header block exceeds {limit} bytes")]
    HeaderTooLarge {
        /// Configured limit in bytes.
        limit: usize,
    },
}

//! Client configuration.
//!
//! [`ClientConfig`] names the endpoint and the limits the engine enforces.
//! It can be built field by field, with the `with_*` helpers, or parsed from
//! a `ws://` URL.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub use crate::codec::Masking;
use crate::{
    handshake::DEFAULT_MAX_AUTH_ROUNDS,
    transport::DEFAULT_MAX_HEADER_SIZE,
};

/// Port used when a `ws://` URL names none.
pub const DEFAULT_PORT: u16 = 80;
/// Time allowed for the peer to finish closing after a local shutdown.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors returned when a URL cannot be turned into a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The URL did not parse.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// Only plain `ws://` is handled by the core.
    #[error("unsupported URL scheme {0:?}; expected ws")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,
}

/// Endpoint and limits for one client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Host name or address to connect to.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Request path, including any query string.
    pub path: String,
    /// Masking applied to outbound frames.
    pub masking: Masking,
    /// Bound on each TCP connect attempt.
    pub connect_timeout: Option<Duration>,
    /// Bound on the whole upgrade handshake.
    pub handshake_timeout: Option<Duration>,
    /// Time allowed to drain inbound bytes after a local close.
    pub close_timeout: Duration,
    /// Largest accepted frame or reassembled message; `None` for no limit.
    pub max_message_size: Option<u64>,
    /// Largest accepted HTTP response header block.
    pub max_header_size: usize,
    /// Most authentication challenges answered per handshake.
    pub max_auth_rounds: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: DEFAULT_PORT,
            path: "/".to_owned(),
            masking: Masking::default(),
            connect_timeout: None,
            handshake_timeout: None,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            max_message_size: None,
            max_header_size: DEFAULT_MAX_HEADER_SIZE,
            max_auth_rounds: DEFAULT_MAX_AUTH_ROUNDS,
        }
    }
}

impl ClientConfig {
    /// Configuration for `path` on `host:port` with default limits.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            path: path.into(),
            ..Self::default()
        }
    }

    /// Parse a `ws://host[:port][/path][?query]` URL.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the URL is invalid, uses another scheme
    /// or lacks a host.
    pub fn from_url(url: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(url)?;
        if url.scheme() != "ws" {
            return Err(ConfigError::UnsupportedScheme(url.scheme().to_owned()));
        }
        let host = url.host_str().ok_or(ConfigError::MissingHost)?;
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        let mut path = url.path().to_owned();
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }
        Ok(Self::new(
            host,
            url.port().unwrap_or(DEFAULT_PORT),
            path,
        ))
    }

    /// Use `masking` for outbound frames.
    #[must_use]
    pub const fn with_masking(mut self, masking: Masking) -> Self {
        self.masking = masking;
        self
    }

    /// Bound each connect attempt.
    #[must_use]
    pub const fn with_connect_timeout(mut self, limit: Duration) -> Self {
        self.connect_timeout = Some(limit);
        self
    }

    /// Bound the upgrade handshake.
    #[must_use]
    pub const fn with_handshake_timeout(mut self, limit: Duration) -> Self {
        self.handshake_timeout = Some(limit);
        self
    }

    /// Time allowed to drain after a local close.
    #[must_use]
    pub const fn with_close_timeout(mut self, limit: Duration) -> Self {
        self.close_timeout = limit;
        self
    }

    /// Reject frames and messages larger than `limit` bytes.
    #[must_use]
    pub const fn with_max_message_size(mut self, limit: u64) -> Self {
        self.max_message_size = Some(limit);
        self
    }

    /// Cap the number of authentication rounds.
    #[must_use]
    pub const fn with_max_auth_rounds(mut self, rounds: usize) -> Self {
        self.max_auth_rounds = rounds;
        self
    }
}

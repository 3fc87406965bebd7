//! Upgrade request construction and accept-key derivation.

use base64::{Engine, engine::general_purpose::STANDARD};
use sha1::{Digest, Sha1};

use super::{WEBSOCKET_GUID, WEBSOCKET_VERSION};

/// Generate a fresh `Sec-WebSocket-Key`: 16 random bytes, base64 encoded.
#[must_use]
pub fn generate_key() -> String {
    let raw: [u8; 16] = rand::random();
    STANDARD.encode(raw)
}

/// Accept value a server must echo for `key`.
#[must_use]
pub fn accept_key(key: &str) -> String {
    let mut sha = Sha1::new();
    sha.update(key.as_bytes());
    sha.update(WEBSOCKET_GUID.as_bytes());
    STANDARD.encode(sha.finalize())
}

/// The GET request that asks the server to switch protocols.
///
/// The same request, plus an `Authorization` header, is replayed for every
/// authentication round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpgradeRequest {
    host: String,
    port: u16,
    path: String,
    key: String,
}

impl UpgradeRequest {
    /// Build a request for `path` on `host:port` with a fresh key.
    #[must_use]
    pub fn new(host: &str, port: u16, path: &str) -> Self {
        Self::with_key(host, port, path, generate_key())
    }

    /// Build a request with a caller-chosen key.
    #[must_use]
    pub fn with_key(host: &str, port: u16, path: &str, key: String) -> Self {
        let path = if path.is_empty() { "/" } else { path };
        Self {
            host: host.to_owned(),
            port,
            path: path.to_owned(),
            key,
        }
    }

    /// Base64 handshake key.
    #[must_use]
    pub fn key(&self) -> &str { &self.key }

    /// Accept value the server must return for this request.
    #[must_use]
    pub fn expected_accept(&self) -> String { accept_key(&self.key) }

    /// Render the request, optionally carrying an `Authorization` value.
    #[must_use]
    pub fn render(&self, authorization: Option<&str>) -> String {
        let mut request = format!(
            "GET {path} HTTP/1.1\r\nHost: {host}:{port}\r\nUpgrade: websocket\r\nConnection: \
             Upgrade\r\nSec-WebSocket-Key: {key}\r\nSec-WebSocket-Version: {version}\r\n",
            path = self.path,
            host = self.host,
            port = self.port,
            key = self.key,
            version = WEBSOCKET_VERSION,
        );
        if let Some(value) = authorization {
            request.push_str("Authorization: ");
            request.push_str(value);
            request.push_str("\r\n");
        }
        request.push_str("\r\n");
        request
    }
}

//! `WWW-Authenticate` challenge parsing.

use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD};

use super::AuthError;

/// Authentication schemes a security provider may answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthScheme {
    /// Microsoft NTLM.
    Ntlm,
    /// SPNEGO, usually Kerberos.
    Negotiate,
}

impl AuthScheme {
    /// Match a scheme token exactly as it appears on the wire.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "NTLM" => Some(Self::Ntlm),
            "Negotiate" => Some(Self::Negotiate),
            _ => None,
        }
    }

    /// Wire name of the scheme.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ntlm => "NTLM",
            Self::Negotiate => "Negotiate",
        }
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// A parsed `WWW-Authenticate` header: a scheme and an optional token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Challenge {
    scheme: String,
    token: Vec<u8>,
}

impl Challenge {
    /// Split `header` at the first space into scheme and base64 token.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidChallenge`] if the token is not base64.
    pub fn parse(header: &str) -> Result<Self, AuthError> {
        let (scheme, encoded) = header.split_once(' ').unwrap_or((header, ""));
        let encoded = encoded.trim();
        let token = if encoded.is_empty() {
            Vec::new()
        } else {
            STANDARD.decode(encoded)?
        };
        Ok(Self {
            scheme: scheme.to_owned(),
            token,
        })
    }

    /// Scheme token as sent by the server.
    #[must_use]
    pub fn scheme(&self) -> &str { &self.scheme }

    /// Decoded challenge bytes; empty on the first round.
    #[must_use]
    pub fn token(&self) -> &[u8] { &self.token }
}

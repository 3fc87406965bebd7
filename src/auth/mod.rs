//! HTTP challenge/response authentication for the upgrade handshake.
//!
//! Platforms expose NTLM and Negotiate through different native APIs. Both
//! are reached through [`SecurityProvider`], a two-call capability the
//! embedding application implements: acquire a credential once, then step a
//! security context with each server challenge. [`Negotiator`] owns the
//! handles for one connection and adapts a provider to [`Authenticate`], the
//! object-safe view the handshake engine sees. The engine only asks whether
//! a scheme is supported; it never knows which backend answers.

mod challenge;
mod negotiator;

use thiserror::Error;

pub use self::{
    challenge::{AuthScheme, Challenge},
    negotiator::{Negotiator, service_name},
};

/// Failures raised while producing an authentication token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The provider could not acquire a credential handle.
    #[error("failed to acquire credentials: {0}")]
    Credentials(String),
    /// A security context step failed.
    #[error("security context step failed: {0}")]
    Context(String),
    /// The provider returned no token to send.
    #[error("security provider produced an empty token")]
    EmptyToken,
    /// The challenge token was not valid base64.
    #[error("challenge is not valid base64: {0}")]
    InvalidChallenge(#[from] base64::DecodeError),
    /// Negotiate was requested without a canonical peer name.
    #[error("no service principal name available")]
    NoServicePrincipalName,
    /// The scheme is not one this authenticator handles.
    #[error("unsupported scheme {0:?}")]
    UnsupportedScheme(String),
}

/// Result of one security context step.
#[derive(Debug)]
pub struct AuthStep<C> {
    /// Context to thread into the next step.
    pub context: C,
    /// Token to send to the server.
    pub token: Vec<u8>,
    /// The provider considers the exchange finished on its side.
    pub complete: bool,
}

/// Platform security-context primitive for NTLM and Negotiate.
pub trait SecurityProvider: Send + 'static {
    /// Opaque credential handle; released on drop.
    type Credential: Send;
    /// Opaque security context handle; released on drop.
    type Context: Send;

    /// Whether this provider can answer `scheme`.
    fn supports(&self, scheme: AuthScheme) -> bool {
        let _ = scheme;
        true
    }

    /// Acquire the caller's default credentials for `scheme`.
    ///
    /// # Errors
    /// Returns [`AuthError::Credentials`] when no credential is available.
    fn acquire_credentials(&self, scheme: AuthScheme) -> Result<Self::Credential, AuthError>;

    /// Advance the security context with the server's challenge.
    ///
    /// `context` is `None` on the first round. `service_name` is the target
    /// principal for Negotiate and `None` for NTLM.
    ///
    /// # Errors
    /// Returns [`AuthError::Context`] when the provider rejects the step.
    fn step(
        &self,
        credential: &Self::Credential,
        context: Option<Self::Context>,
        challenge: &[u8],
        service_name: Option<&str>,
    ) -> Result<AuthStep<Self::Context>, AuthError>;
}

/// What the handshake engine needs from an authenticator.
pub trait Authenticate: Send {
    /// Whether a challenge using `scheme` can be answered.
    fn supports(&self, scheme: &str) -> bool;

    /// Produce the `Authorization` header value answering `challenge`.
    ///
    /// `peer_name` is the reverse-resolved name of the server.
    ///
    /// # Errors
    /// Returns an [`AuthError`] when no token can be produced.
    fn respond(&mut self, challenge: &Challenge, peer_name: Option<&str>) -> Result<String, AuthError>;

    /// Release any credential and context handles.
    fn finish(&mut self) {}
}

/// Authenticator used when no security provider is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAuthenticator;

impl Authenticate for NoAuthenticator {
    fn supports(&self, _scheme: &str) -> bool { false }

    fn respond(&mut self, challenge: &Challenge, _peer_name: Option<&str>) -> Result<String, AuthError> {
        Err(AuthError::UnsupportedScheme(challenge.scheme().to_owned()))
    }
}

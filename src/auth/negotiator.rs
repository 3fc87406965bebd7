//! Per-connection credential and context ownership.

use base64::{Engine, engine::general_purpose::STANDARD};
use tracing::debug;

use super::{AuthError, AuthScheme, Authenticate, Challenge, SecurityProvider};

/// Service principal for `scheme` against `peer_name`.
///
/// Negotiate targets `HTTP/<peer_name>`; NTLM needs no principal.
///
/// # Errors
/// Returns [`AuthError::NoServicePrincipalName`] for Negotiate when the
/// peer's canonical name is unknown.
pub fn service_name(scheme: AuthScheme, peer_name: Option<&str>) -> Result<Option<String>, AuthError> {
    match scheme {
        AuthScheme::Ntlm => Ok(None),
        AuthScheme::Negotiate => peer_name
            .filter(|name| !name.is_empty())
            .map(|name| Some(format!("HTTP/{name}")))
            .ok_or(AuthError::NoServicePrincipalName),
    }
}

/// Drives a [`SecurityProvider`] through the rounds of one handshake.
///
/// The credential is acquired on the first challenge and reused for every
/// later round; the context is threaded from one step to the next. Both
/// are dropped by [`Authenticate::finish`] or when the negotiator goes away.
pub struct Negotiator<P: SecurityProvider> {
    provider: P,
    credential: Option<P::Credential>,
    context: Option<P::Context>,
    rounds: usize,
}

impl<P: SecurityProvider> Negotiator<P> {
    /// Wrap `provider` with empty handle state.
    pub const fn new(provider: P) -> Self {
        Self {
            provider,
            credential: None,
            context: None,
            rounds: 0,
        }
    }

    /// Number of tokens produced so far.
    #[must_use]
    pub const fn rounds(&self) -> usize { self.rounds }

    /// Whether a credential handle is currently held.
    #[must_use]
    pub const fn has_credential(&self) -> bool { self.credential.is_some() }
}

impl<P: SecurityProvider> Authenticate for Negotiator<P> {
    fn supports(&self, scheme: &str) -> bool {
        AuthScheme::parse(scheme).is_some_and(|scheme| self.provider.supports(scheme))
    }

    fn respond(&mut self, challenge: &Challenge, peer_name: Option<&str>) -> Result<String, AuthError> {
        let scheme = AuthScheme::parse(challenge.scheme())
            .filter(|scheme| self.provider.supports(*scheme))
            .ok_or_else(|| AuthError::UnsupportedScheme(challenge.scheme().to_owned()))?;
        let service = service_name(scheme, peer_name)?;

        let credential = match self.credential.take() {
            Some(credential) => credential,
            None => {
                debug!(%scheme, "acquiring credentials");
                self.provider.acquire_credentials(scheme)?
            }
        };
        let credential = self.credential.insert(credential);

        let step = self.provider.step(
            credential,
            self.context.take(),
            challenge.token(),
            service.as_deref(),
        )?;
        self.context = Some(step.context);
        self.rounds += 1;
        debug!(
            %scheme,
            round = self.rounds,
            complete = step.complete,
            token_len = step.token.len(),
            "security context stepped"
        );
        if step.token.is_empty() {
            return Err(AuthError::EmptyToken);
        }
        Ok(format!("{scheme} {}", STANDARD.encode(&step.token)))
    }

    fn finish(&mut self) {
        self.context = None;
        self.credential = None;
    }
}

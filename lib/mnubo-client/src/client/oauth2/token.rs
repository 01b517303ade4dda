//! Access token types and expiry tracking.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use tokio::time::Instant;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Body of a successful token endpoint response.
///
/// `expires_in` is expressed in milliseconds.
#[derive(Deserialize)]
pub(crate) struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: String,
    #[serde(default)]
    expires_in: u64,
    #[serde(default)]
    scope: String,
    #[serde(default)]
    jti: String,
}

/// A bearer token obtained through the client-credentials flow.
///
/// The expiry instant is stamped when the token is received. A token is valid
/// while the current instant is strictly before it.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AccessToken {
    value: String,
    token_type: String,
    #[zeroize(skip)]
    expires_in: Duration,
    #[zeroize(skip)]
    expires_at: Instant,
    scope: String,
    jti: String,
}

impl AccessToken {
    pub(crate) fn from_response(response: TokenResponse, acquired_at: Instant) -> Self {
        let TokenResponse {
            access_token,
            token_type,
            expires_in,
            scope,
            jti,
        } = response;
        let expires_in = Duration::from_millis(expires_in);

        Self {
            value: access_token,
            token_type,
            expires_in,
            expires_at: acquired_at + expires_in,
            scope,
            jti,
        }
    }

    /// Returns the token value sent as bearer credential.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns the token type announced by the server, usually `bearer`.
    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// Returns the lifetime announced by the server.
    pub fn expires_in(&self) -> Duration {
        self.expires_in
    }

    /// Returns the instant at which the token stops being valid.
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Returns the granted scope.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Returns the token identifier.
    pub fn jti(&self) -> &str {
        &self.jti
    }

    /// Checks if the token is expired.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Returns the time until expiration, `None` once expired.
    pub fn time_until_expiry(&self) -> Option<Duration> {
        let now = Instant::now();
        if now >= self.expires_at {
            None
        } else {
            Some(self.expires_at - now)
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .field("jti", &self.jti)
            .finish()
    }
}

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::HeaderValue;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Errors raised while turning credentials into HTTP headers.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Error, derive_more::Display)]
pub enum AuthenticationError {
    /// Bearer token contains invalid characters for HTTP headers.
    #[display("Bearer token contains invalid characters: {message}")]
    InvalidBearerToken {
        /// Description of the invalid characters or format issue.
        message: String,
    },

    /// Client id contains a colon, which Basic authentication cannot carry.
    #[display("Client id cannot contain colon (:) character")]
    InvalidClientId,

    /// Basic credentials contain invalid characters for HTTP headers.
    #[display("Basic credentials contain invalid characters: {message}")]
    InvalidBasicCredentials {
        /// Description of the invalid characters or format issue.
        message: String,
    },
}

/// Secure wrapper for sensitive string data that zeroes its memory on drop.
///
/// The value is redacted in `Debug` output and masked in `Display` output.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecureString(String);

impl SecureString {
    /// Creates a new secure string from the provided value.
    pub fn new(value: String) -> Self {
        Self(value)
    }

    /// Returns a reference to the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks if the secure string equals the given string slice.
    pub fn equals_str(&self, other: &str) -> bool {
        self.0 == other
    }

    /// Masks sensitive data for display/logging purposes.
    fn mask_sensitive(value: &str) -> String {
        let count = value.chars().count();
        if count <= 8 {
            "***".to_string()
        } else {
            let head: String = value.chars().take(4).collect();
            let tail: String = value.chars().skip(count - 4).collect();
            format!("{head}...{tail}")
        }
    }
}

impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureString")
            .field("value", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Display for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Self::mask_sensitive(&self.0))
    }
}

impl From<String> for SecureString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecureString {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

/// How a client proves its identity to the API.
///
/// The mode is chosen once when the client is built and never changes.
#[derive(Clone)]
pub enum Credentials {
    /// OAuth2 client-credentials flow: tokens are requested from `/oauth/token`
    /// and refreshed when they expire.
    ClientCredentials {
        /// The OAuth2 client id.
        client_id: String,
        /// The OAuth2 client secret.
        client_secret: SecureString,
    },

    /// A token obtained elsewhere, sent as-is on every call.
    StaticToken(SecureString),
}

impl Credentials {
    /// Creates client-credentials flow credentials.
    pub fn client_credentials(
        client_id: impl Into<String>,
        client_secret: impl Into<SecureString>,
    ) -> Self {
        Self::ClientCredentials {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Creates static-token credentials.
    pub fn static_token(token: impl Into<SecureString>) -> Self {
        Self::StaticToken(token.into())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientCredentials { client_id, .. } => f
                .debug_struct("ClientCredentials")
                .field("client_id", client_id)
                .field("client_secret", &"[REDACTED]")
                .finish(),
            Self::StaticToken(_) => f.debug_tuple("StaticToken").field(&"[REDACTED]").finish(),
        }
    }
}

/// Value of the `Authorization` header of a single request.
#[derive(Clone)]
pub(crate) enum Authentication {
    /// `Authorization: Bearer <token>`
    Bearer(SecureString),

    /// `Authorization: Basic <base64(username:password)>`
    Basic {
        username: String,
        password: SecureString,
    },
}

impl Authentication {
    /// Renders the header value, flagged as sensitive.
    pub(crate) fn to_header_value(&self) -> Result<HeaderValue, AuthenticationError> {
        let mut value = match self {
            Self::Bearer(token) => HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
                .map_err(|err| AuthenticationError::InvalidBearerToken {
                    message: err.to_string(),
                })?,

            Self::Basic { username, password } => {
                if username.contains(':') {
                    return Err(AuthenticationError::InvalidClientId);
                }

                let credentials = STANDARD.encode(format!("{username}:{}", password.as_str()));
                HeaderValue::from_str(&format!("Basic {credentials}")).map_err(|err| {
                    AuthenticationError::InvalidBasicCredentials {
                        message: err.to_string(),
                    }
                })?
            }
        };
        value.set_sensitive(true);

        Ok(value)
    }
}

impl fmt::Debug for Authentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearer(_) => f.debug_tuple("Bearer").field(&"[REDACTED]").finish(),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
        }
    }
}

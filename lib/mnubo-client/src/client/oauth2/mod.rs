//! OAuth2 client-credentials authentication.
//!
//! A dynamic client exchanges its client id and secret for an access token on
//! `POST /oauth/token`, keeps it, and requests a new one once it has expired.
//!
//! ```text
//! POST {host}/oauth/token
//! Authorization: Basic base64(client_id:client_secret)
//! Content-Type: application/x-www-form-urlencoded
//!
//! grant_type=client_credentials&scope=ALL
//! ```
//!
//! The token request is never gzip-compressed, whatever the client
//! [`CompressionConfig`](crate::CompressionConfig) says.

mod manager;
mod token;

pub use self::manager::DEFAULT_SCOPE;
pub(crate) use self::manager::TokenManager;
pub use self::token::AccessToken;

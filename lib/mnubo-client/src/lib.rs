//! # mnubo client
//!
//! Authenticated, gzip-aware HTTP client for the mnubo REST API.
//!
//! This crate provides the request pipeline that domain calls (devices, events,
//! owners, ...) are built on:
//! - **OAuth2 client credentials**: the access token is requested on
//!   `POST /oauth/token`, cached, and requested again once expired
//! - **Static tokens**: an externally obtained token is sent as-is
//! - **Gzip**: request bodies can be compressed, and responses flagged with
//!   `Content-Encoding: gzip` are always decompressed
//! - **Typed errors**: transport, compression, authentication, status and decoding
//!   failures are distinct [`ApiClientError`] variants
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mnubo_client::{CompressionConfig, MnuboClient};
//! # use serde::Deserialize;
//! # #[derive(Deserialize)]
//! # struct Owner { username: String }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = MnuboClient::builder()
//!     .with_host("https://rest.sandbox.mnubo.com")
//!     .with_client_credentials("client-id", "client-secret")
//!     .with_compression(CompressionConfig::enabled())
//!     .build()?;
//!
//! // The access token is acquired on the first call
//! let owner: Owner = client.get("/api/v3/owners/alice").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error handling
//!
//! ```rust,no_run
//! use mnubo_client::{ApiClientError, MnuboClient};
//!
//! # async fn example(client: MnuboClient) {
//! match client.get::<serde_json::Value>("/api/v3/owners/alice").await {
//!     Ok(owner) => println!("{owner}"),
//!     Err(ApiClientError::AuthError { source }) => eprintln!("could not authenticate: {source}"),
//!     Err(ApiClientError::StatusError { status_code, body }) => {
//!         eprintln!("rejected with {status_code}: {body}");
//!     }
//!     Err(ApiClientError::DecodeError { path, .. }) => eprintln!("unexpected response at {path}"),
//!     Err(error) => eprintln!("{error}"),
//! }
//! # }
//! ```
//!
//! ## Logging
//!
//! The crate emits [`tracing`](https://docs.rs/tracing) events at `debug` level for every
//! request and token refresh, and at `warn` level when a token cannot be acquired.
//! Credentials are never logged.

mod client;

pub use self::client::compression::{compress, decompress};
pub use self::client::oauth2::DEFAULT_SCOPE;
pub use self::client::{
    AccessToken, ApiClientError, AuthenticationError, CallBody, CompressionConfig, Credentials,
    MnuboClient, MnuboClientBuilder, SecureString,
};

// Re-exports for convenience
pub use http::Method;

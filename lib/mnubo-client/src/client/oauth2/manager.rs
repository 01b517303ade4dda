//! Client-credentials token acquisition and refresh.

use std::fmt;
use std::sync::Arc;

use http::Method;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::token::{AccessToken, TokenResponse};
use crate::client::auth::{Authentication, SecureString};
use crate::client::pipeline::{ClientRequest, RequestPipeline, decode_json};
use crate::client::{ApiClientError, CallBody};

/// Scope requested when none is given.
pub const DEFAULT_SCOPE: &str = "ALL";

pub(crate) const TOKEN_PATH: &str = "/oauth/token";

/// Owns the access token of a dynamic client.
///
/// The token is shared by every clone of the manager. The check-refresh-store sequence
/// runs under a single async mutex: concurrent callers wait for an in-flight refresh
/// and never observe a partially written token.
#[derive(Clone)]
pub(crate) struct TokenManager {
    client_id: String,
    client_secret: SecureString,
    pipeline: RequestPipeline,
    current: Arc<Mutex<Option<AccessToken>>>,
}

impl TokenManager {
    pub(crate) fn new(
        client_id: String,
        client_secret: SecureString,
        pipeline: RequestPipeline,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            pipeline,
            current: Arc::default(),
        }
    }

    /// `true` when no token was acquired yet or when the stored token is expired.
    pub(crate) async fn is_expired(&self) -> bool {
        let guard = self.current.lock().await;
        guard.as_ref().is_none_or(AccessToken::is_expired)
    }

    /// Returns the stored token, expired or not.
    pub(crate) async fn current(&self) -> Option<AccessToken> {
        self.current.lock().await.clone()
    }

    /// Requests a new token and stores it.
    ///
    /// On failure the previously stored token is kept.
    pub(crate) async fn acquire(&self, scope: &str) -> Result<AccessToken, ApiClientError> {
        let mut guard = self.current.lock().await;
        let token = self.request_token(scope).await?;
        *guard = Some(token.clone());
        Ok(token)
    }

    /// Returns a currently valid bearer value, refreshing the token at most once.
    pub(crate) async fn bearer(&self) -> Result<SecureString, ApiClientError> {
        let mut guard = self.current.lock().await;
        if let Some(token) = guard.as_ref().filter(|token| !token.is_expired()) {
            return Ok(SecureString::from(token.value()));
        }

        debug!(client_id = %self.client_id, "access token missing or expired, refreshing");
        let token = self.request_token(DEFAULT_SCOPE).await?;
        let bearer = SecureString::from(token.value());
        *guard = Some(token);

        Ok(bearer)
    }

    async fn request_token(&self, scope: &str) -> Result<AccessToken, ApiClientError> {
        let result = self.exchange_client_credentials(scope).await;
        if let Err(error) = &result {
            warn!(client_id = %self.client_id, %error, "failed to acquire access token");
        }
        result.map_err(ApiClientError::auth)
    }

    async fn exchange_client_credentials(
        &self,
        scope: &str,
    ) -> Result<AccessToken, ApiClientError> {
        let body = CallBody::form(&[("grant_type", "client_credentials"), ("scope", scope)])?;
        let request = ClientRequest::new(Method::POST, TOKEN_PATH, body)
            .with_authorization(Authentication::Basic {
                username: self.client_id.clone(),
                password: self.client_secret.clone(),
            })
            .without_compression();

        let data = self.pipeline.send(request).await?;
        let acquired_at = Instant::now();
        let response: TokenResponse = decode_json(&data)?;
        let token = AccessToken::from_response(response, acquired_at);
        debug!(
            scope = token.scope(),
            expires_in = ?token.expires_in(),
            "access token acquired"
        );

        Ok(token)
    }
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

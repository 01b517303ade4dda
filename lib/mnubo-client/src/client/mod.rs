use http::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

mod auth;
pub use self::auth::{AuthenticationError, Credentials, SecureString};

mod body;
pub use self::body::CallBody;

mod builder;
pub use self::builder::MnuboClientBuilder;

pub mod compression;
pub use self::compression::CompressionConfig;

mod error;
pub use self::error::ApiClientError;

pub mod oauth2;
pub use self::oauth2::AccessToken;

mod pipeline;

#[cfg(test)]
mod integration_tests;

use self::auth::Authentication;
use self::oauth2::{DEFAULT_SCOPE, TokenManager};
use self::pipeline::{ClientRequest, RequestPipeline, decode_json};

/// How a client resolves the bearer credential of each call.
#[derive(Debug, Clone)]
enum ClientAuth {
    Dynamic(TokenManager),
    Static(SecureString),
}

/// Authenticated HTTP client for the mnubo REST API.
///
/// Every call carries `Authorization: Bearer {token}`. With client credentials the token
/// is requested on the first call and requested again once expired; with a static token
/// the token is used as-is and never refreshed.
///
/// Clones share the same access token.
///
/// # Example
///
/// ```rust,no_run
/// use mnubo_client::MnuboClient;
/// # use serde::{Deserialize, Serialize};
/// # #[derive(Serialize)]
/// # struct Event { event_type: String }
/// # #[derive(Deserialize)]
/// # struct EventResult { result: String }
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = MnuboClient::new("client-id", "client-secret", "https://rest.sandbox.mnubo.com")?;
///
/// let events = vec![Event { event_type: "tick".to_string() }];
/// let results: Vec<EventResult> = client.post("/api/v3/events", &events).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MnuboClient {
    pipeline: RequestPipeline,
    auth: ClientAuth,
}

// Create
impl MnuboClient {
    /// Creates a builder.
    pub fn builder() -> MnuboClientBuilder {
        MnuboClientBuilder::default()
    }

    /// Creates a client using the client-credentials flow.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is not a valid URL or the client id contains a colon.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<SecureString>,
        host: impl Into<String>,
    ) -> Result<Self, ApiClientError> {
        Self::builder()
            .with_host(host)
            .with_client_credentials(client_id, client_secret)
            .build()
    }

    /// Creates a client using a static token.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is not a valid URL.
    pub fn with_token(
        token: impl Into<SecureString>,
        host: impl Into<String>,
    ) -> Result<Self, ApiClientError> {
        Self::builder()
            .with_host(host)
            .with_static_token(token)
            .build()
    }
}

// Configuration
impl MnuboClient {
    /// Returns the API host.
    pub fn host(&self) -> &Url {
        self.pipeline.host()
    }

    /// Returns the compression toggles.
    pub fn compression(&self) -> CompressionConfig {
        self.pipeline.compression()
    }

    /// Returns `true` if the client was built with a static token.
    pub fn is_using_static_token(&self) -> bool {
        matches!(self.auth, ClientAuth::Static(_))
    }
}

// Access token
impl MnuboClient {
    /// Requests a new access token with the `ALL` scope.
    ///
    /// # Errors
    ///
    /// See [`get_access_token_with_scope`](Self::get_access_token_with_scope).
    pub async fn get_access_token(&self) -> Result<AccessToken, ApiClientError> {
        self.get_access_token_with_scope(DEFAULT_SCOPE).await
    }

    /// Requests a new access token with the given scope and stores it for the next calls.
    ///
    /// # Errors
    ///
    /// - [`ApiClientError::StaticTokenAcquisition`] on a client using a static token
    /// - [`ApiClientError::AuthError`] if the token endpoint is unreachable, rejects the
    ///   credentials, or answers with an unreadable token; the stored token is kept
    pub async fn get_access_token_with_scope(
        &self,
        scope: &str,
    ) -> Result<AccessToken, ApiClientError> {
        match &self.auth {
            ClientAuth::Dynamic(manager) => manager.acquire(scope).await,
            ClientAuth::Static(_) => Err(ApiClientError::StaticTokenAcquisition),
        }
    }

    /// Returns the stored access token, expired or not.
    ///
    /// Always `None` for a client using a static token.
    pub async fn access_token(&self) -> Option<AccessToken> {
        match &self.auth {
            ClientAuth::Dynamic(manager) => manager.current().await,
            ClientAuth::Static(_) => None,
        }
    }

    /// Returns `true` if the next call will request a new access token.
    ///
    /// Static tokens never expire.
    pub async fn has_expired(&self) -> bool {
        match &self.auth {
            ClientAuth::Dynamic(manager) => manager.is_expired().await,
            ClientAuth::Static(_) => false,
        }
    }

    async fn bearer(&self) -> Result<SecureString, ApiClientError> {
        match &self.auth {
            ClientAuth::Dynamic(manager) => manager.bearer().await,
            ClientAuth::Static(token) => Ok(token.clone()),
        }
    }
}

// Calls
impl MnuboClient {
    /// Sends an authenticated request and returns the raw body of the successful response.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the access token cannot be acquired ([`ApiClientError::AuthError`]), in which case
    ///   no request is sent
    /// - the request cannot be built or sent
    /// - the response status is outside `200..=299` ([`ApiClientError::StatusError`])
    /// - a gzip body cannot be encoded or decoded
    pub async fn call_raw(
        &self,
        method: Method,
        path: &str,
        body: CallBody,
    ) -> Result<Vec<u8>, ApiClientError> {
        let bearer = self.bearer().await?;
        let request = ClientRequest::new(method, path, body)
            .with_authorization(Authentication::Bearer(bearer));

        self.pipeline.send(request).await
    }

    /// Sends an authenticated request and deserializes the JSON response into `T`.
    ///
    /// # Errors
    ///
    /// Same as [`call_raw`](Self::call_raw), plus [`ApiClientError::DecodeError`] when the
    /// response body does not match `T`.
    pub async fn call<T>(
        &self,
        method: Method,
        path: &str,
        body: CallBody,
    ) -> Result<T, ApiClientError>
    where
        T: DeserializeOwned,
    {
        let data = self.call_raw(method, path, body).await?;
        decode_json(&data)
    }

    /// `GET` without payload.
    ///
    /// # Errors
    ///
    /// See [`call`](Self::call).
    pub async fn get<T>(&self, path: &str) -> Result<T, ApiClientError>
    where
        T: DeserializeOwned,
    {
        self.call(Method::GET, path, CallBody::empty()).await
    }

    /// `POST` with a JSON payload.
    ///
    /// # Errors
    ///
    /// See [`call`](Self::call).
    pub async fn post<B, T>(&self, path: &str, payload: &B) -> Result<T, ApiClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(Method::POST, path, CallBody::json(payload)?)
            .await
    }

    /// `PUT` with a JSON payload.
    ///
    /// # Errors
    ///
    /// See [`call`](Self::call).
    pub async fn put<B, T>(&self, path: &str, payload: &B) -> Result<T, ApiClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(Method::PUT, path, CallBody::json(payload)?)
            .await
    }

    /// `DELETE` without payload.
    ///
    /// # Errors
    ///
    /// See [`call`](Self::call).
    pub async fn delete<T>(&self, path: &str) -> Result<T, ApiClientError>
    where
        T: DeserializeOwned,
    {
        self.call(Method::DELETE, path, CallBody::empty()).await
    }
}

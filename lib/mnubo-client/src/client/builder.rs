use url::Url;

use super::auth::{Credentials, SecureString};
use super::compression::CompressionConfig;
use super::oauth2::TokenManager;
use super::pipeline::RequestPipeline;
use super::{ApiClientError, ClientAuth, MnuboClient};

/// Builder for creating [`MnuboClient`] instances.
///
/// A host and exactly one credential mode are required. Compression is disabled by
/// default, and a default `reqwest::Client` is used unless one is supplied.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use mnubo_client::{CompressionConfig, MnuboClient};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let http = reqwest::Client::builder()
///     .timeout(Duration::from_secs(30))
///     .build()?;
///
/// let client = MnuboClient::builder()
///     .with_host("https://rest.sandbox.mnubo.com")
///     .with_client_credentials("client-id", "client-secret")
///     .with_compression(CompressionConfig::enabled())
///     .with_client(http)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MnuboClientBuilder {
    client: Option<reqwest::Client>,
    host: Option<String>,
    credentials: Option<Credentials>,
    compression: CompressionConfig,
}

impl MnuboClientBuilder {
    /// Builds the final `MnuboClient` instance.
    ///
    /// # Errors
    ///
    /// This method can fail if:
    /// - the host or the credentials are missing
    /// - the host is not an absolute `http` or `https` URL
    /// - the client id contains a colon
    pub fn build(self) -> Result<MnuboClient, ApiClientError> {
        let Self {
            client,
            host,
            credentials,
            compression,
        } = self;

        let host = host.ok_or_else(|| ApiClientError::ConfigurationError {
            reason: "missing host".to_string(),
        })?;
        let host = parse_host(&host)?;

        let credentials = credentials.ok_or_else(|| ApiClientError::ConfigurationError {
            reason: "missing credentials".to_string(),
        })?;

        let pipeline = RequestPipeline::new(client.unwrap_or_default(), host, compression);

        let auth = match credentials {
            Credentials::ClientCredentials {
                client_id,
                client_secret,
            } => {
                if client_id.contains(':') {
                    return Err(ApiClientError::ConfigurationError {
                        reason: "client id cannot contain colon (:) character".to_string(),
                    });
                }
                ClientAuth::Dynamic(TokenManager::new(
                    client_id,
                    client_secret,
                    pipeline.clone(),
                ))
            }
            Credentials::StaticToken(token) => ClientAuth::Static(token),
        };

        Ok(MnuboClient { pipeline, auth })
    }

    /// Sets the API host, e.g. `https://rest.sandbox.mnubo.com`.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the credentials.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Uses the client-credentials flow.
    #[must_use]
    pub fn with_client_credentials(
        self,
        client_id: impl Into<String>,
        client_secret: impl Into<SecureString>,
    ) -> Self {
        self.with_credentials(Credentials::client_credentials(client_id, client_secret))
    }

    /// Uses a static token, sent as-is on every call.
    #[must_use]
    pub fn with_static_token(self, token: impl Into<SecureString>) -> Self {
        self.with_credentials(Credentials::static_token(token))
    }

    /// Sets both compression toggles.
    #[must_use]
    pub fn with_compression(mut self, compression: CompressionConfig) -> Self {
        self.compression = compression;
        self
    }

    /// Enables or disables request body compression.
    #[must_use]
    pub fn with_request_compression(mut self, enabled: bool) -> Self {
        self.compression.request = enabled;
        self
    }

    /// Enables or disables the `Accept-Encoding: gzip` hint.
    #[must_use]
    pub fn with_response_compression(mut self, enabled: bool) -> Self {
        self.compression.response = enabled;
        self
    }

    /// Uses a preconfigured `reqwest::Client` (timeouts, proxies, TLS).
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }
}

fn parse_host(host: &str) -> Result<Url, ApiClientError> {
    let url = Url::parse(host).map_err(|err| ApiClientError::InvalidHost {
        host: host.to_string(),
        reason: err.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ApiClientError::InvalidHost {
            host: host.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }

    Ok(url)
}

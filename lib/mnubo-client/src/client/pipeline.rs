use headers::HeaderMapExt;
use http::header::{ACCEPT_ENCODING, AUTHORIZATION, CONTENT_ENCODING, HeaderValue};
use http::{HeaderMap, Method};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::auth::Authentication;
use super::compression::{self, CompressionConfig};
use super::{ApiClientError, CallBody};

/// Header identifying the SDK on every request.
pub(crate) const SDK_HEADER: &str = "x-mnubo-sdk";
pub(crate) const SDK_NAME: &str = "Rust";

const GZIP: &str = "gzip";

/// A single request, assembled just before dispatch.
#[derive(Debug)]
pub(crate) struct ClientRequest {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) body: CallBody,
    pub(crate) authorization: Option<Authentication>,
    /// Bypasses request compression, used for the form-encoded token request.
    pub(crate) skip_compression: bool,
}

impl ClientRequest {
    pub(crate) fn new(method: Method, path: impl Into<String>, body: CallBody) -> Self {
        Self {
            method,
            path: path.into(),
            body,
            authorization: None,
            skip_compression: false,
        }
    }

    #[must_use]
    pub(crate) fn with_authorization(mut self, authorization: Authentication) -> Self {
        self.authorization = Some(authorization);
        self
    }

    #[must_use]
    pub(crate) fn without_compression(mut self) -> Self {
        self.skip_compression = true;
        self
    }
}

/// Returns `true` for status codes classified as success (`200..=299`).
pub(crate) fn is_success(status_code: u16) -> bool {
    (200..=299).contains(&status_code)
}

/// Sends requests to the API host and classifies responses.
///
/// There is no retry and no timeout override: a single failed attempt is a single error.
/// Timeouts are configured on the underlying `reqwest::Client`.
#[derive(Debug, Clone)]
pub(crate) struct RequestPipeline {
    client: reqwest::Client,
    host: Url,
    compression: CompressionConfig,
}

impl RequestPipeline {
    pub(crate) fn new(client: reqwest::Client, host: Url, compression: CompressionConfig) -> Self {
        Self {
            client,
            host,
            compression,
        }
    }

    pub(crate) fn host(&self) -> &Url {
        &self.host
    }

    pub(crate) fn compression(&self) -> CompressionConfig {
        self.compression
    }

    pub(crate) fn build_url(&self, path: &str) -> Result<Url, ApiClientError> {
        let host = self.host.as_str();
        let url = format!(
            "{}/{}",
            host.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Ok(url.parse::<Url>()?)
    }

    /// Builds the outgoing request, failing before any IO if it cannot be built.
    pub(crate) fn build_request(
        &self,
        request: ClientRequest,
    ) -> Result<reqwest::Request, ApiClientError> {
        let ClientRequest {
            method,
            path,
            body,
            authorization,
            skip_compression,
        } = request;

        let url = self.build_url(&path)?;
        let mut headers = HeaderMap::new();

        let compress_request = self.compression.request && !skip_compression;
        let payload = if compress_request {
            headers.insert(CONTENT_ENCODING, HeaderValue::from_static(GZIP));
            compression::compress(&body.data)?
        } else {
            body.data
        };

        headers.typed_insert(body.content_type);
        headers.insert(SDK_HEADER, HeaderValue::from_static(SDK_NAME));

        if let Some(authorization) = &authorization {
            headers.insert(AUTHORIZATION, authorization.to_header_value()?);
        }

        if self.compression.response {
            headers.insert(ACCEPT_ENCODING, HeaderValue::from_static(GZIP));
        }

        let request = self
            .client
            .request(method, url)
            .headers(headers)
            .body(payload)
            .build()?;

        Ok(request)
    }

    /// Sends the request and returns the (decompressed) body of a successful response.
    pub(crate) async fn send(&self, request: ClientRequest) -> Result<Vec<u8>, ApiClientError> {
        let request = self.build_request(request)?;

        debug!(?request, "sending...");
        let response = self.client.execute(request).await?;
        debug!(?response, "...receiving");

        let status_code = response.status().as_u16();
        let gzipped = response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.trim().eq_ignore_ascii_case(GZIP));

        let raw = response.bytes().await?;
        let body = if gzipped {
            compression::decompress(&raw)?
        } else {
            raw.to_vec()
        };

        if !is_success(status_code) {
            let body = String::from_utf8_lossy(&body).into_owned();
            return Err(ApiClientError::StatusError { status_code, body });
        }

        Ok(body)
    }
}

/// Deserializes a JSON body, keeping the failing path for diagnostics.
pub(crate) fn decode_json<T>(data: &[u8]) -> Result<T, ApiClientError>
where
    T: DeserializeOwned,
{
    let deserializer = &mut serde_json::Deserializer::from_slice(data);
    serde_path_to_error::deserialize(deserializer).map_err(|err| ApiClientError::DecodeError {
        path: err.path().to_string(),
        error: err.into_inner(),
        body: String::from_utf8_lossy(data).into_owned(),
    })
}

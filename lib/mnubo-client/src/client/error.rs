use super::auth::AuthenticationError;

/// Errors that can occur when using the [`MnuboClient`](crate::MnuboClient).
///
/// Each variant names one failure kind, so callers can tell "could not authenticate"
/// ([`AuthError`](Self::AuthError)) from "server rejected the request"
/// ([`StatusError`](Self::StatusError)) and from "server response unparsable"
/// ([`DecodeError`](Self::DecodeError)).
#[derive(Debug, derive_more::Error, derive_more::Display, derive_more::From)]
pub enum ApiClientError {
    /// HTTP transport failure from the underlying reqwest library.
    ///
    /// Covers connection, DNS and IO failures, failures while reading the response body,
    /// and requests that could not be built.
    #[display("Transport error: {_0}")]
    TransportError(reqwest::Error),

    /// The request URL could not be built from the host and the path.
    #[display("Invalid request URL: {_0}")]
    UrlError(url::ParseError),

    /// A credential cannot be rendered as an HTTP header.
    #[display("Invalid credential: {_0}")]
    InvalidCredential(AuthenticationError),

    /// JSON serialization of a request body failed.
    #[display("Failed to serialize request body: {_0}")]
    SerializationError(serde_json::Error),

    /// Form serialization of a request body failed.
    #[display("Failed to encode form body: {_0}")]
    FormEncodingError(serde_urlencoded::ser::Error),

    /// Gzip encoding or decoding failed.
    #[display("Failed to {operation} gzip body: {error}")]
    #[from(skip)]
    CompressionError {
        /// Either `compress` or `decompress`.
        operation: &'static str,
        /// The underlying IO error raised by the codec.
        #[error(source)]
        error: std::io::Error,
    },

    /// Access token acquisition failed.
    ///
    /// The wrapped error tells whether the token endpoint was unreachable, rejected the
    /// credentials, or answered with an unreadable token.
    #[display("Authentication failed: {source}")]
    #[from(skip)]
    AuthError {
        /// The failure of the token request.
        source: Box<ApiClientError>,
    },

    /// Token acquisition was requested on a client configured with a static token.
    #[display("Token acquisition is not available for a client using a static token")]
    #[from(skip)]
    StaticTokenAcquisition,

    /// Server answered with a status code outside `200..=299`.
    #[display("Unexpected status code {status_code}: {body}")]
    #[from(skip)]
    StatusError {
        /// The HTTP status code received.
        status_code: u16,
        /// The response body, decompressed if needed.
        body: String,
    },

    /// The response body does not match the expected JSON shape.
    #[display("Failed to deserialize JSON at '{path}': {error}\n{body}")]
    #[from(skip)]
    DecodeError {
        /// Path of the failing element in the JSON document.
        path: String,
        /// The underlying JSON error.
        #[error(source)]
        error: serde_json::Error,
        /// The response body that failed to parse.
        body: String,
    },

    /// The host is not an absolute URL.
    #[display("Invalid host '{host}': {reason}")]
    #[from(skip)]
    InvalidHost {
        /// The host that was provided.
        host: String,
        /// Why the host was rejected.
        reason: String,
    },

    /// The client configuration is incomplete or inconsistent.
    #[display("Invalid client configuration: {reason}")]
    #[from(skip)]
    ConfigurationError {
        /// Description of the configuration issue.
        reason: String,
    },
}

impl ApiClientError {
    pub(crate) fn auth(source: ApiClientError) -> Self {
        Self::AuthError {
            source: Box::new(source),
        }
    }

    /// Returns the HTTP status code if the server rejected the request,
    /// looking through [`AuthError`](Self::AuthError).
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::StatusError { status_code, .. } => Some(*status_code),
            Self::AuthError { source } => source.status_code(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;

    #[test]
    fn test_api_client_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<ApiClientError>();
        assert_sync::<ApiClientError>();
    }

    #[test]
    fn should_display_status_error_with_body() {
        let error = ApiClientError::StatusError {
            status_code: 401,
            body: r#"{"error":"invalid_token"}"#.to_string(),
        };
        assert_snapshot!(error, @r#"Unexpected status code 401: {"error":"invalid_token"}"#);
    }

    #[test]
    fn should_display_auth_error_with_cause() {
        let error = ApiClientError::auth(ApiClientError::StatusError {
            status_code: 400,
            body: "bad credentials".to_string(),
        });
        assert_snapshot!(error, @"Authentication failed: Unexpected status code 400: bad credentials");
        assert_eq!(error.status_code(), Some(400));
    }

    #[test]
    fn should_expose_auth_error_source() {
        use std::error::Error;

        let error = ApiClientError::auth(ApiClientError::StaticTokenAcquisition);
        let source = error.source().expect("should have a source");
        assert_eq!(
            source.to_string(),
            "Token acquisition is not available for a client using a static token"
        );
    }

    #[test]
    fn should_not_report_status_for_other_errors() {
        let error = ApiClientError::ConfigurationError {
            reason: "missing host".to_string(),
        };
        assert_eq!(error.status_code(), None);
    }
}

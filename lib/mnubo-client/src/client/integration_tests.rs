use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use super::*;
use crate::client::compression::{compress, decompress};

#[derive(Debug, Serialize)]
struct Event {
    event_type: String,
}

#[derive(Debug, Deserialize, PartialEq)]
struct EventResult {
    id: String,
    result: String,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn token_response(token: &str, expires_in: u64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "access_token": token,
        "token_type": "bearer",
        "expires_in": expires_in,
        "scope": "ALL",
        "jti": "4f3c2e1a"
    }))
}

async fn mount_token(server: &MockServer, token: &str, expires_in: u64, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(token_response(token, expires_in))
        .expect(expected)
        .mount(server)
        .await;
}

fn dynamic_client(server: &MockServer, compression: CompressionConfig) -> MnuboClient {
    MnuboClient::builder()
        .with_host(server.uri())
        .with_client_credentials("a", "b")
        .with_compression(compression)
        .build()
        .expect("valid client")
}

async fn requests_to(server: &MockServer, request_path: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .into_iter()
        .filter(|request| request.url.path() == request_path)
        .collect()
}

fn header_str<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
}

#[tokio::test]
async fn should_track_token_expiry_in_virtual_time() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok1",
            "expires_in": 1000,
            "scope": "ALL"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let client = dynamic_client(&server, CompressionConfig::default());
    assert!(client.has_expired().await);

    let token = client.get_access_token().await.expect("should acquire");

    assert_eq!(token.value(), "tok1");
    assert_eq!(token.scope(), "ALL");
    assert!(!client.has_expired().await);

    tokio::time::pause();
    tokio::time::advance(Duration::from_millis(1100)).await;
    assert!(client.has_expired().await);
}

#[tokio::test]
async fn should_request_token_with_basic_credentials() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(header("authorization", "Basic YTpi"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(header("x-mnubo-sdk", "Rust"))
        .and(body_string("grant_type=client_credentials&scope=ALL"))
        .respond_with(token_response("tok1", 3_600_000))
        .expect(1)
        .mount(&server)
        .await;
    // Request compression must not apply to the token request
    let client = dynamic_client(&server, CompressionConfig::enabled());

    client.get_access_token().await.expect("should acquire");

    let token_requests = requests_to(&server, "/oauth/token").await;
    assert_eq!(token_requests.len(), 1);
    let token_request = token_requests.first().expect("one request");
    assert_eq!(header_str(token_request, "content-encoding"), None);
}

#[tokio::test]
async fn should_request_token_with_custom_scope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string("grant_type=client_credentials&scope=READ"))
        .respond_with(token_response("tok-read", 3_600_000))
        .expect(1)
        .mount(&server)
        .await;
    let client = dynamic_client(&server, CompressionConfig::default());

    let token = client
        .get_access_token_with_scope("READ")
        .await
        .expect("should acquire");

    assert_eq!(token.value(), "tok-read");
    let stored = client.access_token().await.expect("token stored");
    assert_eq!(stored.value(), "tok-read");
}

#[tokio::test]
async fn should_acquire_token_on_first_call() {
    init_tracing();
    let server = MockServer::start().await;
    mount_token(&server, "tok1", 3_600_000, 1).await;
    Mock::given(method("POST"))
        .and(path("/api/v3/events"))
        .and(header("authorization", "Bearer tok1"))
        .and(header("content-type", "application/json"))
        .and(header("x-mnubo-sdk", "Rust"))
        .and(body_string(r#"[{"event_type":"tick"}]"#))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": "e1", "result": "success"}])),
        )
        .expect(2)
        .mount(&server)
        .await;
    let client = dynamic_client(&server, CompressionConfig::default());
    let events = vec![Event {
        event_type: "tick".to_string(),
    }];

    let results: Vec<EventResult> = client
        .post("/api/v3/events", &events)
        .await
        .expect("should succeed");
    assert_eq!(
        results,
        vec![EventResult {
            id: "e1".to_string(),
            result: "success".to_string(),
        }]
    );

    // The cached token is reused
    let _: Vec<EventResult> = client
        .post("/api/v3/events", &events)
        .await
        .expect("should succeed");
}

#[tokio::test]
async fn should_compress_request_body() {
    let server = MockServer::start().await;
    mount_token(&server, "tok1", 3_600_000, 1).await;
    Mock::given(method("PUT"))
        .and(path("/api/v3/objects"))
        .and(header("content-encoding", "gzip"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    let client = dynamic_client(
        &server,
        CompressionConfig {
            request: true,
            response: false,
        },
    );

    let _: Value = client
        .put("/api/v3/objects", &json!({"x_device_id": "d1"}))
        .await
        .expect("should succeed");

    let requests = requests_to(&server, "/api/v3/objects").await;
    let request = requests.first().expect("one request");
    assert_eq!(header_str(request, "accept-encoding"), None);
    let inflated = decompress(&request.body).expect("gzip-valid body");
    assert_eq!(inflated, br#"{"x_device_id":"d1"}"#);
}

#[tokio::test]
async fn should_send_accept_encoding_hint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/owners/alice"))
        .and(header("accept-encoding", "gzip"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "alice"})))
        .expect(1)
        .mount(&server)
        .await;
    let client = MnuboClient::builder()
        .with_host(server.uri())
        .with_static_token("static-token")
        .with_response_compression(true)
        .build()
        .expect("valid client");

    let owner: Value = client
        .get("/api/v3/owners/alice")
        .await
        .expect("should succeed");

    assert_eq!(owner, json!({"username": "alice"}));
    let requests = requests_to(&server, "/api/v3/owners/alice").await;
    let request = requests.first().expect("one request");
    assert_eq!(header_str(request, "content-encoding"), None);
}

#[tokio::test]
async fn should_decompress_gzip_response_without_response_compression() {
    let server = MockServer::start().await;
    let payload = compress(br#"{"username":"alice"}"#).expect("should compress");
    Mock::given(method("GET"))
        .and(path("/api/v3/owners/alice"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-encoding", "gzip")
                .set_body_bytes(payload),
        )
        .mount(&server)
        .await;
    let client = MnuboClient::with_token("static-token", server.uri()).expect("valid client");
    assert_eq!(client.compression(), CompressionConfig::default());

    let owner: Value = client
        .get("/api/v3/owners/alice")
        .await
        .expect("should succeed");

    assert_eq!(owner, json!({"username": "alice"}));
}

#[tokio::test]
async fn should_report_malformed_gzip_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/owners/alice"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-encoding", "gzip")
                .set_body_string("not gzip at all"),
        )
        .mount(&server)
        .await;
    let client = MnuboClient::with_token("static-token", server.uri()).expect("valid client");

    let error = client
        .get::<Value>("/api/v3/owners/alice")
        .await
        .expect_err("should fail");

    assert!(matches!(
        error,
        ApiClientError::CompressionError {
            operation: "decompress",
            ..
        }
    ));
}

#[tokio::test]
async fn should_surface_status_error_with_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/owners/alice"))
        .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"error":"invalid_token"}"#))
        .mount(&server)
        .await;
    let client = MnuboClient::with_token("static-token", server.uri()).expect("valid client");

    let error = client
        .get::<Value>("/api/v3/owners/alice")
        .await
        .expect_err("should fail");

    let ApiClientError::StatusError { status_code, body } = error else {
        panic!("expected a status error, got {error:?}");
    };
    assert_eq!(status_code, 401);
    assert_eq!(body, r#"{"error":"invalid_token"}"#);
}

#[tokio::test]
async fn should_decompress_error_body() {
    let server = MockServer::start().await;
    let payload = compress(b"internal failure").expect("should compress");
    Mock::given(method("DELETE"))
        .and(path("/api/v3/owners/alice"))
        .respond_with(
            ResponseTemplate::new(500)
                .insert_header("content-encoding", "gzip")
                .set_body_bytes(payload),
        )
        .mount(&server)
        .await;
    let client = MnuboClient::with_token("static-token", server.uri()).expect("valid client");

    let error = client
        .call_raw(Method::DELETE, "/api/v3/owners/alice", CallBody::empty())
        .await
        .expect_err("should fail");

    assert_eq!(error.status_code(), Some(500));
    assert!(error.to_string().ends_with("internal failure"));
}

#[tokio::test]
async fn should_classify_status_boundaries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status/299"))
        .respond_with(ResponseTemplate::new(299).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/status/300"))
        .respond_with(ResponseTemplate::new(300).set_body_string("multiple choices"))
        .mount(&server)
        .await;
    let client = MnuboClient::with_token("static-token", server.uri()).expect("valid client");

    let value: Value = client.get("/status/299").await.expect("should succeed");
    assert_eq!(value, json!({"ok": true}));

    let error = client
        .get::<Value>("/status/300")
        .await
        .expect_err("should fail");
    assert_eq!(error.status_code(), Some(300));
}

#[tokio::test]
async fn should_never_acquire_token_with_static_token() {
    let server = MockServer::start().await;
    mount_token(&server, "tok1", 3_600_000, 0).await;
    Mock::given(method("GET"))
        .and(path("/api/v3/owners/alice"))
        .and(header("authorization", "Bearer static-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "alice"})))
        .expect(2)
        .mount(&server)
        .await;
    let client = MnuboClient::with_token("static-token", server.uri()).expect("valid client");

    for _ in 0..2 {
        let _: Value = client
            .get("/api/v3/owners/alice")
            .await
            .expect("should succeed");
    }

    assert!(client.is_using_static_token());
    assert!(!client.has_expired().await);
    assert!(client.access_token().await.is_none());
    assert!(matches!(
        client.get_access_token().await,
        Err(ApiClientError::StaticTokenAcquisition)
    ));
}

#[tokio::test]
async fn should_not_call_api_when_token_acquisition_fails() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"error":"unauthorized"}"#))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/owners/alice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;
    let client = dynamic_client(&server, CompressionConfig::default());

    let error = client
        .get::<Value>("/api/v3/owners/alice")
        .await
        .expect_err("should fail");

    let ApiClientError::AuthError { source } = &error else {
        panic!("expected an auth error, got {error:?}");
    };
    assert!(matches!(
        source.as_ref(),
        ApiClientError::StatusError { status_code: 401, body } if body == r#"{"error":"unauthorized"}"#
    ));
    assert!(client.has_expired().await);
}

#[tokio::test]
async fn should_keep_previous_token_when_refresh_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(token_response("tok1", 3_600_000))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;
    let client = dynamic_client(&server, CompressionConfig::default());

    client.get_access_token().await.expect("should acquire");
    let error = client.get_access_token().await.expect_err("should fail");

    assert!(matches!(error, ApiClientError::AuthError { .. }));
    assert_eq!(error.status_code(), Some(503));
    let stored = client.access_token().await.expect("token kept");
    assert_eq!(stored.value(), "tok1");
    assert!(!client.has_expired().await);
}

#[tokio::test]
async fn should_reject_malformed_token_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token_type": "bearer"})))
        .mount(&server)
        .await;
    let client = dynamic_client(&server, CompressionConfig::default());

    let error = client.get_access_token().await.expect_err("should fail");

    let ApiClientError::AuthError { source } = &error else {
        panic!("expected an auth error, got {error:?}");
    };
    assert!(matches!(source.as_ref(), ApiClientError::DecodeError { .. }));
    assert!(client.access_token().await.is_none());
}

#[tokio::test]
async fn should_refresh_expired_token() {
    let server = MockServer::start().await;
    // A zero lifetime forces a refresh on every call
    mount_token(&server, "tok1", 0, 2).await;
    Mock::given(method("GET"))
        .and(path("/api/v3/owners/alice"))
        .and(header("authorization", "Bearer tok1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(2)
        .mount(&server)
        .await;
    let client = dynamic_client(&server, CompressionConfig::default());

    for _ in 0..2 {
        let _: Value = client
            .get("/api/v3/owners/alice")
            .await
            .expect("should succeed");
    }
}

#[tokio::test]
async fn should_refresh_token_once_for_concurrent_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(token_response("tok1", 3_600_000).set_delay(Duration::from_millis(50)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/owners/alice"))
        .and(header("authorization", "Bearer tok1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(3)
        .mount(&server)
        .await;
    let client = dynamic_client(&server, CompressionConfig::default());
    let clone = client.clone();

    let (first, second, third) = tokio::join!(
        client.get::<Value>("/api/v3/owners/alice"),
        client.get::<Value>("/api/v3/owners/alice"),
        clone.get::<Value>("/api/v3/owners/alice"),
    );

    first.expect("should succeed");
    second.expect("should succeed");
    third.expect("should succeed");
}

#[tokio::test]
async fn should_report_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/events/e1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;
    let client = MnuboClient::with_token("static-token", server.uri()).expect("valid client");

    let error = client
        .get::<EventResult>("/api/v3/events/e1")
        .await
        .expect_err("should fail");

    let ApiClientError::DecodeError { body, .. } = error else {
        panic!("expected a decode error, got {error:?}");
    };
    assert_eq!(body, "<html>oops</html>");
}

#[tokio::test]
async fn should_return_raw_body_of_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v3/owners/alice"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    let client = MnuboClient::with_token("static-token", server.uri()).expect("valid client");

    let body = client
        .call_raw(Method::DELETE, "/api/v3/owners/alice", CallBody::empty())
        .await
        .expect("should succeed");

    assert!(body.is_empty());
}

#[tokio::test]
async fn should_report_transport_error() {
    // Nothing listens on the discard port
    let client = MnuboClient::with_token("static-token", "http://127.0.0.1:9").expect("valid client");

    let error = client
        .get::<Value>("/api/v3/owners/alice")
        .await
        .expect_err("should fail");

    assert!(matches!(error, ApiClientError::TransportError(_)));
}

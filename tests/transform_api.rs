//! End-to-end tests for the remote-function endpoints against a mock Vault.
//!
//! The mock Transform engine applies a deterministic digit-shift so encode is
//! format-preserving and decode is its exact inverse, which is enough to
//! exercise the bridge's contracts without a real Vault.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{header as header_matcher, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use veilgate::api::build_router;
use veilgate::dispatch::BatchDispatcher;
use veilgate::transform::{
    SecretString, VaultCredentials, VaultTransformClient, VaultTransformConfig,
};

const TEST_TOKEN: &str = "hvs.test-token";
const ENCODE_PATH: &str = "/v1/transform/encode/creditcard-transform";
const DECODE_PATH: &str = "/v1/transform/decode/creditcard-transform";

/// Digit-wise modular shift; `None` when the value has non-digit characters,
/// mirroring a Vault template mismatch.
fn fpe_shift(value: &str, offset: u32) -> Option<String> {
    value
        .chars()
        .map(|c| c.to_digit(10).map(|d| char::from_digit((d + offset) % 10, 10).unwrap()))
        .collect()
}

fn transform_response(req: &wiremock::Request, offset: u32, result_field: &str) -> ResponseTemplate {
    let body: Value = serde_json::from_slice(&req.body).expect("transform request body");
    let value = body["value"].as_str().unwrap_or_default();

    match fpe_shift(value, offset) {
        Some(result) => {
            ResponseTemplate::new(200).set_body_json(json!({"data": {result_field: result}}))
        }
        None => ResponseTemplate::new(400)
            .set_body_json(json!({"errors": ["unable to apply transformation: value does not match template"]})),
    }
}

/// Mount encode/decode mocks that only answer to the expected token.
async fn mount_transform_engine(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path(ENCODE_PATH))
        .and(header_matcher("X-Vault-Token", token))
        .respond_with(|req: &wiremock::Request| transform_response(req, 3, "encoded_value"))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(DECODE_PATH))
        .and(header_matcher("X-Vault-Token", token))
        .respond_with(|req: &wiremock::Request| transform_response(req, 7, "decoded_value"))
        .mount(server)
        .await;
}

fn test_config(address: &str, credentials: VaultCredentials) -> VaultTransformConfig {
    VaultTransformConfig {
        address: address.to_string(),
        namespace: None,
        mount_path: "transform".to_string(),
        role: "creditcard-transform".to_string(),
        transformation: "creditcard".to_string(),
        credentials,
        timeout_seconds: 5,
        max_retries: 0,
    }
}

fn build_app(config: VaultTransformConfig) -> Router {
    let client = VaultTransformClient::new(config).expect("transform client");
    build_router(Arc::new(BatchDispatcher::new(Arc::new(client), 4)))
}

async fn token_app(server: &MockServer) -> Router {
    mount_transform_engine(server, TEST_TOKEN).await;
    build_app(test_config(&server.uri(), VaultCredentials::Token(SecretString::new(TEST_TOKEN))))
}

async fn post_json(app: Router, path: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request");

    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, body)
}

fn replies(body: &Value) -> Vec<String> {
    body["replies"]
        .as_array()
        .expect("replies array")
        .iter()
        .map(|v| v.as_str().expect("string reply").to_string())
        .collect()
}

#[tokio::test]
async fn encode_single_value_is_format_preserving() {
    let server = MockServer::start().await;
    let app = token_app(&server).await;

    let (status, body) = post_json(
        app,
        "/transform",
        json!({
            "requestId": "req-1",
            "userDefinedContext": {"mode": "encrypt"},
            "calls": [["4111111111111111"]]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let replies = replies(&body);
    assert_eq!(replies.len(), 1);
    assert_ne!(replies[0], "4111111111111111");
    assert_eq!(replies[0].len(), 16);
    assert!(replies[0].chars().all(|c| c.is_ascii_digit()));
}

#[tokio::test]
async fn decode_inverts_encode_across_batches() {
    let server = MockServer::start().await;

    let (status, body) = post_json(
        token_app(&server).await,
        "/transform",
        json!({
            "userDefinedContext": {"mode": "encrypt"},
            "calls": [["4111111111111111"], ["5555555555554444"]]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let encoded = replies(&body);

    let (status, body) = post_json(
        token_app(&server).await,
        "/transform",
        json!({
            "userDefinedContext": {"mode": "decrypt"},
            "calls": [[encoded[0]], [encoded[1]]]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replies(&body), vec!["4111111111111111", "5555555555554444"]);
}

#[tokio::test]
async fn missing_calls_field_fails_request_without_backend_calls() {
    let server = MockServer::start().await;
    let app = token_app(&server).await;

    let (status, body) = post_json(app, "/transform", json!({"requestId": "req-3"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "malformed_request");
    assert!(server.received_requests().await.expect("requests").is_empty());
}

#[tokio::test]
async fn malformed_item_isolated_from_sibling() {
    let server = MockServer::start().await;
    let app = token_app(&server).await;

    let (status, body) = post_json(
        app,
        "/encrypt",
        json!({"calls": [["4111111111111111"], ["1234", "extra"]]}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let replies = replies(&body);
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0], "7444444444444444");
    assert!(replies[1].starts_with("ERROR[malformed_item]"));
}

#[tokio::test]
async fn unreachable_backend_fills_every_reply_slot() {
    // Bind and immediately drop a listener so the port is refused.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let address = format!("http://{}", listener.local_addr().expect("addr"));
    drop(listener);

    let app =
        build_app(test_config(&address, VaultCredentials::Token(SecretString::new(TEST_TOKEN))));

    let (status, body) =
        post_json(app, "/encrypt", json!({"calls": [["1111"], ["2222"], ["3333"]]})).await;

    assert_eq!(status, StatusCode::OK);
    let replies = replies(&body);
    assert_eq!(replies.len(), 3);
    for marker in &replies {
        assert!(marker.starts_with("ERROR[backend_unavailable]"), "got: {}", marker);
    }
}

#[tokio::test]
async fn unknown_mode_is_rejected() {
    let server = MockServer::start().await;
    let app = token_app(&server).await;

    let (status, body) = post_json(
        app,
        "/transform",
        json!({"userDefinedContext": {"mode": "obfuscate"}, "calls": [["1111"]]}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "malformed_request");
    assert!(body["message"].as_str().expect("message").contains("obfuscate"));
}

#[tokio::test]
async fn pinned_endpoint_ignores_context_mode() {
    let server = MockServer::start().await;
    let app = token_app(&server).await;

    // /encrypt encodes even when the context asks for decrypt.
    let (status, body) = post_json(
        app,
        "/encrypt",
        json!({"userDefinedContext": {"mode": "decrypt"}, "calls": [["1111"]]}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(replies(&body), vec!["4444"]);
}

#[tokio::test]
async fn template_mismatch_reported_as_rejected() {
    let server = MockServer::start().await;
    let app = token_app(&server).await;

    let (status, body) =
        post_json(app, "/encrypt", json!({"calls": [["not-a-card-number"]]})).await;

    assert_eq!(status, StatusCode::OK);
    let replies = replies(&body);
    assert!(replies[0].starts_with("ERROR[backend_rejected]"));
    assert!(replies[0].contains("does not match template"));
}

#[tokio::test]
async fn empty_batch_yields_empty_reply() {
    let server = MockServer::start().await;
    let app = token_app(&server).await;

    let (status, body) = post_json(app, "/transform", json!({"calls": []})).await;

    assert_eq!(status, StatusCode::OK);
    assert!(replies(&body).is_empty());
}

#[tokio::test]
async fn static_token_rejection_surfaces_unauthenticated() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENCODE_PATH))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"errors": ["permission denied"]})),
        )
        .mount(&server)
        .await;

    let app = build_app(test_config(
        &server.uri(),
        VaultCredentials::Token(SecretString::new("hvs.expired")),
    ));

    let (status, body) = post_json(app, "/encrypt", json!({"calls": [["1111"]]})).await;

    assert_eq!(status, StatusCode::OK);
    let replies = replies(&body);
    assert!(replies[0].starts_with("ERROR[backend_unauthenticated]"));
}

#[tokio::test]
async fn approle_refresh_retries_rejected_call_once() {
    let server = MockServer::start().await;

    // First login mints a token the transform engine no longer honors; the
    // second login mints a fresh one. The bridge must refresh and retry the
    // failed call exactly once.
    Mock::given(method("POST"))
        .and(path("/v1/auth/approle/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"auth": {"client_token": "hvs.stale"}})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/auth/approle/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"auth": {"client_token": "hvs.fresh"}})),
        )
        .mount(&server)
        .await;

    mount_transform_engine(&server, "hvs.fresh").await;

    Mock::given(method("POST"))
        .and(path(ENCODE_PATH))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"errors": ["permission denied"]})),
        )
        .mount(&server)
        .await;

    let app = build_app(test_config(
        &server.uri(),
        VaultCredentials::AppRole {
            role_id: "bridge-role".to_string(),
            secret_id: SecretString::new("secret-id"),
        },
    ));

    let (status, body) = post_json(app, "/encrypt", json!({"calls": [["1111"]]})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(replies(&body), vec!["4444"]);
}

#[tokio::test]
async fn namespace_header_forwarded() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENCODE_PATH))
        .and(header_matcher("X-Vault-Token", TEST_TOKEN))
        .and(header_matcher("X-Vault-Namespace", "team-payments"))
        .respond_with(|req: &wiremock::Request| transform_response(req, 3, "encoded_value"))
        .mount(&server)
        .await;

    let mut config =
        test_config(&server.uri(), VaultCredentials::Token(SecretString::new(TEST_TOKEN)));
    config.namespace = Some("team-payments".to_string());
    let app = build_app(config);

    let (status, body) = post_json(app, "/encrypt", json!({"calls": [["1111"]]})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(replies(&body), vec!["4444"]);
}

#[tokio::test]
async fn health_endpoint_reports_healthy() {
    let server = MockServer::start().await;
    let app = token_app(&server).await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let body: Value = serde_json::from_slice(&bytes).expect("json body");
    assert_eq!(body["status"], "healthy");
}

//! End-to-end integration tests — real HTTP requests through the running
//! server, checking the store each request was handled with.

use std::time::Duration;

use futures_util::future::join_all;
use rand::Rng;
use reqctx_core::ContextStorage;
use reqctx_http::{ContextServer, ServerConfig};
use reqctx_middleware::MiddlewareConfig;
use serde_json::{Value, json};
use tokio::time::timeout;

/// Start a server on a random port and leak it for the test's duration.
async fn start_test_server(middleware: MiddlewareConfig) -> u16 {
    let config = ServerConfig {
        port: 0, // OS-assigned
        hostname: "127.0.0.1".into(),
        enable_cors: false,
        middleware,
    };

    let server = ContextServer::start(config, ContextStorage::create())
        .await
        .unwrap();
    let port = server.port();

    // Leak the server to keep it running for the test
    Box::leak(Box::new(server));

    port
}

async fn get_context(port: u16, headers: &[(&str, &str)]) -> Value {
    let client = reqwest::Client::new();
    let mut request = client.get(format!("http://127.0.0.1:{port}/context"));
    for (name, value) in headers {
        request = request.header(*name, *value);
    }

    let response = timeout(Duration::from_secs(5), request.send())
        .await
        .expect("Timeout waiting for response")
        .expect("Request failed");
    assert!(response.status().is_success());
    response.json().await.unwrap()
}

#[tokio::test]
async fn request_header_is_bound() {
    let port = start_test_server(
        MiddlewareConfig::default()
            .with_headers(true)
            .with_header_names([("requestId", "X-Request-Id")]),
    )
    .await;

    let body = get_context(port, &[("X-Request-Id", "abc-123")]).await;
    assert_eq!(body["store"], json!({"requestId": "abc-123"}));
    assert_eq!(body["spawned"], json!({"requestId": "abc-123"}));
}

#[tokio::test]
async fn missing_header_is_synthesized_per_request() {
    let port = start_test_server(
        MiddlewareConfig::default()
            .with_headers(true)
            .with_header_names([("requestId", "X-Request-Id")]),
    )
    .await;

    let first = get_context(port, &[]).await;
    let second = get_context(port, &[]).await;

    let first_id = first["store"]["requestId"].as_str().unwrap();
    let second_id = second["store"]["requestId"].as_str().unwrap();
    assert!(!first_id.is_empty());
    assert_ne!(first_id, second_id);
}

#[tokio::test]
async fn default_header_names_cover_request_and_session() {
    let port = start_test_server(MiddlewareConfig::default().with_headers(true)).await;

    let body = get_context(port, &[("x-session-id", "sess-1")]).await;
    assert_eq!(body["store"]["sessionId"], "sess-1");
    assert!(body["store"]["requestId"].as_str().is_some_and(|id| !id.is_empty()));
}

#[tokio::test]
async fn store_is_empty_without_headers() {
    let port = start_test_server(MiddlewareConfig::default()).await;

    let body = get_context(port, &[("X-Request-Id", "abc-123")]).await;
    assert_eq!(body["store"], json!({}));
    assert_eq!(body["spawned"], json!({}));
}

#[tokio::test]
async fn concurrent_requests_see_their_own_store() {
    let port = start_test_server(
        MiddlewareConfig::default()
            .with_headers(true)
            .with_header_names([("requestId", "X-Request-Id")]),
    )
    .await;

    let markers: Vec<String> = (0..50)
        .map(|_| format!("marker-{}", rand::rng().random::<u64>()))
        .collect();

    let header_sets: Vec<[(&str, &str); 1]> = markers
        .iter()
        .map(|marker| [("X-Request-Id", marker.as_str())])
        .collect();
    let responses = join_all(header_sets.iter().map(|headers| get_context(port, headers))).await;

    for (marker, body) in markers.iter().zip(responses) {
        assert_eq!(body["store"]["requestId"], marker.as_str());
        assert_eq!(body["spawned"]["requestId"], marker.as_str());
    }
}

#[tokio::test]
async fn health_check() {
    let port = start_test_server(MiddlewareConfig::default()).await;
    let body: Value = reqwest::get(format!("http://127.0.0.1:{port}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
}

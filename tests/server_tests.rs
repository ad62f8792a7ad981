//! End-to-end tests for the chat HTTP API.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use common::*;
use ollama_chat_relay::backend::ChatBackend;
use ollama_chat_relay::config::{MockConfig, ResponseMode, ServerConfig};
use ollama_chat_relay::mock::MockResponder;
use ollama_chat_relay::relay::UpstreamClient;
use ollama_chat_relay::server::chat_api::{build_router, AppState};

fn app_with(backend: Arc<dyn ChatBackend>, server: &ServerConfig) -> Router {
    let state = Arc::new(AppState::new(backend).unwrap());
    build_router(state, server)
}

async fn relay_app(url: String) -> Router {
    let client = UpstreamClient::new(&upstream_config(url, ResponseMode::Streaming)).unwrap();
    app_with(Arc::new(client), &ServerConfig::default())
}

fn chat_request(body: &str) -> Request<Body> {
    Request::post("/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_chat_returns_assembled_response() {
    let url = spawn_upstream(ndjson_upstream(vec![
        "{\"message\":{\"content\":\"He\"}}\n",
        "{\"message\":{\"content\":\"llo\"}}\n",
    ]))
    .await;

    let (status, body) = send(relay_app(url).await, chat_request(r#"{"prompt":"hi"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({"response": "Hello"}));
}

#[tokio::test]
async fn test_missing_prompt_is_bad_request() {
    let url = refused_url().await;

    for payload in [r#"{}"#, r#"{"message":"hi"}"#, r#"{"prompt":"   "}"#, "not json"] {
        let (status, body) = send(relay_app(url.clone()).await, chat_request(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {payload}");
        assert_eq!(body, serde_json::json!({"error": "No prompt provided"}));
    }
}

#[tokio::test]
async fn test_connection_refused_maps_to_503() {
    let url = refused_url().await;

    let (status, body) = send(relay_app(url).await, chat_request(r#"{"prompt":"hi"}"#)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body["error"],
        "Model server is unavailable, please try again later"
    );
}

#[tokio::test]
async fn test_upstream_rejection_maps_to_500() {
    let url = spawn_upstream(status_upstream(StatusCode::INTERNAL_SERVER_ERROR, "boom")).await;

    let (status, body) = send(relay_app(url).await, chat_request(r#"{"prompt":"hi"}"#)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to get response from Ollama");
}

#[tokio::test]
async fn test_timeout_maps_to_504() {
    let url = spawn_upstream(slow_upstream(Duration::from_secs(5))).await;
    let mut cfg = upstream_config(url, ResponseMode::Streaming);
    cfg.timeout_secs = 1;
    let app = app_with(
        Arc::new(UpstreamClient::new(&cfg).unwrap()),
        &ServerConfig::default(),
    );

    let (status, _) = send(app, chat_request(r#"{"prompt":"hi"}"#)).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn test_mock_backend() {
    let mock = MockResponder::new(&MockConfig {
        enabled: true,
        delay_ms: 0,
        responses: vec!["canned answer".to_string()],
    });
    let app = app_with(Arc::new(mock), &ServerConfig::default());

    let (status, body) = send(app, chat_request(r#"{"prompt":"hello there"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "Hello! canned answer");
}

#[tokio::test]
async fn test_health_reports_backend() {
    let mock = MockResponder::new(&MockConfig::default());
    let app = app_with(Arc::new(mock), &ServerConfig::default());

    let req = Request::get("/health").body(Body::empty()).unwrap();
    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["mock"], true);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let url = refused_url().await;
    let app = relay_app(url).await;

    app.clone()
        .oneshot(chat_request(r#"{"prompt":"hi"}"#))
        .await
        .unwrap();
    let resp = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains(r#"relay_requests_total{outcome="unavailable"} 1"#));
}

#[tokio::test]
async fn test_cors_preflight() {
    let url = refused_url().await;

    let preflight = |origin: &str| {
        Request::builder()
            .method("OPTIONS")
            .uri("/chat")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap()
    };

    let resp = relay_app(url.clone())
        .await
        .oneshot(preflight("http://localhost:5500"))
        .await
        .unwrap();
    assert_eq!(
        resp.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:5500"
    );

    let resp = relay_app(url)
        .await
        .oneshot(preflight("http://evil.example"))
        .await
        .unwrap();
    assert!(resp
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn test_static_frontend() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>chat</h1>").unwrap();

    let server = ServerConfig {
        static_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    };
    let app = app_with(Arc::new(MockResponder::new(&MockConfig::default())), &server);

    let resp = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"<h1>chat</h1>");
}

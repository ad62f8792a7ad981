//! Throwaway upstream servers for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use futures::StreamExt;
use serde_json::Value;
use tokio::net::TcpListener;

use ollama_chat_relay::config::{ResponseMode, UpstreamConfig};

/// Serve `router` on an ephemeral port and return the chat endpoint URL.
pub async fn spawn_upstream(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/api/chat")
}

/// Upstream that writes `parts` as separate body frames.
pub fn ndjson_upstream(parts: Vec<&'static str>) -> Router {
    Router::new().route(
        "/api/chat",
        post(move || {
            let parts = parts.clone();
            async move {
                let frames = parts
                    .into_iter()
                    .map(|p| Ok::<_, std::io::Error>(Bytes::from_static(p.as_bytes())));
                Body::from_stream(futures::stream::iter(frames))
            }
        }),
    )
}

/// Upstream that always answers with `status` and `body`.
pub fn status_upstream(status: StatusCode, body: &'static str) -> Router {
    Router::new().route("/api/chat", post(move || async move { (status, body) }))
}

/// Upstream that sleeps before answering.
pub fn slow_upstream(delay: Duration) -> Router {
    Router::new().route(
        "/api/chat",
        post(move || async move {
            tokio::time::sleep(delay).await;
            r#"{"message":{"content":"too late"}}"#
        }),
    )
}

/// Upstream that sends `first` with a 200, then stalls for `stall`.
pub fn stalling_upstream(first: &'static str, stall: Duration) -> Router {
    Router::new().route(
        "/api/chat",
        post(move || async move {
            let head = futures::stream::once(async move {
                Ok::<_, std::io::Error>(Bytes::from_static(first.as_bytes()))
            });
            let tail = futures::stream::once(async move {
                tokio::time::sleep(stall).await;
                Ok::<_, std::io::Error>(Bytes::from_static(b"{\"message\":{\"content\":\"late\"}}\n"))
            });
            Body::from_stream(head.chain(tail))
        }),
    )
}

/// Upstream that sends `first` with `status`, then aborts the connection.
pub fn dropping_upstream(status: StatusCode, first: &'static str) -> Router {
    Router::new().route(
        "/api/chat",
        post(move || async move {
            let head = futures::stream::once(async move {
                Ok::<_, std::io::Error>(Bytes::from_static(first.as_bytes()))
            });
            // Let the head frame reach the client before failing.
            let tail = futures::stream::once(async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "upstream crashed"))
            });
            (status, Body::from_stream(head.chain(tail)))
        }),
    )
}

/// Upstream that records the request body it receives.
pub fn recording_upstream(seen: Arc<Mutex<Option<Value>>>) -> Router {
    Router::new().route(
        "/api/chat",
        post(move |Json(body): Json<Value>| {
            let seen = seen.clone();
            async move {
                *seen.lock().unwrap() = Some(body);
                r#"{"message":{"role":"assistant","content":"ok"},"done":true}"#
            }
        }),
    )
}

/// A URL nothing listens on.
pub async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/api/chat")
}

pub fn upstream_config(url: String, mode: ResponseMode) -> UpstreamConfig {
    UpstreamConfig {
        url,
        mode,
        timeout_secs: 5,
        ..Default::default()
    }
}

//! Chat HTTP API consumed by the browser frontend.
//!
//! - POST /chat
//! - GET /health
//! - GET /metrics

use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::backend::ChatBackend;
use crate::config::ServerConfig;
use crate::metrics::RelayMetrics;
use crate::relay::error::RelayError;

pub const NO_PROMPT: &str = "No prompt provided";

/// Application state shared across handlers.
pub struct AppState {
    pub backend: Arc<dyn ChatBackend>,
    pub metrics: RelayMetrics,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Result<Self, prometheus::Error> {
        Ok(Self {
            backend,
            metrics: RelayMetrics::new()?,
            start_time: Instant::now(),
        })
    }
}

/// Build the axum router with all API routes.
pub fn build_router(state: Arc<AppState>, server: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route("/chat", post(handle_chat))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state);

    if let Some(dir) = &server.static_dir {
        info!(dir = %dir.display(), "Serving static frontend");
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(cors_layer(&server.cors_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

// ─── Request/Response Types ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub backend: String,
    pub mock: bool,
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            RelayError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            RelayError::UpstreamRejected(..)
            | RelayError::MalformedResponse(_)
            | RelayError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the chat user. Upstream internals stay in the logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            RelayError::Unavailable(_) => "Model server is unavailable, please try again later",
            RelayError::Timeout => "Model server took too long to respond",
            RelayError::UpstreamRejected(..) => "Failed to get response from Ollama",
            RelayError::MalformedResponse(_) => "Model server returned an invalid response",
            RelayError::Transport(_) => "Error communicating with the model server",
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(ErrorBody::new(self.user_message()))).into_response()
    }
}

// ─── Route Handlers ────────────────────────────────────────────────────────

async fn handle_chat(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let request_id = Uuid::new_v4().to_string();

    let prompt = match body {
        Ok(Json(req)) => req.prompt.filter(|p| !p.trim().is_empty()),
        Err(rejection) => {
            warn!(request_id = request_id, error = %rejection.body_text(), "Unreadable chat request");
            None
        }
    };

    let Some(prompt) = prompt else {
        error!(request_id = request_id, "No prompt provided in request");
        state.metrics.record_bad_request();
        return (StatusCode::BAD_REQUEST, Json(ErrorBody::new(NO_PROMPT))).into_response();
    };

    info!(request_id = request_id, prompt = %prompt, "Received prompt");

    let started = Instant::now();
    let result = state.backend.reply(&prompt).await;
    state
        .metrics
        .record_reply(&result, started.elapsed().as_secs_f64());

    match result {
        Ok(assembled) => {
            info!(
                request_id = request_id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                response = %assembled.text,
                "Full assembled response"
            );
            Json(ChatResponse {
                response: assembled.text,
            })
            .into_response()
        }
        Err(e) => {
            error!(request_id = request_id, kind = e.kind(), error = %e, "Chat relay failed");
            e.into_response()
        }
    }
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        backend: state.backend.describe(),
        mock: state.backend.is_mock(),
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

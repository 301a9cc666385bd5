pub mod signature;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::timeout::{RequestBodyTimeoutLayer, TimeoutLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use pushsync_core::PushEvent;
use pushsync_sync::{PushOrchestrator, SyncError};

pub use signature::{SignatureError, SignaturePolicy, SIGNATURE_HEADER};

const EVENT_HEADER: &str = "x-github-event";

/// Upper bound for reading a request and producing its response.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ── Config ──

pub struct ServeConfig {
    pub bind: String,
    pub port: u16,
}

// ── App State ──

struct AppState {
    orchestrator: PushOrchestrator,
    signatures: SignaturePolicy,
}

// ── Error Handling ──

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid push payload: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Signature(#[from] SignatureError),
    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Signature(SignatureError::Missing) => StatusCode::UNAUTHORIZED,
            ApiError::Signature(SignatureError::Invalid) => StatusCode::FORBIDDEN,
            ApiError::Sync(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(status = status.as_u16(), error = %self, "push rejected");
        let body = serde_json::json!({ "result": "failed", "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

// ── Entrypoint ──

pub async fn serve(
    orchestrator: PushOrchestrator,
    signatures: SignaturePolicy,
    config: ServeConfig,
) -> anyhow::Result<()> {
    let app = router(orchestrator, signatures);

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "pushsync listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the router (for testing without binding to a port).
pub fn router(orchestrator: PushOrchestrator, signatures: SignaturePolicy) -> Router {
    router_with_timeout(orchestrator, signatures, REQUEST_TIMEOUT)
}

/// Like [`router`], with a custom request timeout. A slow request body or a
/// stalled handler gets `408 Request Timeout`.
pub fn router_with_timeout(
    orchestrator: PushOrchestrator,
    signatures: SignaturePolicy,
    timeout: Duration,
) -> Router {
    let state = Arc::new(AppState {
        orchestrator,
        signatures,
    });
    Router::new()
        .route("/api/health", get(health))
        .route("/api/receive", post(receive))
        .layer(RequestBodyTimeoutLayer::new(timeout))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Health ──

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

// ── POST /api/receive ──

async fn receive(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    state.signatures.check(signature, &body)?;

    match headers.get(EVENT_HEADER).and_then(|v| v.to_str().ok()) {
        Some("ping") => return Ok(Json(serde_json::json!({ "result": "pong" }))),
        Some(event) if event != "push" => {
            debug!(event, "ignoring non-push event");
            return Ok(Json(serde_json::json!({ "result": "ignored" })));
        }
        _ => {}
    }

    let event: PushEvent =
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    // The handle is dropped: the push keeps running in the background.
    state.orchestrator.receive_push(event).await?;

    Ok(Json(serde_json::json!({ "result": "created" })))
}

// ── Tests ──

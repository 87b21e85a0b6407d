//! Alert ingress HTTP server (§6.5): `POST /alert`, `GET /health`,
//! `GET /metrics`. Bearer-token auth mirrors the teacher's JWT middleware
//! shape, simplified to a single static shared secret.

use super::{Alert, AlertInbox};
use crate::metrics::Metrics;
use crate::types::AlertPriority;
use axum::{
    extract::{Json, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::warn;

#[derive(Clone)]
pub struct AlertServerState {
    pub inbox: Arc<AlertInbox>,
    pub metrics: Arc<Metrics>,
    pub token: String,
    /// Read by the handler to answer `userInVoice` in the response body.
    pub presence: Arc<std::sync::atomic::AtomicBool>,
}

#[derive(Deserialize)]
struct AlertRequest {
    message: String,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default, rename = "fullDetails")]
    full_details: Option<String>,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Serialize)]
struct AlertResponse {
    ok: bool,
    queued: bool,
    #[serde(rename = "userInVoice")]
    user_in_voice: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
    ok: bool,
    error: String,
}

pub fn router(state: AlertServerState) -> Router {
    Router::new()
        .route("/alert", post(post_alert))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(bind_address: &str, port: u16, state: AlertServerState) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{bind_address}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn bearer_ok(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| token == expected)
        .unwrap_or(false)
}

async fn post_alert(
    State(state): State<AlertServerState>,
    headers: HeaderMap,
    Json(req): Json<AlertRequest>,
) -> impl IntoResponse {
    if !bearer_ok(&headers, &state.token) {
        return (StatusCode::UNAUTHORIZED, Json(ErrorResponse { ok: false, error: "unauthorized".into() }))
            .into_response();
    }

    if req.message.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, Json(ErrorResponse { ok: false, error: "message is required".into() }))
            .into_response();
    }

    let priority = match req.priority.as_deref() {
        Some("urgent") => AlertPriority::Urgent,
        Some("normal") | None => AlertPriority::Normal,
        Some(other) => {
            warn!(priority = other, "unrecognized alert priority, defaulting to normal");
            AlertPriority::Normal
        }
    };

    state.inbox.push(Alert {
        priority,
        message: req.message,
        full_details: req.full_details,
        source: req.source,
        received_at: Instant::now(),
    });
    Metrics::incr(&state.metrics.alerts_received);

    let user_in_voice = state.presence.load(Ordering::SeqCst);
    (StatusCode::OK, Json(AlertResponse { ok: true, queued: true, user_in_voice })).into_response()
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

async fn metrics(State(state): State<AlertServerState>) -> impl IntoResponse {
    Json(state.metrics.snapshot())
}

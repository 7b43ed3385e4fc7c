use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use serde_json::{Value, json};
use tracing::{info, instrument};

use crate::interactions::InteractionHandler;

#[derive(Clone)]
struct AppState {
    handler: Arc<InteractionHandler>,
    start_time: SystemTime,
}

/// Router serving Discord interactions on `POST /interactions` (and the
/// `POST /api/webhook` alias) plus `GET /health`.
pub fn router(handler: Arc<InteractionHandler>) -> Router {
    let state = AppState {
        handler,
        start_time: SystemTime::now(),
    };

    Router::new()
        .route(
            "/interactions",
            post(handle_interaction).fallback(method_not_allowed),
        )
        .route(
            "/api/webhook",
            post(handle_interaction).fallback(method_not_allowed),
        )
        .route("/health", get(health))
        .with_state(state)
}

/// Listen on `0.0.0.0:{port}` until `shutdown` resolves.
pub async fn serve(
    handler: Arc<InteractionHandler>,
    port: u16,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(addr = %addr, "Interactions webhook listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(handler))
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

#[instrument(
    name = "discord.interaction",
    skip_all,
    fields(status = tracing::field::Empty, body_len = body.len())
)]
async fn handle_interaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let signature = headers
        .get("x-signature-ed25519")
        .and_then(|v| v.to_str().ok());
    let timestamp = headers
        .get("x-signature-timestamp")
        .and_then(|v| v.to_str().ok());

    let response = state.handler.handle(signature, timestamp, &body).await;
    tracing::Span::current().record("status", response.status);

    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response.body))
}

async fn method_not_allowed() -> (StatusCode, Json<Value>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed" })),
    )
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let uptime = state.start_time.elapsed().unwrap_or_default().as_secs();
    Json(json!({ "status": "ok", "uptime_secs": uptime }))
}

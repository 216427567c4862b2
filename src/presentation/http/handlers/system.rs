//! System Handlers
//!
//! Health probes and the token-guarded shutdown endpoint used by test
//! drivers and orchestration.

use std::time::Instant;

use axum::{extract::State, Json};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::presentation::http::extractors::{ok_empty, ApiSuccess, ValidJson};
use crate::shared::ChatError;
use crate::startup::AppState;

/// Server start time for uptime calculation.
static SERVER_START: Lazy<Instant> = Lazy::new(Instant::now);

/// Initialize the server start time (call during startup).
pub fn init_server_start() {
    Lazy::force(&SERVER_START);
}

/// Basic health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Simple liveness response.
#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
    pub uptime_seconds: u64,
}

/// Basic health check endpoint.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Liveness probe.
pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive",
        uptime_seconds: SERVER_START.elapsed().as_secs(),
    })
}

#[derive(Debug, Deserialize, Validate)]
pub struct ShutdownRequest {
    pub token: String,
}

/// Drain the server gracefully when the caller presents the configured
/// shutdown token. Disabled when no token is configured.
pub async fn shutdown(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<ShutdownRequest>,
) -> Result<Json<ApiSuccess<Option<()>>>, ChatError> {
    let expected = state
        .settings
        .shutdown_token
        .as_deref()
        .ok_or(ChatError::InvalidParameters)?;

    if body.token != expected {
        return Err(ChatError::InvalidParameters);
    }

    tracing::info!("shutdown token accepted");
    state.shutdown.notify_one();
    Ok(ok_empty())
}

//! Health Routes
//!
//! - GET /healthz - Liveness probe (process is alive, no dependency checks)

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;

/// GET /healthz
pub async fn healthz(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    tracing::trace!(uptime_seconds = state.uptime_seconds(), "Health check");
    Json(HealthResponse { ok: true })
}

//! Health check endpoints.

use crate::state::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

/// GET /health - Health check endpoint
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let status = state.engine.progress().status;

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "backup_status": status,
    }))
}

/// GET /version - Version information endpoint
pub async fn version() -> impl IntoResponse {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "features": ["incremental", "mirror"],
    }))
}

//! Start, cancel and progress endpoints.

use crate::error::AppError;
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use backup_engine::{BackupRequest, ProgressSnapshot};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Absent and `null` fields are both treated as missing input.
#[derive(Debug, Deserialize)]
pub struct StartBackupRequest {
    #[serde(default)]
    pub source_dirs: Option<Vec<String>>,
    #[serde(default)]
    pub destination: Option<String>,
    /// Falls back to `backup.default_mirror` when absent
    #[serde(default)]
    pub mirror: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

/// POST /start-backup - Start a backup run in the background
pub async fn start_backup(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<StartBackupRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, AppError> {
    let Json(req) = payload?;
    let mirror = req.mirror.unwrap_or(state.config.backup.default_mirror);
    let request = BackupRequest::new(
        req.source_dirs.unwrap_or_default(),
        req.destination.unwrap_or_default(),
        mirror,
    );

    // The run keeps going after the handle is dropped; progress is polled.
    let _run = state.engine.start(request)?;

    Ok(Json(StatusResponse {
        status: "started".to_string(),
    }))
}

/// POST /cancel-backup - Ask the running backup to stop
pub async fn cancel_backup(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, AppError> {
    if state.engine.cancel() {
        Ok(Json(StatusResponse {
            status: "cancelled".to_string(),
        }))
    } else {
        tracing::warn!("Cancel requested but no backup is running");
        Err(AppError::NotFound("No backup running".into()))
    }
}

/// GET /progress - Current progress snapshot
pub async fn get_progress(State(state): State<Arc<AppState>>) -> Json<ProgressSnapshot> {
    Json(state.engine.progress())
}

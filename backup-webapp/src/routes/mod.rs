pub mod backup;
pub mod health;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub fn create_router(state: Arc<AppState>) -> Router {
    let static_dir = state.config.server.static_dir.clone();

    let router = Router::new()
        .route("/start-backup", post(backup::start_backup))
        .route("/cancel-backup", post(backup::cancel_backup))
        .route("/progress", get(backup::get_progress))
        .route("/ws", get(crate::ws::progress::ws_handler))
        .route("/health", get(health::health))
        .route("/version", get(health::version));

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

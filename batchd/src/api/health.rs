//! Health check endpoint

use axum::{Json, Router, extract::State, routing::get};
use serde_json::{Value, json};

use super::AppState;

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let queue = state.scheduler.queue_state();
    Json(json!({
        "status": "ok",
        "queued": queue.queued,
        "draining": queue.draining,
    }))
}

/// Build health routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

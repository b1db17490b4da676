//! Ingestion API handlers
//!
//! POST /ingest, GET /status/:ingestion_id

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::{IngestionId, IngestionStatus, Priority};

use super::AppState;
use super::error::{ApiError, ApiResult};

/// POST /ingest request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRequest {
    pub ids: Vec<u64>,
    pub priority: Priority,
}

/// POST /ingest response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub ingestion_id: IngestionId,
}

/// Parse and validate a raw submission body
///
/// Every malformed shape maps to the same invalid-input error, so nothing
/// partial ever reaches the scheduler.
pub fn parse_ingest_request(body: &str, max_item_id: u64) -> ApiResult<IngestRequest> {
    let request: IngestRequest =
        serde_json::from_str(body).map_err(|e| ApiError::InvalidInput(format!("Malformed request body: {}", e)))?;

    if let Some(bad) = request.ids.iter().find(|&&id| id < 1 || id > max_item_id) {
        return Err(ApiError::InvalidInput(format!(
            "Id {} out of range [1, {}]",
            bad, max_item_id
        )));
    }

    Ok(request)
}

/// POST /ingest
///
/// Records the ingestion, enqueues its batches and returns immediately.
pub async fn submit_ingestion(State(state): State<AppState>, body: String) -> ApiResult<Json<IngestResponse>> {
    debug!(len = body.len(), "submit_ingestion: called");
    let request = parse_ingest_request(&body, state.max_item_id)?;

    let ingestion_id = state.scheduler.submit(&request.ids, request.priority);
    info!(%ingestion_id, priority = %request.priority, ids = request.ids.len(), "Accepted ingestion");

    Ok(Json(IngestResponse { ingestion_id }))
}

/// GET /status/:ingestion_id
pub async fn get_status(
    State(state): State<AppState>,
    Path(ingestion_id): Path<String>,
) -> ApiResult<Json<IngestionStatus>> {
    debug!(%ingestion_id, "get_status: called");
    let id = IngestionId::from(ingestion_id);
    state
        .scheduler
        .ingestion_status(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Ingestion not found: {}", id)))
}

/// Build ingestion routes
pub fn ingest_routes() -> Router<AppState> {
    Router::new()
        .route("/ingest", post(submit_ingestion))
        .route("/status/:ingestion_id", get(get_status))
}

//! Telemetry batch ingestion endpoint
//!
//! `POST /app/analytics/batch` - accepts one batch of client telemetry and
//! runs it through the staged ingestion pipeline.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use serde::Serialize;

use crate::auth;
use crate::error::{ApiError, ApiResult};
use crate::models::{BatchRequest, ProcessedCounts};
use crate::services;
use crate::AppState;

/// Batch ingestion response
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub success: bool,
    pub batch_id: String,
    pub processed: ProcessedCounts,
    pub recommendations_updated: bool,
    pub user_segments: Vec<String>,
}

/// POST /app/analytics/batch
pub async fn ingest_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> ApiResult<Json<BatchResponse>> {
    let Json(batch) = payload
        .map_err(|e| ApiError::Validation(format!("Invalid JSON in request body: {}", e)))?;

    let session_id = batch
        .session_id
        .clone()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("session_id is required".to_string()))?;

    // A present-but-invalid token is an error; it must not silently degrade
    // to an anonymous batch
    let user = auth::resolve_bearer(&state.db, &headers).await?;

    let outcome = services::batch::process_batch(&state, &session_id, batch, user.as_ref()).await?;

    Ok(Json(BatchResponse {
        success: true,
        batch_id: outcome.batch_id,
        processed: outcome.processed,
        recommendations_updated: outcome.recommendations_updated,
        user_segments: outcome.user_segments,
    }))
}

/// Build ingestion routes
pub fn ingest_routes() -> Router<AppState> {
    Router::new().route("/app/analytics/batch", post(ingest_batch))
}

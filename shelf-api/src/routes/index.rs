//! Catalog index endpoints

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use shelf_core::{CatalogRecord, IndexSummary, RecognitionError};
use shelf_embedding::CatalogStats;
use tracing::info;

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
struct RebuildRequest {
    records: Vec<CatalogRecord>,
}

/// Create index routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/index/rebuild", post(rebuild_index))
        .route("/index/stats", get(index_stats))
}

async fn rebuild_index(
    State(state): State<AppState>,
    Json(request): Json<RebuildRequest>,
) -> Result<Json<IndexSummary>, ApiError> {
    info!("Rebuilding index from {} records", request.records.len());
    let summary = state.indexer.rebuild_index(request.records).await?;
    Ok(Json(summary))
}

async fn index_stats(State(state): State<AppState>) -> Result<Json<CatalogStats>, ApiError> {
    let stats = state
        .store
        .get_stats()
        .map_err(|e| RecognitionError::service_unavailable(e.to_string()))?;
    Ok(Json(stats))
}

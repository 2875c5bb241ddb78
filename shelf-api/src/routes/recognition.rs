//! Transcript recognition endpoints

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use shelf_core::{ProcessingResult, RecognitionError};
use tracing::info;

use crate::error::{ApiError, ErrorBody};
use crate::AppState;

/// Upper bound on transcripts per batch request
const MAX_BATCH_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct TranscriptRequest {
    text: String,
}

#[derive(Debug, Deserialize)]
struct BatchRequest {
    texts: Vec<String>,
}

/// One entry of a batch response
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum BatchItem {
    Ok { ok: ProcessingResult },
    Err(ErrorBody),
}

/// Create recognition routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transcripts", post(process_transcript))
        .route("/transcripts/batch", post(process_batch))
}

async fn process_transcript(
    State(state): State<AppState>,
    Json(request): Json<TranscriptRequest>,
) -> Result<Json<ProcessingResult>, ApiError> {
    let result = state.recognition.process_transcript(&request.text).await?;
    Ok(Json(result))
}

async fn process_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<Vec<BatchItem>>, ApiError> {
    if request.texts.is_empty() {
        return Err(RecognitionError::invalid_input("texts must not be empty").into());
    }
    if request.texts.len() > MAX_BATCH_SIZE {
        return Err(RecognitionError::invalid_input(format!(
            "at most {} transcripts per batch, got {}",
            MAX_BATCH_SIZE,
            request.texts.len()
        ))
        .into());
    }

    info!("Processing batch of {} transcripts", request.texts.len());
    let items = state
        .recognition
        .process_batch(&request.texts)
        .await
        .into_iter()
        .map(|result| match result {
            Ok(ok) => BatchItem::Ok { ok },
            Err(err) => BatchItem::Err(ErrorBody::from(&err)),
        })
        .collect();

    Ok(Json(items))
}

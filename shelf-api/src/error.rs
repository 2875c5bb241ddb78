//! Recognition errors as HTTP responses
//!
//! The body is `{"error": message, "kind": kind}` so a failed transcript is
//! never mistaken for an empty result.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use shelf_core::{ErrorKind, RecognitionError};
use tracing::error;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: ErrorKind,
}

impl From<&RecognitionError> for ErrorBody {
    fn from(err: &RecognitionError) -> Self {
        Self {
            error: err.to_string(),
            kind: err.kind(),
        }
    }
}

/// Handler error wrapping [`RecognitionError`]
#[derive(Debug)]
pub struct ApiError(pub RecognitionError);

impl From<RecognitionError> for ApiError {
    fn from(err: RecognitionError) -> Self {
        Self(err)
    }
}

pub fn status_for(err: &RecognitionError) -> StatusCode {
    match err {
        RecognitionError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        RecognitionError::ExtractionMalformed(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RecognitionError::RetrievalUnavailable { .. }
        | RecognitionError::ExtractionUnavailable { .. }
        | RecognitionError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!(kind = ?self.0.kind(), "Request failed: {}", self.0);
        }
        (status, Json(ErrorBody::from(&self.0))).into_response()
    }
}

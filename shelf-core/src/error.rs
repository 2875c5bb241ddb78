//! Error types for shelf recognition

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Failure reported by an external collaborator (embedding provider,
/// catalog store, extraction model)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rejected: {0}")]
    Rejected(String),
}

impl ProviderError {
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        ProviderError::RateLimited(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        ProviderError::Unavailable(msg.into())
    }

    pub fn auth_failed(msg: impl Into<String>) -> Self {
        ProviderError::AuthFailed(msg.into())
    }

    pub fn model_not_found(msg: impl Into<String>) -> Self {
        ProviderError::ModelNotFound(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        ProviderError::InvalidResponse(msg.into())
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        ProviderError::Rejected(msg.into())
    }

    /// Transient conditions worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited(_) | ProviderError::Timeout(_) | ProviderError::Unavailable(_)
        )
    }
}

/// Recognition-wide error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecognitionError {
    #[error("Configuration error: {0}")]
    ConfigInvalid(String),

    #[error("Candidate retrieval unavailable after {attempts} attempts: {reason}")]
    RetrievalUnavailable { attempts: u32, reason: String },

    #[error("Extraction model unavailable after {attempts} attempts: {reason}")]
    ExtractionUnavailable { attempts: u32, reason: String },

    #[error("Malformed extraction response: {0}")]
    ExtractionMalformed(String),

    #[error("Invalid catalog record at position {position}: {reason}")]
    CatalogInvalid { position: usize, reason: String },

    #[error("Catalog store unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Provider error: {0}")]
    Provider(ProviderError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl RecognitionError {
    pub fn config(msg: impl Into<String>) -> Self {
        RecognitionError::ConfigInvalid(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        RecognitionError::ExtractionMalformed(msg.into())
    }

    pub fn catalog(position: usize, reason: impl Into<String>) -> Self {
        RecognitionError::CatalogInvalid {
            position,
            reason: reason.into(),
        }
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        RecognitionError::ServiceUnavailable(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        RecognitionError::InvalidInput(msg.into())
    }

    /// Stable machine-readable name for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            RecognitionError::ConfigInvalid(_) => ErrorKind::ConfigInvalid,
            RecognitionError::RetrievalUnavailable { .. } => ErrorKind::RetrievalUnavailable,
            RecognitionError::ExtractionUnavailable { .. } => ErrorKind::ExtractionUnavailable,
            RecognitionError::ExtractionMalformed(_) => ErrorKind::ExtractionMalformed,
            RecognitionError::CatalogInvalid { .. } => ErrorKind::CatalogInvalid,
            RecognitionError::ServiceUnavailable(_) => ErrorKind::ServiceUnavailable,
            RecognitionError::Provider(_) => ErrorKind::Provider,
            RecognitionError::InvalidInput(_) => ErrorKind::InvalidInput,
        }
    }
}

/// Error discriminant exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ConfigInvalid,
    RetrievalUnavailable,
    ExtractionUnavailable,
    ExtractionMalformed,
    CatalogInvalid,
    ServiceUnavailable,
    Provider,
    InvalidInput,
}

/// Result type alias for recognition operations
pub type RecognitionResult<T> = Result<T, RecognitionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ProviderError::rate_limited("429").is_retryable());
        assert!(ProviderError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(ProviderError::unavailable("503").is_retryable());

        assert!(!ProviderError::auth_failed("bad key").is_retryable());
        assert!(!ProviderError::model_not_found("gpt-x").is_retryable());
        assert!(!ProviderError::invalid_response("garbage").is_retryable());
        assert!(!ProviderError::rejected("dimension").is_retryable());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let err = RecognitionError::RetrievalUnavailable {
            attempts: 3,
            reason: "rate limited".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::RetrievalUnavailable);
        assert_eq!(
            serde_json::to_string(&err.kind()).unwrap(),
            "\"retrieval_unavailable\""
        );
    }
}

//! Error types for embedding and catalog storage operations

use shelf_core::ProviderError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EmbeddingError>;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<rusqlite::Error> for EmbeddingError {
    fn from(err: rusqlite::Error) -> Self {
        EmbeddingError::Database(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for EmbeddingError {
    fn from(err: bincode::error::EncodeError) -> Self {
        EmbeddingError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for EmbeddingError {
    fn from(err: bincode::error::DecodeError) -> Self {
        EmbeddingError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for EmbeddingError {
    fn from(err: serde_json::Error) -> Self {
        EmbeddingError::Serialization(err.to_string())
    }
}

impl From<EmbeddingError> for ProviderError {
    fn from(err: EmbeddingError) -> Self {
        match err {
            // Locked / busy databases clear up on their own
            EmbeddingError::Database(msg) => ProviderError::Unavailable(msg),
            EmbeddingError::Serialization(msg) => ProviderError::InvalidResponse(msg),
            EmbeddingError::InvalidDimension { .. } => ProviderError::Rejected(err.to_string()),
            EmbeddingError::Config(msg) => ProviderError::Rejected(msg),
        }
    }
}

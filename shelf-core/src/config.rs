//! Pipeline configuration
//!
//! A plain value threaded through constructors. Validate once at startup;
//! it is never mutated afterwards.

use serde::{Deserialize, Serialize};

use crate::error::{RecognitionError, RecognitionResult};
use crate::retry::RetryPolicy;

/// Dimension of text-embedding-3-small vectors
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;

/// Configuration for recognition and indexing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionConfig {
    /// Candidates retrieved per transcript
    pub top_k: usize,
    /// Minimum model confidence for a match to be reported (0.0 - 1.0)
    pub confidence_threshold: f64,
    /// Dimension every catalog and query embedding must have
    pub embedding_dimension: usize,
    /// Texts per embedding request during indexing
    pub embedding_batch_size: usize,
    /// Text for the post-rebuild sanity query; defaults to the first indexed
    /// product's name
    pub verification_query: Option<String>,
    /// Minimum similarity the sanity query's top hit must reach
    pub verification_floor: f64,
    /// Transcripts processed at once by batch recognition
    pub batch_concurrency: usize,
    pub retry: RetryPolicy,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            confidence_threshold: 0.7,
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            embedding_batch_size: 16,
            verification_query: None,
            verification_floor: 0.5,
            batch_concurrency: 4,
            retry: RetryPolicy::default(),
        }
    }
}

impl RecognitionConfig {
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_embedding_dimension(mut self, dimension: usize) -> Self {
        self.embedding_dimension = dimension;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn validate(&self) -> RecognitionResult<()> {
        if self.top_k == 0 {
            return Err(RecognitionError::config("top_k must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(RecognitionError::config(format!(
                "confidence_threshold must be within 0.0 - 1.0, got {}",
                self.confidence_threshold
            )));
        }
        if self.embedding_dimension == 0 {
            return Err(RecognitionError::config("embedding_dimension must be positive"));
        }
        if self.embedding_batch_size == 0 {
            return Err(RecognitionError::config("embedding_batch_size must be positive"));
        }
        if self.batch_concurrency == 0 {
            return Err(RecognitionError::config("batch_concurrency must be positive"));
        }
        if !(-1.0..=1.0).contains(&self.verification_floor) {
            return Err(RecognitionError::config(format!(
                "verification_floor must be within -1.0 - 1.0, got {}",
                self.verification_floor
            )));
        }
        if let Some(query) = &self.verification_query {
            if query.trim().is_empty() {
                return Err(RecognitionError::config("verification_query must not be blank"));
            }
        }
        self.retry.validate()
    }
}

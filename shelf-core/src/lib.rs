//! Core types for shelf product recognition
//!
//! This crate defines the shared data structures used across the pipeline:
//! catalog products, candidate and extracted matches, processing results,
//! the error taxonomy, the interfaces to external providers, and the retry
//! policy applied to every provider call.

pub mod config;
pub mod error;
pub mod index;
pub mod product;
pub mod provider;
pub mod retry;

pub use config::{RecognitionConfig, DEFAULT_EMBEDDING_DIMENSION};
pub use error::{ErrorKind, ProviderError, RecognitionError, RecognitionResult};
pub use index::{IndexSummary, SkippedRecord, VerificationOutcome};
pub use product::{
    CandidateMatch, CatalogRecord, EmbeddingVector, ExtractedMatch, IndexedProduct,
    ProcessingResult, Product, UpsertOutcome,
};
pub use provider::{CatalogStore, EmbeddingProvider, ExtractionModel, ExtractionPrompt};
pub use retry::{with_retry, RetryError, RetryPolicy};

//! Recognition and indexing pipelines
//!
//! Composes the embedding provider, catalog store and extraction model into
//! the two caller-facing operations: recognising products in a transcript
//! and (re)building the catalog index.

pub mod extractor;
pub mod indexer;
pub mod pipeline;
pub mod retriever;

pub use extractor::{Extraction, MatchExtractor};
pub use indexer::IndexingPipeline;
pub use pipeline::RecognitionPipeline;
pub use retriever::CandidateRetriever;

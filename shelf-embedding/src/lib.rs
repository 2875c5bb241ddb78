//! Embeddings and the product catalog store
//!
//! This crate provides the embedding side of shelf recognition: vector
//! embeddings from OpenAI's text-embedding-3-small model, cosine similarity
//! ranking, and a SQLite catalog of product embeddings.
//!
//! ## Features
//! - Generate embeddings for product names and transcripts (single or batched)
//! - Classify OpenAI failures into retryable and fatal provider errors
//! - Calculate cosine similarity with stable top-K ranking
//! - Upsert products by id and run nearest-neighbour queries

pub mod client;
pub mod error;
pub mod similarity;
pub mod store;
pub mod types;

pub use client::{DEFAULT_EMBEDDING_MODEL, EmbeddingClient, classify_openai_error};
pub use error::{EmbeddingError, Result};
pub use similarity::{RankEntry, cosine_similarity, rank_top_k};
pub use store::SqliteCatalogStore;
pub use types::CatalogStats;

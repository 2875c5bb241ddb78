//! Narrow interfaces to the external collaborators of the pipeline
//!
//! Implementations live in `shelf-embedding` and `shelf-extraction`; tests
//! substitute deterministic stubs.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::product::{CandidateMatch, EmbeddingVector, IndexedProduct, UpsertOutcome};

/// Turns text into fixed-dimension vectors
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, ProviderError>;

    /// Embed several texts in one call, preserving input order.
    ///
    /// The default issues one `embed` per text.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, ProviderError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Dimension of every vector this provider returns
    fn dimension(&self) -> usize;

    /// Model identifier, folded into product fingerprints
    fn model(&self) -> &str;
}

/// Holds product embeddings and answers nearest-neighbour queries
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert or overwrite a product by id
    async fn upsert(&self, product: &IndexedProduct) -> Result<UpsertOutcome, ProviderError>;

    /// Up to `k` products by descending similarity, ties in insertion order.
    ///
    /// An empty catalog yields `Ok(vec![])`, never an error.
    async fn search(
        &self,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<CandidateMatch>, ProviderError>;

    /// Stored fingerprint for a product, if present
    async fn fingerprint(&self, product_id: &str) -> Result<Option<String>, ProviderError>;

    /// Number of searchable products
    async fn len(&self) -> Result<usize, ProviderError>;
}

/// Prompt for the extraction model
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionPrompt {
    pub system: String,
    pub user: String,
}

/// Generative model that returns free-form text
#[async_trait]
pub trait ExtractionModel: Send + Sync {
    async fn complete(&self, prompt: &ExtractionPrompt) -> Result<String, ProviderError>;
}

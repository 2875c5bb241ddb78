//! Candidate retrieval: embed the transcript, then nearest catalog products

use std::sync::Arc;

use shelf_core::{
    with_retry, CandidateMatch, CatalogStore, EmbeddingProvider, RecognitionError,
    RecognitionResult, RetryError, RetryPolicy,
};
use tracing::{debug, instrument};

/// Produces the top-K catalog candidates for a transcript
pub struct CandidateRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn CatalogStore>,
    retry: RetryPolicy,
}

impl CandidateRetriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn CatalogStore>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            embedder,
            store,
            retry,
        }
    }

    /// Up to `k` candidates by descending similarity.
    ///
    /// An empty catalog yields an empty list. Transient failures that outlast
    /// the retry policy become `RetrievalUnavailable`.
    #[instrument(skip(self, transcript), fields(chars = transcript.len()))]
    pub async fn retrieve(
        &self,
        transcript: &str,
        k: usize,
    ) -> RecognitionResult<Vec<CandidateMatch>> {
        if transcript.trim().is_empty() {
            return Err(RecognitionError::invalid_input("transcript is empty"));
        }
        if k == 0 {
            return Err(RecognitionError::invalid_input("k must be at least 1"));
        }

        let embedding = with_retry(&self.retry, "embed_transcript", || {
            self.embedder.embed(transcript)
        })
        .await
        .map_err(retrieval_error)?;

        let mut candidates = with_retry(&self.retry, "catalog_search", || {
            self.store.search(&embedding, k)
        })
        .await
        .map_err(retrieval_error)?;
        candidates.truncate(k);

        debug!("Retrieved {} candidates", candidates.len());
        Ok(candidates)
    }
}

fn retrieval_error(err: RetryError) -> RecognitionError {
    match err {
        RetryError::Exhausted { attempts, last } => RecognitionError::RetrievalUnavailable {
            attempts,
            reason: last.to_string(),
        },
        RetryError::Fatal(err) => RecognitionError::Provider(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelf_core::ProviderError;

    #[test]
    fn test_retrieval_error_mapping() {
        let exhausted = retrieval_error(RetryError::Exhausted {
            attempts: 3,
            last: ProviderError::rate_limited("slow down"),
        });
        assert!(matches!(
            exhausted,
            RecognitionError::RetrievalUnavailable { attempts: 3, .. }
        ));

        let fatal = retrieval_error(RetryError::Fatal(ProviderError::auth_failed("bad key")));
        assert!(matches!(
            fatal,
            RecognitionError::Provider(ProviderError::AuthFailed(_))
        ));
    }
}

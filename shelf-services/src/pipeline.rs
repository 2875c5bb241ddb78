//! Transcript recognition: retrieve, extract, filter by confidence

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use shelf_core::{
    CatalogStore, EmbeddingProvider, ExtractionModel, ProcessingResult, RecognitionConfig,
    RecognitionResult,
};
use tracing::{debug, info, instrument};

use crate::extractor::MatchExtractor;
use crate::retriever::CandidateRetriever;

/// Recognition entry point shared by all request handlers
///
/// Holds no per-call state; concurrent `process` calls are independent.
/// Dropping a `process` future cancels its in-flight provider calls.
pub struct RecognitionPipeline {
    retriever: CandidateRetriever,
    extractor: MatchExtractor,
    config: Arc<RecognitionConfig>,
}

impl RecognitionPipeline {
    /// Create a pipeline. Fails with `ConfigInvalid` before any processing.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn CatalogStore>,
        model: Arc<dyn ExtractionModel>,
        config: Arc<RecognitionConfig>,
    ) -> RecognitionResult<Self> {
        config.validate()?;
        Ok(Self {
            retriever: CandidateRetriever::new(embedder, store, config.retry.clone()),
            extractor: MatchExtractor::new(model, config.retry.clone()),
            config,
        })
    }

    pub fn config(&self) -> &RecognitionConfig {
        &self.config
    }

    /// Recognise products in one transcript.
    ///
    /// With no candidates the extraction model is never called and the
    /// result is empty with both flags false.
    #[instrument(skip(self, transcript), fields(chars = transcript.len()))]
    pub async fn process(&self, transcript: &str) -> RecognitionResult<ProcessingResult> {
        let candidates = self.retriever.retrieve(transcript, self.config.top_k).await?;
        if candidates.is_empty() {
            debug!("No candidates, skipping extraction");
            return Ok(ProcessingResult::empty(transcript));
        }

        let extraction = self.extractor.extract(transcript, &candidates).await?;

        let threshold = self.config.confidence_threshold;
        let mut matched_products: Vec<_> = extraction
            .matches
            .into_iter()
            .filter(|m| m.confidence >= threshold)
            .collect();
        matched_products.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        info!(
            candidates = candidates.len(),
            matched = matched_products.len(),
            competitor = extraction.competitor_advantage_mentioned,
            placement = extraction.bad_placement_mentioned,
            "Transcript processed"
        );

        Ok(ProcessingResult {
            original_text: transcript.to_string(),
            matched_products,
            competitor_advantage_mentioned: extraction.competitor_advantage_mentioned,
            bad_placement_mentioned: extraction.bad_placement_mentioned,
        })
    }

    /// Caller-facing name for [`process`](Self::process)
    pub async fn process_transcript(&self, text: &str) -> RecognitionResult<ProcessingResult> {
        self.process(text).await
    }

    /// Process many transcripts, at most `batch_concurrency` at a time.
    ///
    /// Results come back in input order, one per transcript.
    pub async fn process_batch(
        &self,
        transcripts: &[String],
    ) -> Vec<RecognitionResult<ProcessingResult>> {
        let futures: Vec<_> = transcripts.iter().map(|text| self.process(text)).collect();
        stream::iter(futures)
            .buffered(self.config.batch_concurrency)
            .collect()
            .await
    }
}

//! Match extraction over a closed candidate set

use std::sync::Arc;

use shelf_core::{
    with_retry, CandidateMatch, ExtractedMatch, ExtractionModel, ExtractionPrompt, ProviderError,
    RecognitionError, RecognitionResult, RetryError, RetryPolicy,
};
use shelf_extraction::{build_prompt, build_strict_prompt, validate_response, ValidatedExtraction};
use tracing::{debug, instrument, warn};

/// Validated model output for one transcript
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Matches restricted to the supplied candidates, in model order
    pub matches: Vec<ExtractedMatch>,
    pub competitor_advantage_mentioned: bool,
    pub bad_placement_mentioned: bool,
}

/// Asks the extraction model which candidates the transcript mentions
pub struct MatchExtractor {
    model: Arc<dyn ExtractionModel>,
    retry: RetryPolicy,
}

impl MatchExtractor {
    pub fn new(model: Arc<dyn ExtractionModel>, retry: RetryPolicy) -> Self {
        Self { model, retry }
    }

    /// Extract confirmed mentions from `transcript`.
    ///
    /// A response failing validation is retried once with a stricter prompt;
    /// a second failure is `ExtractionMalformed`.
    #[instrument(skip(self, transcript, candidates), fields(candidates = candidates.len()))]
    pub async fn extract(
        &self,
        transcript: &str,
        candidates: &[CandidateMatch],
    ) -> RecognitionResult<Extraction> {
        let failure = match self.attempt(&build_prompt(transcript, candidates), candidates).await? {
            ValidatedExtraction::Valid(payload) => return Ok(finish(transcript, payload)),
            ValidatedExtraction::Invalid(reason) => reason,
        };

        warn!("Extraction response failed validation, re-prompting: {}", failure);
        let strict = build_strict_prompt(transcript, candidates, &failure);

        match self.attempt(&strict, candidates).await? {
            ValidatedExtraction::Valid(payload) => Ok(finish(transcript, payload)),
            ValidatedExtraction::Invalid(reason) => Err(RecognitionError::malformed(reason)),
        }
    }

    async fn attempt(
        &self,
        prompt: &ExtractionPrompt,
        candidates: &[CandidateMatch],
    ) -> RecognitionResult<ValidatedExtraction> {
        let raw = match with_retry(&self.retry, "extraction_complete", || {
            self.model.complete(prompt)
        })
        .await
        {
            Ok(raw) => raw,
            // An empty or unreadable completion is a schema failure, not an outage
            Err(RetryError::Fatal(ProviderError::InvalidResponse(reason))) => {
                return Ok(ValidatedExtraction::Invalid(reason));
            }
            Err(RetryError::Exhausted { attempts, last }) => {
                return Err(RecognitionError::ExtractionUnavailable {
                    attempts,
                    reason: last.to_string(),
                });
            }
            Err(RetryError::Fatal(err)) => return Err(RecognitionError::Provider(err)),
        };

        Ok(validate_response(&raw, candidates))
    }
}

fn finish(transcript: &str, payload: shelf_extraction::ExtractionPayload) -> Extraction {
    let haystack = transcript.to_lowercase();
    for m in &payload.matches {
        if !haystack.contains(&m.context_snippet.to_lowercase()) {
            debug!("Context snippet for {} is not verbatim transcript text", m.product_id);
        }
    }

    Extraction {
        matches: payload.matches,
        competitor_advantage_mentioned: payload.competitor_advantage_mentioned,
        bad_placement_mentioned: payload.bad_placement_mentioned,
    }
}

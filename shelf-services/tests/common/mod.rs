//! Deterministic stand-ins for the external providers

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use shelf_core::{
    CandidateMatch, CatalogRecord, CatalogStore, EmbeddingProvider, EmbeddingVector,
    ExtractionModel, ExtractionPrompt, IndexSummary, IndexedProduct, ProviderError,
    RecognitionConfig, RetryPolicy, UpsertOutcome,
};
use shelf_embedding::SqliteCatalogStore;
use shelf_services::IndexingPipeline;

pub const DIM: usize = 256;

/// Bag-of-tokens embedder: each lowercase alphanumeric token bumps one bucket
#[derive(Debug, Default)]
pub struct TokenEmbedder {
    embed_calls: AtomicUsize,
    batch_calls: AtomicUsize,
}

impl TokenEmbedder {
    pub fn vector(text: &str) -> EmbeddingVector {
        let mut vector = vec![0.0f32; DIM];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let bucket = token
                .bytes()
                .fold(7u64, |h, b| h.wrapping_mul(131).wrapping_add(b as u64));
            vector[(bucket % DIM as u64) as usize] += 1.0;
        }
        vector
    }

    /// Provider calls so far, single and batch
    pub fn calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst) + self.batch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for TokenEmbedder {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, ProviderError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, ProviderError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn dimension(&self) -> usize {
        DIM
    }

    fn model(&self) -> &str {
        "token-hash"
    }
}

/// Embedder that fails every call with the same error
pub struct FailingEmbedder {
    error: ProviderError,
    calls: AtomicUsize,
}

impl FailingEmbedder {
    pub fn new(error: ProviderError) -> Self {
        Self {
            error,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<EmbeddingVector, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<EmbeddingVector>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }

    fn dimension(&self) -> usize {
        DIM
    }

    fn model(&self) -> &str {
        "failing"
    }
}

/// Embedder whose vectors have the wrong length
pub struct ShortEmbedder;

#[async_trait]
impl EmbeddingProvider for ShortEmbedder {
    async fn embed(&self, _text: &str) -> Result<EmbeddingVector, ProviderError> {
        Ok(vec![1.0; 8])
    }

    fn dimension(&self) -> usize {
        8
    }

    fn model(&self) -> &str {
        "short"
    }
}

/// Extraction model that replays canned responses and records every prompt
#[derive(Default)]
pub struct ScriptedModel {
    responses: Mutex<VecDeque<Result<String, ProviderError>>>,
    prompts: Mutex<Vec<ExtractionPrompt>>,
}

impl ScriptedModel {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_results(responses.into_iter().map(|r| Ok(r.into())))
    }

    pub fn with_results(responses: impl IntoIterator<Item = Result<String, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<ExtractionPrompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExtractionModel for ScriptedModel {
    async fn complete(&self, prompt: &ExtractionPrompt) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::invalid_response("script exhausted")))
    }
}

/// Extraction model that never answers in time
#[derive(Default)]
pub struct StalledModel {
    started: AtomicUsize,
    in_flight: AtomicUsize,
}

impl StalledModel {
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Calls begun and not yet finished or dropped
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ExtractionModel for StalledModel {
    async fn complete(&self, _prompt: &ExtractionPrompt) -> Result<String, ProviderError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(String::new())
    }
}

/// Catalog store wrapper that fails selected operations
pub struct FailingStore {
    inner: Arc<SqliteCatalogStore>,
    search_error: Option<ProviderError>,
    upsert_error: Option<(usize, ProviderError)>,
    rejected: HashSet<String>,
    search_calls: AtomicUsize,
    upsert_calls: AtomicUsize,
}

impl FailingStore {
    pub fn new(inner: Arc<SqliteCatalogStore>) -> Self {
        Self {
            inner,
            search_error: None,
            upsert_error: None,
            rejected: HashSet::new(),
            search_calls: AtomicUsize::new(0),
            upsert_calls: AtomicUsize::new(0),
        }
    }

    /// Every search fails with `error`
    pub fn failing_search(mut self, error: ProviderError) -> Self {
        self.search_error = Some(error);
        self
    }

    /// The first `succeed` upserts go through, every later one fails with `error`
    pub fn failing_upserts_after(mut self, succeed: usize, error: ProviderError) -> Self {
        self.upsert_error = Some((succeed, error));
        self
    }

    /// Upserts of `id` fail with `Rejected`
    pub fn rejecting(mut self, id: &str) -> Self {
        self.rejected.insert(id.to_string());
        self
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogStore for FailingStore {
    async fn upsert(&self, product: &IndexedProduct) -> Result<UpsertOutcome, ProviderError> {
        let call = self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if self.rejected.contains(&product.product.id) {
            return Err(ProviderError::rejected(format!(
                "store refused {}",
                product.product.id
            )));
        }
        if let Some((succeed, error)) = &self.upsert_error {
            if call >= *succeed {
                return Err(error.clone());
            }
        }
        self.inner.upsert(product).await
    }

    async fn search(
        &self,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<CandidateMatch>, ProviderError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        match &self.search_error {
            Some(error) => Err(error.clone()),
            None => self.inner.search(query, k).await,
        }
    }

    async fn fingerprint(&self, product_id: &str) -> Result<Option<String>, ProviderError> {
        self.inner.fingerprint(product_id).await
    }

    async fn len(&self) -> Result<usize, ProviderError> {
        self.inner.len().await
    }
}

pub fn config() -> Arc<RecognitionConfig> {
    Arc::new(
        RecognitionConfig::default()
            .with_embedding_dimension(DIM)
            .with_retry(RetryPolicy::immediate(3)),
    )
}

pub fn catalog() -> Vec<CatalogRecord> {
    vec![
        CatalogRecord::new("p1", "CASTROL MAGNATEC 5W-30 A5 5 lt"),
        CatalogRecord::new("p2", "SHERON Celoroční ostřikovač eMotion -5 °C 4 lt"),
        CatalogRecord::new("p3", "EUROL Sportbike 5W-40 1 lt"),
        CatalogRecord::new("p4", "CASTROL EDGE 5W-30 LL 1 lt"),
    ]
}

/// In-memory store with `records` already indexed by the token embedder
pub async fn indexed_store(records: Vec<CatalogRecord>) -> (Arc<SqliteCatalogStore>, IndexSummary) {
    let store = Arc::new(SqliteCatalogStore::new_in_memory(DIM).unwrap());
    let indexer =
        IndexingPipeline::new(Arc::new(TokenEmbedder::default()), store.clone(), config()).unwrap();
    let summary = indexer.rebuild_index(records).await.unwrap();
    (store, summary)
}

/// Response JSON in the shape the extraction schema expects
pub fn response(matches: &[(&str, f64, &str)], competitor: bool, placement: bool) -> String {
    let matches: Vec<_> = matches
        .iter()
        .map(|(id, confidence, snippet)| {
            serde_json::json!({
                "product_id": id,
                "confidence": confidence,
                "context_snippet": snippet,
            })
        })
        .collect();

    serde_json::json!({
        "matches": matches,
        "competitor_advantage_mentioned": competitor,
        "bad_placement_mentioned": placement,
    })
    .to_string()
}

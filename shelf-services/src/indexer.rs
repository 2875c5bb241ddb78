//! Catalog indexing: validate, embed in batches, upsert, verify

use std::collections::HashSet;
use std::sync::Arc;

use shelf_core::{
    with_retry, CatalogRecord, CatalogStore, EmbeddingProvider, IndexSummary, IndexedProduct,
    Product, ProviderError, RecognitionConfig, RecognitionError, RecognitionResult, RetryError,
    SkippedRecord, UpsertOutcome, VerificationOutcome,
};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

/// A valid product whose stored content is out of date
struct PendingProduct {
    position: usize,
    product: Product,
    fingerprint: String,
}

/// Builds and refreshes the catalog index
///
/// Runs are serialized; a second rebuild waits for the first to finish.
pub struct IndexingPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn CatalogStore>,
    config: Arc<RecognitionConfig>,
    run_lock: Mutex<()>,
}

impl IndexingPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn CatalogStore>,
        config: Arc<RecognitionConfig>,
    ) -> RecognitionResult<Self> {
        config.validate()?;
        Ok(Self {
            embedder,
            store,
            config,
            run_lock: Mutex::new(()),
        })
    }

    /// Index the catalog and return how many products are now indexed
    pub async fn build_index(&self, records: Vec<CatalogRecord>) -> RecognitionResult<usize> {
        Ok(self.rebuild_index(records).await?.indexed_count)
    }

    /// Index the catalog and report what happened to every record.
    ///
    /// Invalid records are skipped and reported. Products whose fingerprint
    /// matches the stored one are neither re-embedded nor rewritten. Upserts
    /// completed before an aborting error are kept.
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub async fn rebuild_index(&self, records: Vec<CatalogRecord>) -> RecognitionResult<IndexSummary> {
        let _run = self.run_lock.lock().await;

        let mut skipped_records = Vec::new();
        let products = validate_records(records, &mut skipped_records);

        let model = self.embedder.model().to_string();
        let mut pending = Vec::new();
        let mut unchanged_count = 0;
        let mut first_indexed: Option<(usize, String)> = None;

        for (position, product) in products {
            let fingerprint = product.fingerprint(&model);
            let stored = with_retry(&self.config.retry, "catalog_fingerprint", || {
                self.store.fingerprint(&product.id)
            })
            .await
            .map_err(indexing_error)?;

            if stored.as_deref() == Some(fingerprint.as_str()) {
                unchanged_count += 1;
                note_first(&mut first_indexed, position, &product);
            } else {
                pending.push(PendingProduct {
                    position,
                    product,
                    fingerprint,
                });
            }
        }

        let mut written_count = 0;
        for chunk in pending.chunks(self.config.embedding_batch_size) {
            let texts: Vec<String> = chunk.iter().map(|p| p.product.embedding_text()).collect();
            let vectors = with_retry(&self.config.retry, "embed_catalog_batch", || {
                self.embedder.embed_batch(&texts)
            })
            .await
            .map_err(indexing_error)?;

            if vectors.len() != chunk.len() {
                return Err(RecognitionError::Provider(ProviderError::invalid_response(
                    format!("{} embeddings returned for {} products", vectors.len(), chunk.len()),
                )));
            }

            for (item, embedding) in chunk.iter().zip(vectors) {
                if embedding.len() != self.config.embedding_dimension {
                    skip(
                        &mut skipped_records,
                        item.position,
                        Some(item.product.id.clone()),
                        format!(
                            "embedding has dimension {}, expected {}",
                            embedding.len(),
                            self.config.embedding_dimension
                        ),
                    );
                    continue;
                }

                let indexed = IndexedProduct {
                    product: item.product.clone(),
                    embedding,
                    fingerprint: item.fingerprint.clone(),
                };

                match with_retry(&self.config.retry, "catalog_upsert", || {
                    self.store.upsert(&indexed)
                })
                .await
                {
                    Ok(UpsertOutcome::Unchanged) => unchanged_count += 1,
                    Ok(_) => written_count += 1,
                    Err(RetryError::Fatal(ProviderError::Rejected(reason))) => {
                        skip(
                            &mut skipped_records,
                            item.position,
                            Some(item.product.id.clone()),
                            reason,
                        );
                        continue;
                    }
                    Err(err) => return Err(indexing_error(err)),
                }
                note_first(&mut first_indexed, item.position, &item.product);
            }
        }

        let verification = if written_count == 0 {
            VerificationOutcome::Skipped
        } else {
            let text = self
                .config
                .verification_query
                .clone()
                .or_else(|| first_indexed.map(|(_, text)| text));
            match text {
                Some(text) => self.verify(&text).await,
                None => VerificationOutcome::Skipped,
            }
        };

        if !matches!(verification, VerificationOutcome::Passed { .. } | VerificationOutcome::Skipped) {
            warn!(?verification, "Index verification did not pass");
        }

        let summary = IndexSummary {
            indexed_count: written_count + unchanged_count,
            unchanged_count,
            skipped_records,
            verification,
        };

        info!(
            indexed = summary.indexed_count,
            written = written_count,
            unchanged = summary.unchanged_count,
            skipped = summary.skipped_records.len(),
            "Index rebuild complete"
        );

        Ok(summary)
    }

    /// Sanity query: the top hit for `text` must reach the similarity floor
    async fn verify(&self, text: &str) -> VerificationOutcome {
        let embedding = match with_retry(&self.config.retry, "verification_embed", || {
            self.embedder.embed(text)
        })
        .await
        {
            Ok(embedding) => embedding,
            Err(err) => {
                return VerificationOutcome::Failed {
                    reason: err.into_provider_error().to_string(),
                }
            }
        };

        let results = match with_retry(&self.config.retry, "verification_search", || {
            self.store.search(&embedding, 1)
        })
        .await
        {
            Ok(results) => results,
            Err(err) => {
                return VerificationOutcome::Failed {
                    reason: err.into_provider_error().to_string(),
                }
            }
        };

        let floor = self.config.verification_floor;
        match results.into_iter().next() {
            None => VerificationOutcome::NoResults,
            Some(top) if top.similarity_score >= floor => VerificationOutcome::Passed {
                product_id: top.product_id,
                score: top.similarity_score,
            },
            Some(top) => VerificationOutcome::BelowFloor {
                product_id: top.product_id,
                score: top.similarity_score,
                floor,
            },
        }
    }
}

/// Validate records in order; later duplicates of an id are skipped
fn validate_records(
    records: Vec<CatalogRecord>,
    skipped: &mut Vec<SkippedRecord>,
) -> Vec<(usize, Product)> {
    let mut seen = HashSet::new();
    let mut products = Vec::with_capacity(records.len());

    for (position, record) in records.into_iter().enumerate() {
        let raw_id = record.id.clone();
        match Product::from_record(position, record) {
            Ok(product) if !seen.insert(product.id.clone()) => {
                let reason = RecognitionError::catalog(
                    position,
                    format!("duplicate product id {}", product.id),
                );
                skip(skipped, position, Some(product.id), reason.to_string());
            }
            Ok(product) => products.push((position, product)),
            Err(err) => skip(skipped, position, raw_id, err.to_string()),
        }
    }

    products
}

fn skip(skipped: &mut Vec<SkippedRecord>, position: usize, id: Option<String>, reason: String) {
    warn!(position, id = ?id, "Skipping catalog record: {}", reason);
    skipped.push(SkippedRecord {
        position,
        id,
        reason,
    });
}

fn note_first(first: &mut Option<(usize, String)>, position: usize, product: &Product) {
    if first.as_ref().is_none_or(|(current, _)| position < *current) {
        *first = Some((position, product.embedding_text()));
    }
}

fn indexing_error(err: RetryError) -> RecognitionError {
    match err {
        RetryError::Exhausted { attempts, last } => RecognitionError::service_unavailable(format!(
            "{} (gave up after {} attempts)",
            last, attempts
        )),
        RetryError::Fatal(err) => RecognitionError::Provider(err),
    }
}

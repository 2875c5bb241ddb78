//! Cosine similarity and top-K ranking

use ndarray::ArrayView1;
use shelf_core::CandidateMatch;
use tracing::debug;

/// Calculate cosine similarity between two embeddings
///
/// Returns a value between -1.0 (opposite) and 1.0 (identical). Vectors of
/// different length or with zero magnitude score 0.0.
///
/// Formula: cos(θ) = (A · B) / (||A|| ||B||)
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        debug!("Dimension mismatch in cosine similarity: {} vs {}", a.len(), b.len());
        return 0.0;
    }

    let a_view = ArrayView1::from(a);
    let b_view = ArrayView1::from(b);

    let dot_product = a_view.dot(&b_view) as f64;
    let norm_a = (a_view.dot(&a_view) as f64).sqrt();
    let norm_b = (b_view.dot(&b_view) as f64).sqrt();

    // Avoid division by zero
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// A stored product as seen by the ranker, in catalog insertion order
#[derive(Debug, Clone)]
pub struct RankEntry {
    pub product_id: String,
    pub product_name: String,
    pub embedding: Vec<f32>,
}

/// Rank catalog entries against a query embedding
///
/// `entries` must be in catalog insertion order. Results are sorted by
/// descending similarity; the sort is stable, so equal scores keep insertion
/// order. At most `top_k` results are returned.
pub fn rank_top_k(query: &[f32], entries: &[RankEntry], top_k: usize) -> Vec<CandidateMatch> {
    if top_k == 0 || entries.is_empty() {
        return Vec::new();
    }

    let mut matches: Vec<CandidateMatch> = entries
        .iter()
        .map(|entry| CandidateMatch {
            product_id: entry.product_id.clone(),
            product_name: entry.product_name.clone(),
            similarity_score: cosine_similarity(query, &entry.embedding),
        })
        .collect();

    matches.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
    matches.truncate(top_k);

    if let Some(top) = matches.first() {
        debug!(
            "Top candidate: product_id={}, score={:.3} ({} ranked)",
            top.product_id,
            top.similarity_score,
            entries.len()
        );
    }

    matches
}

//! Catalog and recognition data structures

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{RecognitionError, RecognitionResult};

/// Embedding vector (1536 dimensions for text-embedding-3-small)
pub type EmbeddingVector = Vec<f32>;

/// Raw catalog entry as supplied by ingestion, before validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CatalogRecord {
    /// Minimal record with just an id and a name
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

/// A validated catalog product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Stable unique identifier (e.g., "CASTROL_MAGNATEC_5W30_A5_5L")
    pub id: String,
    /// Canonical display name (e.g., "CASTROL MAGNATEC 5W-30 A5 5 lt")
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Product {
    /// Validate a raw record. `position` is the record's index in the catalog
    /// and is carried into the error.
    pub fn from_record(position: usize, record: CatalogRecord) -> RecognitionResult<Self> {
        let id = non_blank(record.id)
            .ok_or_else(|| RecognitionError::catalog(position, "missing product id"))?;
        let name = non_blank(record.name).ok_or_else(|| {
            RecognitionError::catalog(position, format!("product {} has no name", id))
        })?;

        Ok(Self {
            id,
            name,
            brand: non_blank(record.brand),
            variant: non_blank(record.variant),
            size: non_blank(record.size),
            category: non_blank(record.category),
            description: non_blank(record.description),
        })
    }

    /// Text sent to the embedding provider for this product
    pub fn embedding_text(&self) -> String {
        match &self.description {
            Some(desc) => format!("{}\n{}", self.name, desc),
            None => self.name.clone(),
        }
    }

    /// Content fingerprint: changes whenever the embedded text, any attribute,
    /// or the embedding model changes
    pub fn fingerprint(&self, embedding_model: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(embedding_model.as_bytes());
        for field in [
            Some(&self.id),
            Some(&self.name),
            self.brand.as_ref(),
            self.variant.as_ref(),
            self.size.as_ref(),
            self.category.as_ref(),
            self.description.as_ref(),
        ] {
            hasher.update([0x1f]);
            if let Some(value) = field {
                hasher.update(value.as_bytes());
            }
        }
        hex::encode(hasher.finalize())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A product together with its embedding, ready for the catalog store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedProduct {
    pub product: Product,
    pub embedding: EmbeddingVector,
    /// See [`Product::fingerprint`]
    pub fingerprint: String,
}

/// What an upsert did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

/// A product returned by similarity search, not yet confirmed as mentioned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMatch {
    pub product_id: String,
    pub product_name: String,
    /// Cosine similarity (-1.0 - 1.0, higher is more similar)
    pub similarity_score: f64,
}

/// A candidate the extraction model confirmed as mentioned in the transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedMatch {
    pub product_id: String,
    pub product_name: String,
    /// Model-assigned confidence (0.0 - 1.0)
    pub confidence: f64,
    /// Part of the transcript supporting the match
    pub context_snippet: String,
}

/// Final recognition output for one transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub original_text: String,
    /// Matches at or above the confidence threshold, highest confidence first
    pub matched_products: Vec<ExtractedMatch>,
    pub competitor_advantage_mentioned: bool,
    pub bad_placement_mentioned: bool,
}

impl ProcessingResult {
    /// Successful result with nothing recognised
    pub fn empty(original_text: impl Into<String>) -> Self {
        Self {
            original_text: original_text.into(),
            matched_products: Vec::new(),
            competitor_advantage_mentioned: false,
            bad_placement_mentioned: false,
        }
    }

    /// Human-readable report for store-visit operators
    pub fn to_summary(&self) -> String {
        let rule = "=".repeat(80);
        let mut lines = vec![
            rule.clone(),
            "VÝSLEDEK ZPRACOVÁNÍ TRANSKRIPTU".to_string(),
            rule.clone(),
            String::new(),
            format!("Originální text: {}", self.original_text),
            String::new(),
            format!("Nalezeno produktů: {}", self.matched_products.len()),
        ];

        if !self.matched_products.is_empty() {
            lines.push(String::new());
            lines.push("Identifikované produkty:".to_string());
            for (i, product) in self.matched_products.iter().enumerate() {
                lines.push(format!(
                    "  {}. {} (confidence: {:.2})",
                    i + 1,
                    product.product_name,
                    product.confidence
                ));
                lines.push(format!("     Kontext: \"{}\"", product.context_snippet));
            }
        }

        lines.push(String::new());
        lines.push("Detekované problémy:".to_string());
        lines.push(format!(
            "  • Výhoda konkurence: {}",
            yes_no(self.competitor_advantage_mentioned)
        ));
        lines.push(format!(
            "  • Špatné umístění: {}",
            yes_no(self.bad_placement_mentioned)
        ));
        lines.push(rule);

        lines.join("\n")
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "ANO ⚠️"
    } else {
        "NE"
    }
}

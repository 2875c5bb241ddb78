//! Storage-facing types

use serde::{Deserialize, Serialize};

/// Statistics about the stored catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogStats {
    /// Searchable products
    pub product_count: usize,
    /// Embedding dimension enforced by the store
    pub dimension: usize,
    pub database_size_bytes: usize,
}

//! SQLite catalog store using rusqlite
//!
//! Products are keyed by id. Upserts keep the original row (and therefore its
//! `seq`), so insertion order survives re-indexing and serves as the
//! tie-break for equal similarity scores. Search is an exact cosine scan over
//! all stored embeddings.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use shelf_core::{
    CandidateMatch, CatalogStore, IndexedProduct, Product, ProviderError, UpsertOutcome,
};
use tracing::{debug, info, instrument};

use crate::{
    error::{EmbeddingError, Result},
    similarity::{RankEntry, rank_top_k},
    types::CatalogStats,
};

/// SQLite-backed catalog of product embeddings
#[derive(Clone)]
pub struct SqliteCatalogStore {
    conn: Arc<Mutex<Connection>>,
    dimension: usize,
}

impl SqliteCatalogStore {
    /// Open (or create) a catalog database
    ///
    /// # Arguments
    /// * `database_path` - Path to SQLite database file
    /// * `dimension` - Embedding dimension every product must have
    #[instrument(skip(database_path))]
    pub fn new<P: AsRef<Path> + std::fmt::Debug>(
        database_path: P,
        dimension: usize,
    ) -> Result<Self> {
        info!("Opening catalog database: {:?}", database_path.as_ref());
        let conn = Connection::open(database_path.as_ref())
            .map_err(|e| EmbeddingError::Database(format!("Failed to open database: {}", e)))?;

        Self::with_connection(conn, dimension)
    }

    /// Create an in-memory store (for testing)
    pub fn new_in_memory(dimension: usize) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            EmbeddingError::Database(format!("Failed to create in-memory DB: {}", e))
        })?;

        Self::with_connection(conn, dimension)
    }

    fn with_connection(conn: Connection, dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(EmbeddingError::Config(
                "embedding dimension must be positive".to_string(),
            ));
        }

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            dimension,
        };

        store.init_tables()?;
        Ok(store)
    }

    /// Initialize database tables
    fn init_tables(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS products (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                product_id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                attributes TEXT NOT NULL,
                embedding BLOB NOT NULL,
                dimension INTEGER NOT NULL,
                fingerprint TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        info!("Catalog database tables initialized");
        Ok(())
    }

    /// Embedding dimension enforced by this store
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Save or update a product embedding
    pub fn upsert_product(&self, indexed: &IndexedProduct) -> Result<UpsertOutcome> {
        if indexed.embedding.len() != self.dimension {
            return Err(EmbeddingError::InvalidDimension {
                expected: self.dimension,
                actual: indexed.embedding.len(),
            });
        }

        let product = &indexed.product;
        let embedding_bytes = encode_embedding(&indexed.embedding)?;
        let attributes = serde_json::to_string(product)?;
        let now = Utc::now().timestamp();

        let conn = self.conn.lock();

        let existing: Option<(String, Vec<u8>)> = conn
            .query_row(
                "SELECT fingerprint, embedding FROM products WHERE product_id = ?",
                params![&product.id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let outcome = match existing {
            Some((fingerprint, bytes))
                if fingerprint == indexed.fingerprint && bytes == embedding_bytes =>
            {
                debug!("Product unchanged: {}", product.id);
                return Ok(UpsertOutcome::Unchanged);
            }
            Some(_) => UpsertOutcome::Updated,
            None => UpsertOutcome::Inserted,
        };

        conn.execute(
            "INSERT INTO products
             (product_id, name, attributes, embedding, dimension, fingerprint, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(product_id) DO UPDATE SET
                name = excluded.name,
                attributes = excluded.attributes,
                embedding = excluded.embedding,
                dimension = excluded.dimension,
                fingerprint = excluded.fingerprint,
                updated_at = excluded.updated_at",
            params![
                &product.id,
                &product.name,
                &attributes,
                &embedding_bytes,
                indexed.embedding.len() as i64,
                &indexed.fingerprint,
                now,
                now,
            ],
        )?;

        debug!("Saved embedding for product: {} ({:?})", product.id, outcome);
        Ok(outcome)
    }

    /// Get a stored product by id
    pub fn get_product(&self, product_id: &str) -> Result<Option<IndexedProduct>> {
        let conn = self.conn.lock();

        let row: Option<(String, Vec<u8>, String)> = conn
            .query_row(
                "SELECT attributes, embedding, fingerprint FROM products WHERE product_id = ?",
                params![product_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        row.map(|(attributes, bytes, fingerprint)| -> Result<IndexedProduct> {
            let product: Product = serde_json::from_str(&attributes)?;
            Ok(IndexedProduct {
                product,
                embedding: decode_embedding(&bytes)?,
                fingerprint,
            })
        })
        .transpose()
    }

    /// Load every product embedding in insertion order
    pub fn load_rank_entries(&self) -> Result<Vec<RankEntry>> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(
            "SELECT product_id, name, embedding
             FROM products
             ORDER BY seq ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            let product_id: String = row.get(0)?;
            let product_name: String = row.get(1)?;
            let embedding_bytes: Vec<u8> = row.get(2)?;
            Ok((product_id, product_name, embedding_bytes))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (product_id, product_name, embedding_bytes) = row?;
            entries.push(RankEntry {
                product_id,
                product_name,
                embedding: decode_embedding(&embedding_bytes)?,
            });
        }

        debug!("Loaded {} product embeddings", entries.len());
        Ok(entries)
    }

    /// Nearest products to a query embedding
    pub fn search_products(&self, query: &[f32], k: usize) -> Result<Vec<CandidateMatch>> {
        if query.len() != self.dimension {
            return Err(EmbeddingError::InvalidDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let entries = self.load_rank_entries()?;
        Ok(rank_top_k(query, &entries, k))
    }

    pub fn stored_fingerprint(&self, product_id: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let fingerprint = conn
            .query_row(
                "SELECT fingerprint FROM products WHERE product_id = ?",
                params![product_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(fingerprint)
    }

    pub fn product_count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get statistics about the stored catalog
    pub fn get_stats(&self) -> Result<CatalogStats> {
        let product_count = self.product_count()?;
        let conn = self.conn.lock();

        // Get database size (page_count * page_size)
        let page_count: i64 = conn
            .query_row("PRAGMA page_count", [], |row| row.get(0))
            .unwrap_or(0);
        let page_size: i64 = conn
            .query_row("PRAGMA page_size", [], |row| row.get(0))
            .unwrap_or(4096);

        Ok(CatalogStats {
            product_count,
            dimension: self.dimension,
            database_size_bytes: (page_count * page_size) as usize,
        })
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalogStore {
    async fn upsert(
        &self,
        product: &IndexedProduct,
    ) -> std::result::Result<UpsertOutcome, ProviderError> {
        Ok(self.upsert_product(product)?)
    }

    async fn search(
        &self,
        query: &[f32],
        k: usize,
    ) -> std::result::Result<Vec<CandidateMatch>, ProviderError> {
        Ok(self.search_products(query, k)?)
    }

    async fn fingerprint(
        &self,
        product_id: &str,
    ) -> std::result::Result<Option<String>, ProviderError> {
        Ok(self.stored_fingerprint(product_id)?)
    }

    async fn len(&self) -> std::result::Result<usize, ProviderError> {
        Ok(self.product_count()?)
    }
}

fn encode_embedding(embedding: &[f32]) -> Result<Vec<u8>> {
    Ok(bincode::serde::encode_to_vec(embedding, bincode::config::standard())?)
}

fn decode_embedding(bytes: &[u8]) -> Result<Vec<f32>> {
    let (embedding, _) =
        bincode::serde::decode_from_slice::<Vec<f32>, _>(bytes, bincode::config::standard())?;
    Ok(embedding)
}

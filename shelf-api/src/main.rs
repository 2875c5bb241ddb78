//! Shelf Product Recognition API Server
//!
//! HTTP API over the recognition and indexing pipelines.

mod error;
mod routes;
mod settings;

use std::sync::Arc;

use async_openai::config::OpenAIConfig;
use shelf_embedding::{EmbeddingClient, SqliteCatalogStore};
use shelf_extraction::OpenAIClient;
use shelf_services::{IndexingPipeline, RecognitionPipeline};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::settings::ServiceSettings;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub recognition: Arc<RecognitionPipeline>,
    pub indexer: Arc<IndexingPipeline>,
    pub store: Arc<SqliteCatalogStore>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    let settings = ServiceSettings::from_env()?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_level)),
        )
        .init();

    info!("Starting Shelf Product Recognition API");

    let mut openai_config = OpenAIConfig::new().with_api_key(settings.openai_api_key.clone());
    if let Some(base) = &settings.openai_api_base {
        info!("Using OpenAI-compatible endpoint: {}", base);
        openai_config = openai_config.with_api_base(base);
    }

    let config = Arc::new(settings.recognition.clone());

    let embedder = Arc::new(
        EmbeddingClient::from_config(openai_config.clone())
            .with_model(&settings.embedding_model, config.embedding_dimension),
    );
    let model = Arc::new(OpenAIClient::from_config(openai_config).with_model(&settings.extraction_model));

    // Make sure the catalog directory exists
    if let Some(parent) = std::path::Path::new(&settings.catalog_db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    info!("Opening catalog store at: {}", settings.catalog_db_path);
    let store = Arc::new(SqliteCatalogStore::new(
        &settings.catalog_db_path,
        config.embedding_dimension,
    )?);

    let recognition = Arc::new(RecognitionPipeline::new(
        embedder.clone(),
        store.clone(),
        model,
        config.clone(),
    )?);
    let indexer = Arc::new(IndexingPipeline::new(embedder, store.clone(), config.clone())?);

    info!(
        top_k = config.top_k,
        threshold = config.confidence_threshold,
        embedding_model = %settings.embedding_model,
        extraction_model = %settings.extraction_model,
        "Pipelines ready"
    );

    let state = AppState {
        recognition,
        indexer,
        store,
    };
    let app = routes::app(state);

    info!("Server listening on http://{}", settings.bind_addr);
    let listener = tokio::net::TcpListener::bind(settings.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

//! Startup configuration read from the environment

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use shelf_core::{RecognitionConfig, RecognitionError, RecognitionResult};
use shelf_embedding::DEFAULT_EMBEDDING_MODEL;
use shelf_extraction::DEFAULT_EXTRACTION_MODEL;

/// Everything the server needs to start, validated once
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub openai_api_key: String,
    /// OpenAI-compatible endpoint; the public API when unset
    pub openai_api_base: Option<String>,
    pub embedding_model: String,
    pub extraction_model: String,
    pub catalog_db_path: String,
    pub bind_addr: SocketAddr,
    /// Fallback tracing filter when `RUST_LOG` is unset
    pub log_level: String,
    pub recognition: RecognitionConfig,
}

impl ServiceSettings {
    pub fn from_env() -> RecognitionResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup
    pub fn from_lookup<F>(lookup: F) -> RecognitionResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let openai_api_key = get("OPENAI_API_KEY")
            .filter(|key| !is_placeholder(key))
            .ok_or_else(|| {
                RecognitionError::config("OPENAI_API_KEY is not set. Please check your .env.local file.")
            })?;

        let openai_api_base = match get("OPENAI_API_BASE") {
            Some(base) if is_placeholder(&base) => {
                return Err(RecognitionError::config("OPENAI_API_BASE is a placeholder value"))
            }
            other => other,
        };

        let mut recognition = RecognitionConfig::default();
        if let Some(top_k) = parse(&get, "VECTOR_SEARCH_TOP_K")? {
            recognition.top_k = top_k;
        }
        if let Some(threshold) = parse(&get, "CONFIDENCE_THRESHOLD")? {
            recognition.confidence_threshold = threshold;
        }
        if let Some(dimension) = parse(&get, "EMBEDDING_DIMENSIONS")? {
            recognition.embedding_dimension = dimension;
        }
        if let Some(attempts) = parse(&get, "RETRY_MAX_ATTEMPTS")? {
            recognition.retry.max_attempts = attempts;
        }
        if let Some(ms) = parse::<u64, _>(&get, "RETRY_BASE_DELAY_MS")? {
            recognition.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = parse::<u64, _>(&get, "PROVIDER_TIMEOUT_SECS")? {
            recognition.retry.call_timeout = Duration::from_secs(secs);
        }
        recognition.validate()?;

        let bind_addr = parse(&get, "BIND_ADDR")?
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        Ok(Self {
            openai_api_key,
            openai_api_base,
            embedding_model: get("EMBEDDING_MODEL").unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            extraction_model: get("EXTRACTION_MODEL")
                .unwrap_or_else(|| DEFAULT_EXTRACTION_MODEL.to_string()),
            catalog_db_path: get("CATALOG_DB_PATH").unwrap_or_else(|| "data/catalog.db".to_string()),
            bind_addr,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info,shelf_api=debug".to_string()),
            recognition,
        })
    }
}

fn is_placeholder(value: &str) -> bool {
    value.to_ascii_uppercase().starts_with("YOUR_")
}

fn parse<T, G>(get: &G, key: &str) -> RecognitionResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| RecognitionError::config(format!("{} has invalid value {:?}: {}", key, raw, e)))
        })
        .transpose()
}

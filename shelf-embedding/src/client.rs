//! OpenAI embedding client

use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::embeddings::{CreateEmbeddingRequest, EmbeddingInput},
};
use async_trait::async_trait;
use shelf_core::{DEFAULT_EMBEDDING_DIMENSION, EmbeddingProvider, EmbeddingVector, ProviderError};
use tracing::{debug, info, instrument};

/// Default embedding model (1536 dimensions)
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// OpenAI embedding client
pub struct EmbeddingClient {
    client: Client<OpenAIConfig>,
    model: String,
    dimension: usize,
}

impl EmbeddingClient {
    /// Create a new embedding client
    ///
    /// Uses text-embedding-3-small model (1536 dimensions)
    pub fn new(api_key: String) -> Self {
        Self::from_config(OpenAIConfig::new().with_api_key(api_key))
    }

    /// Create a client from a prepared config (e.g., a custom API base for an
    /// OpenAI-compatible gateway)
    pub fn from_config(config: OpenAIConfig) -> Self {
        Self {
            client: Client::with_config(config),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimension: DEFAULT_EMBEDDING_DIMENSION,
        }
    }

    pub fn with_model(mut self, model: &str, dimension: usize) -> Self {
        self.model = model.to_string();
        self.dimension = dimension;
        self
    }

    /// Output size to request; only text-embedding-3 models can shorten vectors
    fn requested_dimensions(&self) -> Option<u32> {
        self.model
            .starts_with("text-embedding-3")
            .then_some(self.dimension as u32)
    }

    /// Low-level embedding generation for one or more inputs
    async fn generate(
        &self,
        input: EmbeddingInput,
        expected: usize,
    ) -> Result<Vec<EmbeddingVector>, ProviderError> {
        let request = CreateEmbeddingRequest {
            model: self.model.clone(),
            input,
            encoding_format: None,
            dimensions: self.requested_dimensions(),
            user: None,
        };

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(classify_openai_error)?;

        let mut data = response.data;
        if data.len() != expected {
            return Err(ProviderError::invalid_response(format!(
                "{} embeddings returned for {} inputs",
                data.len(),
                expected
            )));
        }
        data.sort_by_key(|entry| entry.index);

        let vectors: Vec<EmbeddingVector> =
            data.into_iter().map(|entry| entry.embedding).collect();

        // Validate dimension
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(ProviderError::invalid_response(format!(
                "Invalid embedding dimension: expected {}, got {}",
                self.dimension,
                bad.len()
            )));
        }

        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingProvider for EmbeddingClient {
    #[instrument(skip(self, text), fields(model = %self.model))]
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, ProviderError> {
        debug!("Embedding text of {} chars", text.len());
        let mut vectors = self
            .generate(EmbeddingInput::String(text.to_string()), 1)
            .await?;
        vectors
            .pop()
            .ok_or_else(|| ProviderError::invalid_response("No embeddings returned from API"))
    }

    #[instrument(skip(self, texts), fields(model = %self.model, count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self
            .generate(EmbeddingInput::StringArray(texts.to_vec()), texts.len())
            .await?;

        info!(
            "Generated {} embeddings: dimension={}, model={}",
            vectors.len(),
            self.dimension,
            self.model
        );
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Map an OpenAI client error onto the provider taxonomy
///
/// Rate limits, server errors and transport failures are transient;
/// credential and model problems are fatal.
pub fn classify_openai_error(err: OpenAIError) -> ProviderError {
    match err {
        OpenAIError::ApiError(api) => {
            let code = api.code.as_deref().unwrap_or_default();
            let kind = api.r#type.as_deref().unwrap_or_default();
            let message = api.message.to_lowercase();

            if code == "rate_limit_exceeded"
                || kind == "rate_limit_error"
                || message.contains("rate limit")
            {
                ProviderError::RateLimited(api.message)
            } else if code == "invalid_api_key"
                || kind == "authentication_error"
                || message.contains("api key")
                || message.contains("unauthorized")
            {
                ProviderError::AuthFailed(api.message)
            } else if code == "model_not_found"
                || code == "DeploymentNotFound"
                || message.contains("does not exist")
            {
                ProviderError::ModelNotFound(api.message)
            } else if kind == "server_error"
                || code == "server_error"
                || message.contains("overloaded")
            {
                ProviderError::Unavailable(api.message)
            } else {
                ProviderError::Rejected(api.message)
            }
        }
        OpenAIError::JSONDeserialize(..) => ProviderError::InvalidResponse(err.to_string()),
        OpenAIError::InvalidArgument(msg) => ProviderError::Rejected(msg),
        // Transport-level failures (connection reset, DNS, TLS)
        other => ProviderError::Unavailable(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_openai::error::ApiError;

    fn api_error(message: &str, kind: Option<&str>, code: Option<&str>) -> OpenAIError {
        OpenAIError::ApiError(ApiError {
            message: message.to_string(),
            r#type: kind.map(str::to_string),
            param: None,
            code: code.map(str::to_string),
        })
    }

    #[test]
    fn test_classify_rate_limit() {
        let err = classify_openai_error(api_error(
            "Rate limit reached for requests",
            Some("requests"),
            Some("rate_limit_exceeded"),
        ));
        assert!(matches!(err, ProviderError::RateLimited(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_classify_auth_and_model() {
        let auth = classify_openai_error(api_error(
            "Incorrect API key provided",
            Some("invalid_request_error"),
            Some("invalid_api_key"),
        ));
        assert!(matches!(auth, ProviderError::AuthFailed(_)));
        assert!(!auth.is_retryable());

        let model = classify_openai_error(api_error(
            "The model `text-embedding-9` does not exist",
            Some("invalid_request_error"),
            Some("model_not_found"),
        ));
        assert!(matches!(model, ProviderError::ModelNotFound(_)));
        assert!(!model.is_retryable());
    }

    #[test]
    fn test_classify_server_error_is_transient() {
        let err = classify_openai_error(api_error(
            "The server had an error",
            Some("server_error"),
            None,
        ));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_requested_dimensions_follow_model() {
        let small = EmbeddingClient::new("key".to_string()).with_model("text-embedding-3-small", 512);
        assert_eq!(small.requested_dimensions(), Some(512));

        let ada = EmbeddingClient::new("key".to_string()).with_model("text-embedding-ada-002", 1536);
        assert_eq!(ada.requested_dimensions(), None);
    }

    #[tokio::test]
    #[ignore] // Requires API key
    async fn test_embed_product_name() {
        let api_key = std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY not set");
        let client = EmbeddingClient::new(api_key);

        let embedding = client
            .embed("CASTROL MAGNATEC 5W-30 A5 5 lt")
            .await
            .expect("Failed to generate embedding");

        assert_eq!(embedding.len(), 1536);
    }

    #[tokio::test]
    #[ignore] // Requires API key
    async fn test_embed_batch_preserves_order() {
        let api_key = std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY not set");
        let client = EmbeddingClient::new(api_key);

        let texts = vec![
            "CASTROL MAGNATEC 5W-30 A5 5 lt".to_string(),
            "SHERON Celoroční ostřikovač eMotion -5 °C 4 lt".to_string(),
            "EUROL Sportbike 5W-40 1 lt".to_string(),
        ];
        let embeddings = client.embed_batch(&texts).await.expect("Failed to embed batch");
        let single = client.embed(&texts[1]).await.expect("Failed to embed");

        assert_eq!(embeddings.len(), 3);
        assert!(crate::cosine_similarity(&embeddings[1], &single) > 0.99);
    }
}

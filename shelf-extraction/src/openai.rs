use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use shelf_core::{ExtractionModel, ExtractionPrompt, ProviderError};
use shelf_embedding::classify_openai_error;
use tracing::{debug, instrument};

/// Default chat model for mention extraction
pub const DEFAULT_EXTRACTION_MODEL: &str = "gpt-4o";

/// Chat-completions client used as the extraction model
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAIClient {
    pub fn new(api_key: String) -> Self {
        Self::from_config(OpenAIConfig::new().with_api_key(api_key))
    }

    pub fn from_config(config: OpenAIConfig) -> Self {
        Self {
            client: Client::with_config(config),
            model: DEFAULT_EXTRACTION_MODEL.to_string(),
            temperature: 0.3,
            max_tokens: 2000,
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ExtractionModel for OpenAIClient {
    #[instrument(skip(self, prompt), fields(model = %self.model))]
    async fn complete(&self, prompt: &ExtractionPrompt) -> Result<String, ProviderError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(prompt.system.as_str())
                    .build()
                    .map_err(classify_openai_error)?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt.user.as_str())
                    .build()
                    .map_err(classify_openai_error)?
                    .into(),
            ])
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(classify_openai_error)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(classify_openai_error)?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| ProviderError::invalid_response("No response from OpenAI"))?;

        debug!("Extraction model returned {} chars", content.len());
        Ok(content)
    }
}

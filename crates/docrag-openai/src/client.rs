//! OpenAI chat completions client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use docrag_core::{Error, GenerationConfig, GenerationResult, LLMProvider, Result};

use crate::config::OpenAiConfig;

/// Chat completions client for OpenAI-compatible endpoints
pub struct OpenAiChatClient {
    client: Client,
    endpoint: String,
    defaults: GenerationConfig,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    messages: Vec<ChatRequestMessage<'a>>,
}

#[derive(Serialize)]
struct ChatRequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: u32,
}

impl OpenAiChatClient {
    /// Create a new chat client from configuration
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        Ok(Self {
            client: config.http_client()?,
            endpoint: config.endpoint("chat/completions"),
            defaults: config.generation_config(),
        })
    }

    /// Set the model to use for generation
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.defaults.model_id = model_id.into();
        self
    }

    /// Send the prompt as a single user message
    async fn perform_generation(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<GenerationResult> {
        let request_body = ChatRequest {
            model: &config.model_id,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            messages: vec![ChatRequestMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::LLMProvider(format!(
                "OpenAI API request failed with status {}: {}",
                status, error_text
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Serialization(e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::LLMProvider("OpenAI response contained no choices".to_string()))?;

        Ok(GenerationResult {
            text: choice.message.content.unwrap_or_default(),
            model_id: config.model_id.clone(),
            tokens_used: parsed.usage.map(|usage| usage.total_tokens),
        })
    }
}

#[async_trait]
impl LLMProvider for OpenAiChatClient {
    async fn generate(&self, prompt: &str) -> Result<GenerationResult> {
        self.generate_with_config(prompt, &self.defaults).await
    }

    async fn generate_with_config(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<GenerationResult> {
        match timeout(config.timeout, self.perform_generation(prompt, config)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout("Request timed out".to_string())),
        }
    }

    fn model_id(&self) -> &str {
        &self.defaults.model_id
    }
}

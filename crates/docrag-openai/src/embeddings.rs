//! OpenAI embeddings client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use docrag_core::{Embedder, Error, Result};

use crate::config::OpenAiConfig;

/// Embeddings client for OpenAI-compatible `/embeddings` endpoints
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: usize,
    /// Only forwarded when configured explicitly
    requested_dimensions: Option<usize>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

impl OpenAiEmbedder {
    /// Create a new embeddings client from configuration
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        Ok(Self {
            client: config.http_client()?,
            endpoint: config.endpoint("embeddings"),
            model: config.embedding_model.clone(),
            dimensions: config.resolved_dimensions()?,
            requested_dimensions: config.embedding_dimensions,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.requested_dimensions,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(Error::Embedding(format!(
                "OpenAI embeddings request failed with status {}: {}",
                status, error_text
            )));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::Serialization(e.to_string()))?;
        parsed.data.sort_by_key(|entry| entry.index);

        if parsed.data.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "OpenAI returned {} embeddings for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }

        let wrong_size = parsed
            .data
            .iter()
            .find(|entry| entry.embedding.len() != self.dimensions);
        if let Some(bad) = wrong_size {
            return Err(Error::Embedding(format!(
                "expected {}-dimensional embeddings from {}, got {}",
                self.dimensions,
                self.model,
                bad.embedding.len()
            )));
        }

        debug!(model = %self.model, inputs = texts.len(), "embedded batch");
        Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
    }
}

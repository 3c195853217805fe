//! Query engine: retrieve context, assemble the prompt, generate an answer

use std::sync::Arc;

use tracing::{debug, info};

use docrag_core::{
    ChatMessage, Embedder, GenerationConfig, LLMProvider, Result, ScoredChunk, SearchConfig,
    VectorIndex,
};

use crate::prompt::{format_chat_history, format_document_context, render_prompt};

/// Retrieval-augmented generation over a single vector index.
///
/// Every stage error is returned as-is; there is no partial answer and no
/// retry.
pub struct RagEngine {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    llm: Arc<dyn LLMProvider>,
    search: SearchConfig,
    generation: GenerationConfig,
}

impl RagEngine {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn LLMProvider>,
        generation: GenerationConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            llm,
            search: SearchConfig::default(),
            generation,
        }
    }

    pub fn generation_config(&self) -> &GenerationConfig {
        &self.generation
    }

    /// Find the chunks most similar to `query`
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        let vector = self.embedder.embed_query(query).await?;
        let hits = self.index.search(vector, &self.search).await?;
        debug!(index = self.index.name(), hits = hits.len(), "retrieved context");
        Ok(hits)
    }

    /// Assemble the full prompt for `query`
    pub async fn build_prompt(&self, query: &str, history: &[ChatMessage]) -> Result<String> {
        let hits = self.retrieve(query).await?;
        Ok(render_prompt(
            query,
            &format_document_context(&hits),
            &format_chat_history(history),
        ))
    }

    /// Answer `query`, returning the model's reply verbatim
    pub async fn generate(&self, query: &str, history: &[ChatMessage]) -> Result<String> {
        let prompt = self.build_prompt(query, history).await?;
        let result = self.llm.generate_with_config(&prompt, &self.generation).await?;

        info!(
            model = %result.model_id,
            tokens_used = ?result.tokens_used,
            "generated response"
        );
        Ok(result.text)
    }
}

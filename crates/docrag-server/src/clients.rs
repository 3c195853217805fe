//! Construction of the shared service clients

use std::sync::Arc;

use tracing::info;

use docrag_core::{Embedder, LLMProvider, Result, VectorIndex};
use docrag_openai::{OpenAiChatClient, OpenAiEmbedder};
use docrag_rag::{HashEmbedder, LocalVectorIndex, QdrantVectorIndex};

use crate::config::{EmbedderBackend, IndexBackend, ServiceConfig};

/// Clients built once at startup and shared by every request
#[derive(Clone)]
pub struct Clients {
    pub embedder: Arc<dyn Embedder>,
    pub index: Arc<dyn VectorIndex>,
}

impl Clients {
    /// Build the embedder and index, creating the collection when missing
    pub async fn connect(config: &ServiceConfig) -> Result<Self> {
        let embedder = build_embedder(config)?;
        let index = build_index(config)?;
        index.ensure_ready(embedder.dimensions()).await?;

        info!(
            index = index.name(),
            embedder = embedder.model_id(),
            dimensions = embedder.dimensions(),
            "vector index ready"
        );
        Ok(Self { embedder, index })
    }
}

pub fn build_embedder(config: &ServiceConfig) -> Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match config.embedder {
        EmbedderBackend::OpenAi => Arc::new(OpenAiEmbedder::new(config.openai()?)?),
        EmbedderBackend::Hash(dimensions) => Arc::new(HashEmbedder::new(dimensions)),
    };
    Ok(embedder)
}

pub fn build_index(config: &ServiceConfig) -> Result<Arc<dyn VectorIndex>> {
    let index: Arc<dyn VectorIndex> = match &config.index {
        IndexBackend::Memory => Arc::new(LocalVectorIndex::new(config.index_name.clone())),
        IndexBackend::Qdrant(qdrant) => {
            Arc::new(QdrantVectorIndex::connect(qdrant, config.index_name.clone())?)
        }
    };
    Ok(index)
}

pub fn build_llm(config: &ServiceConfig) -> Result<Arc<dyn LLMProvider>> {
    Ok(Arc::new(OpenAiChatClient::new(config.openai()?)?))
}

//! Common types shared by the ingestion and query pipelines

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// A contiguous span of extracted text, the unit of embedding and retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub text: String,
    pub source: String,
    pub chunk_index: usize,
    pub metadata: serde_json::Value,
}

impl DocumentChunk {
    /// Create a chunk with an id derived from its source, position and text.
    ///
    /// Text is trimmed; a chunk without text or without a source is rejected,
    /// so nothing empty ever reaches the vector index.
    pub fn new(
        source: impl Into<String>,
        chunk_index: usize,
        text: impl Into<String>,
    ) -> Result<Self> {
        let source = source.into();
        let text = text.into().trim().to_string();

        if source.trim().is_empty() {
            return Err(Error::InvalidInput("chunk source must not be empty".to_string()));
        }
        if text.is_empty() {
            return Err(Error::InvalidInput("chunk text must not be empty".to_string()));
        }

        Ok(Self {
            id: chunk_id(&source, chunk_index, &text),
            text,
            source,
            chunk_index,
            metadata: serde_json::Value::Object(Default::default()),
        })
    }

    /// Attach extra metadata stored alongside the chunk
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Deterministic point id: re-ingesting the same file overwrites its points
fn chunk_id(source: &str, chunk_index: usize, text: &str) -> String {
    let digest = md5::compute(format!("{}\u{0}{}\u{0}{}", source, chunk_index, text));
    Uuid::from_bytes(digest.0).to_string()
}

/// A chunk paired with its embedding, ready to be upserted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub chunk: DocumentChunk,
    pub embedding: Vec<f32>,
}

/// A chunk returned from a similarity search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// A single prior turn of the conversation supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Configuration for document chunking and embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Maximum chunk length, in characters
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks
    pub chunk_overlap: usize,
    /// Chunks sent per embedding request
    pub batch_size: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
            batch_size: 32,
        }
    }
}

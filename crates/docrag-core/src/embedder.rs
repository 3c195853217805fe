//! Embedding model trait

use async_trait::async_trait;

use crate::{Error, Result};

/// Trait for embedding models (e.g., OpenAI embeddings)
///
/// Implementations turn text into fixed-dimension vectors. The same model must
/// be used on the write path (chunks) and the read path (queries).
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Get the model identifier
    fn model_id(&self) -> &str;

    /// Dimension of every vector this model returns
    fn dimensions(&self) -> usize;

    /// Embed a batch of texts, returning one vector per input, in order
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query string
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_documents(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("embedding model returned no vector".to_string()))
    }
}

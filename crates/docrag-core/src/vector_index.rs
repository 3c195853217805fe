//! Vector index trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{IndexedChunk, Result, ScoredChunk};

/// Configuration for vector search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub top_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

/// Trait for vector indexes (e.g., Qdrant)
///
/// The index is the single source of truth for retrievable content: it stores
/// each chunk's text and metadata next to its embedding.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Name of the index/collection this handle writes to
    fn name(&self) -> &str;

    /// Make sure the index exists and can accept vectors of `dimensions`
    async fn ensure_ready(&self, dimensions: usize) -> Result<()>;

    /// Insert or replace points, returning how many were written
    async fn upsert(&self, points: Vec<IndexedChunk>) -> Result<usize>;

    /// Nearest-neighbour search, best match first
    async fn search(&self, vector: Vec<f32>, config: &SearchConfig) -> Result<Vec<ScoredChunk>>;

    /// Get the total number of stored points
    async fn count(&self) -> Result<usize>;
}

//! In-memory vector index

use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

use docrag_core::{Error, IndexedChunk, Result, ScoredChunk, SearchConfig, VectorIndex};

use super::cosine_similarity;

/// Process-local index with exact cosine search.
///
/// Contents live only as long as the process, so both services must share one
/// instance for ingested chunks to become retrievable.
pub struct LocalVectorIndex {
    name: String,
    points: RwLock<HashMap<String, IndexedChunk>>,
}

impl LocalVectorIndex {
    /// Create a new, empty index
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: RwLock::new(HashMap::new()),
        }
    }

    fn lock_error<E: std::fmt::Display>(e: E) -> Error {
        Error::VectorIndex(format!("Lock error: {}", e))
    }
}

#[async_trait]
impl VectorIndex for LocalVectorIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn ensure_ready(&self, _dimensions: usize) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, points: Vec<IndexedChunk>) -> Result<usize> {
        let mut stored = self.points.write().map_err(Self::lock_error)?;
        let count = points.len();
        for point in points {
            stored.insert(point.chunk.id.clone(), point);
        }
        Ok(count)
    }

    async fn search(&self, vector: Vec<f32>, config: &SearchConfig) -> Result<Vec<ScoredChunk>> {
        let stored = self.points.read().map_err(Self::lock_error)?;

        let mut results: Vec<ScoredChunk> = stored
            .values()
            .map(|point| ScoredChunk {
                chunk: point.chunk.clone(),
                score: cosine_similarity(&vector, &point.embedding),
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.chunk.id.cmp(&b.chunk.id))
        });
        results.truncate(config.top_k);

        Ok(results)
    }

    async fn count(&self) -> Result<usize> {
        let stored = self.points.read().map_err(Self::lock_error)?;
        Ok(stored.len())
    }
}

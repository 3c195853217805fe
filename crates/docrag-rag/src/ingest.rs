//! Ingestion pipeline: extract, split, embed and upsert one file

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use docrag_core::{
    DocumentChunk, Embedder, Error, IndexedChunk, IndexingConfig, Result, VectorIndex,
};

use crate::extract::ExtractorKind;
use crate::splitter::RecursiveCharacterSplitter;

/// Outcome of a successful ingestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionReport {
    /// Path the chunks were recorded under
    pub source: String,
    pub file_name: String,
    pub extractor: ExtractorKind,
    /// Number of points upserted into the index
    pub chunk_count: usize,
}

pub struct IngestionPipeline {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    splitter: RecursiveCharacterSplitter,
    batch_size: usize,
}

impl IngestionPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        config: &IndexingConfig,
    ) -> Result<Self> {
        Ok(Self {
            embedder,
            index,
            splitter: RecursiveCharacterSplitter::from_config(config)?,
            batch_size: config.batch_size.max(1),
        })
    }

    /// Ingest the file at `path`.
    ///
    /// A file that yields no chunks is an [`Error::EmptyDocument`] and leaves
    /// the index untouched.
    pub async fn ingest_file(&self, path: &Path) -> Result<IngestionReport> {
        let source = path.to_string_lossy().to_string();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| source.clone());
        let extractor = ExtractorKind::for_path(path);

        let bytes = tokio::fs::read(path).await?;
        info!(source = %source, extractor = %extractor, bytes = bytes.len(), "extracting document");

        let text = extractor.extract(bytes, path).await?;
        let chunks = self.chunk(&source, &file_name, extractor, &text)?;
        if chunks.is_empty() {
            return Err(Error::EmptyDocument);
        }
        debug!(source = %source, chunks = chunks.len(), "document split");

        let chunk_count = self.embed_and_upsert(chunks).await?;
        info!(
            source = %source,
            index = self.index.name(),
            chunk_count,
            "document ingested"
        );

        Ok(IngestionReport {
            source,
            file_name,
            extractor,
            chunk_count,
        })
    }

    fn chunk(
        &self,
        source: &str,
        file_name: &str,
        extractor: ExtractorKind,
        text: &str,
    ) -> Result<Vec<DocumentChunk>> {
        let pieces = self.splitter.split_text(text);
        let total_chunks = pieces.len();
        let ingested_at = Utc::now().to_rfc3339();

        pieces
            .into_iter()
            .enumerate()
            .map(|(chunk_index, piece)| {
                DocumentChunk::new(source, chunk_index, piece).map(|chunk| {
                    chunk.with_metadata(json!({
                        "file_name": file_name,
                        "extractor": extractor.name(),
                        "total_chunks": total_chunks,
                        "ingested_at": ingested_at,
                    }))
                })
            })
            .collect()
    }

    /// Each embedding batch is upserted before the next one is embedded
    async fn embed_and_upsert(&self, chunks: Vec<DocumentChunk>) -> Result<usize> {
        let mut upserted = 0;

        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();
            let embeddings = self.embedder.embed_documents(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(Error::Embedding(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }
            debug!(batch = batch.len(), model = self.embedder.model_id(), "embedded batch");

            let points: Vec<IndexedChunk> = batch
                .iter()
                .cloned()
                .zip(embeddings)
                .map(|(chunk, embedding)| IndexedChunk { chunk, embedding })
                .collect();
            upserted += self.index.upsert(points).await?;
        }

        Ok(upserted)
    }
}

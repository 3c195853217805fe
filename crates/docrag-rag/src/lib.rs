//! Document ingestion and retrieval-augmented generation for docrag
//!
//! The ingestion side turns an uploaded file into embedded chunks in a vector
//! index; the query side retrieves those chunks and asks a language model to
//! answer from them. Both sides only talk to the outside world through the
//! traits in `docrag-core`.

pub mod extract;
pub mod index;
pub mod prompt;
pub mod splitter;

mod engine;
mod hash_embedder;
mod ingest;
mod scratch;


pub use engine::RagEngine;
pub use extract::ExtractorKind;
pub use hash_embedder::{DEFAULT_HASH_DIMENSIONS, HashEmbedder};
pub use index::{LocalVectorIndex, QdrantConfig, QdrantVectorIndex};
pub use ingest::{IngestionPipeline, IngestionReport};
pub use scratch::ScratchDir;
pub use splitter::RecursiveCharacterSplitter;

// Re-export core types for convenience
pub use docrag_core::{
    ChatMessage, DocumentChunk, Embedder, Error, GenerationConfig, IndexingConfig, LLMProvider,
    Result, ScoredChunk, SearchConfig, VectorIndex,
};

//! Core traits and types for docrag
//!
//! This crate defines the seams between the ingestion and query pipelines and
//! the hosted services they delegate to: embedding models, vector indexes and
//! language models. Every client is an injected trait object, which keeps the
//! pipelines testable against in-memory fakes.

pub mod config;
pub mod embedder;
pub mod error;
pub mod llm;
pub mod types;
pub mod vector_index;

pub use embedder::Embedder;
pub use error::{Error, Result};
pub use llm::{GenerationConfig, GenerationResult, LLMProvider};
pub use types::*;
pub use vector_index::{SearchConfig, VectorIndex};

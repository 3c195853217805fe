//! OpenAI integration for docrag
//!
//! This crate provides the OpenAI implementations of the `Embedder` and
//! `LLMProvider` traits. Any endpoint that speaks the OpenAI REST dialect can
//! be used by pointing `OPENAI_BASE_URL` at it.

mod client;
mod config;
mod embeddings;


pub use client::OpenAiChatClient;
pub use config::OpenAiConfig;
pub use embeddings::OpenAiEmbedder;

// Re-export core types for convenience
pub use docrag_core::{Embedder, Error, GenerationConfig, GenerationResult, LLMProvider, Result};

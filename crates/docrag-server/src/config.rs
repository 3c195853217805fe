//! Service configuration

use std::path::PathBuf;

use docrag_core::config::{Lookup, env_lookup, optional, parsed_or, required};
use docrag_core::{Error, IndexingConfig, Result};
use docrag_openai::OpenAiConfig;
use docrag_rag::{DEFAULT_HASH_DIMENSIONS, QdrantConfig, RecursiveCharacterSplitter};

pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
pub const DEFAULT_PROJECT: &str = "docrag";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// `QDRANT_URL` value selecting the in-process index
const MEMORY_BACKEND: &str = "memory";

/// Where chunks are stored
#[derive(Debug, Clone, PartialEq)]
pub enum IndexBackend {
    /// Process-local index; only useful when both services share a process
    Memory,
    Qdrant(QdrantConfig),
}

/// Which model turns text into vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedderBackend {
    OpenAi,
    /// Offline hashing embedder with the given dimension
    Hash(usize),
}

/// Browser origins allowed by the CORS layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

impl CorsOrigins {
    fn parse(raw: &str) -> Self {
        let origins: Vec<String> = raw
            .split(',')
            .map(|origin| origin.trim().trim_end_matches('/').to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        if origins.iter().any(|origin| origin == "*") {
            CorsOrigins::Any
        } else {
            CorsOrigins::List(origins)
        }
    }
}

/// Configuration shared by the ingestion and query services
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub index_name: String,
    pub index: IndexBackend,
    pub embedder: EmbedderBackend,
    /// Present whenever `OPENAI_API_KEY` is set
    pub openai: Option<OpenAiConfig>,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub cors_origins: CorsOrigins,
    pub project: String,
    pub indexing: IndexingConfig,
}

impl ServiceConfig {
    /// Load `.env`, then read configuration from the environment
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(&env_lookup)
    }

    /// Create configuration from an arbitrary variable source
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let index_name = required(lookup, "DOCRAG_INDEX")?;

        let index = match optional(lookup, "QDRANT_URL") {
            Some(url) if url.eq_ignore_ascii_case(MEMORY_BACKEND) => IndexBackend::Memory,
            _ => IndexBackend::Qdrant(QdrantConfig::from_lookup(lookup)?),
        };

        let embedder = match optional(lookup, "DOCRAG_EMBEDDER").as_deref() {
            None | Some("openai") => EmbedderBackend::OpenAi,
            Some("hash") => EmbedderBackend::Hash(parsed_or(
                lookup,
                "DOCRAG_HASH_DIMENSIONS",
                DEFAULT_HASH_DIMENSIONS,
            )?),
            Some(other) => {
                return Err(Error::Configuration(format!(
                    "unknown DOCRAG_EMBEDDER {:?}; expected \"openai\" or \"hash\"",
                    other
                )));
            }
        };

        let openai = match (optional(lookup, "OPENAI_API_KEY"), embedder) {
            (Some(_), _) | (None, EmbedderBackend::OpenAi) => {
                Some(OpenAiConfig::from_lookup(lookup)?)
            }
            (None, EmbedderBackend::Hash(_)) => None,
        };

        let defaults = IndexingConfig::default();
        let indexing = IndexingConfig {
            chunk_size: parsed_or(lookup, "DOCRAG_CHUNK_SIZE", defaults.chunk_size)?,
            chunk_overlap: parsed_or(lookup, "DOCRAG_CHUNK_OVERLAP", defaults.chunk_overlap)?,
            batch_size: parsed_or(lookup, "DOCRAG_EMBED_BATCH_SIZE", defaults.batch_size)?,
        };
        RecursiveCharacterSplitter::from_config(&indexing)?;
        if indexing.batch_size == 0 {
            return Err(Error::Configuration(
                "DOCRAG_EMBED_BATCH_SIZE must be greater than zero".to_string(),
            ));
        }

        let upload_dir = optional(lookup, "DOCRAG_UPLOAD_DIR")
            .unwrap_or_else(|| DEFAULT_UPLOAD_DIR.to_string());
        let max_upload_bytes =
            parsed_or(lookup, "DOCRAG_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;
        let cors_origins = optional(lookup, "DOCRAG_CORS_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string());

        Ok(Self {
            index_name,
            index,
            embedder,
            openai,
            upload_dir: PathBuf::from(upload_dir),
            max_upload_bytes,
            cors_origins: CorsOrigins::parse(&cors_origins),
            project: optional(lookup, "DOCRAG_PROJECT")
                .unwrap_or_else(|| DEFAULT_PROJECT.to_string()),
            indexing,
        })
    }

    /// OpenAI settings, required by the chat model and the OpenAI embedder
    pub fn openai(&self) -> Result<&OpenAiConfig> {
        self.openai.as_ref().ok_or_else(|| {
            Error::Configuration("OPENAI_API_KEY environment variable not found".to_string())
        })
    }

    /// Local configuration: in-memory index and hashing embedder
    pub fn local(index_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            index: IndexBackend::Memory,
            embedder: EmbedderBackend::Hash(DEFAULT_HASH_DIMENSIONS),
            openai: None,
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            cors_origins: CorsOrigins::List(vec![DEFAULT_CORS_ORIGIN.to_string()]),
            project: DEFAULT_PROJECT.to_string(),
            indexing: IndexingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_with_required_values() {
        let config = ServiceConfig::from_lookup(&lookup_from(&[
            ("DOCRAG_INDEX", "docs"),
            ("OPENAI_API_KEY", "sk-test"),
        ]))
        .unwrap();

        assert_eq!(config.index_name, "docs");
        assert_eq!(config.index, IndexBackend::Qdrant(QdrantConfig::default()));
        assert_eq!(config.embedder, EmbedderBackend::OpenAi);
        assert_eq!(config.openai().unwrap().chat_model, "gpt-4o-mini");
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(
            config.cors_origins,
            CorsOrigins::List(vec!["http://localhost:3000".to_string()])
        );
        assert_eq!(config.project, "docrag");
        assert_eq!(config.indexing, IndexingConfig::default());
    }

    #[test]
    fn missing_required_values_are_fatal() {
        let err = ServiceConfig::from_lookup(&lookup_from(&[("OPENAI_API_KEY", "sk-test")]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: DOCRAG_INDEX environment variable not found"
        );

        let err =
            ServiceConfig::from_lookup(&lookup_from(&[("DOCRAG_INDEX", "docs")])).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn memory_backend_and_hash_embedder_need_no_credentials() {
        let config = ServiceConfig::from_lookup(&lookup_from(&[
            ("DOCRAG_INDEX", "docs"),
            ("QDRANT_URL", "memory"),
            ("DOCRAG_EMBEDDER", "hash"),
            ("DOCRAG_HASH_DIMENSIONS", "64"),
        ]))
        .unwrap();

        assert_eq!(config.index, IndexBackend::Memory);
        assert_eq!(config.embedder, EmbedderBackend::Hash(64));
        assert!(config.openai.is_none());
        assert!(config.openai().is_err());
    }

    #[test]
    fn cors_origins_are_a_comma_list_or_wildcard() {
        assert_eq!(
            CorsOrigins::parse("http://a.test/, https://b.test ,"),
            CorsOrigins::List(vec!["http://a.test".to_string(), "https://b.test".to_string()])
        );
        assert_eq!(CorsOrigins::parse("*"), CorsOrigins::Any);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let base = [("DOCRAG_INDEX", "docs"), ("OPENAI_API_KEY", "sk-test")];

        for extra in [
            ("DOCRAG_CHUNK_SIZE", "lots"),
            ("DOCRAG_CHUNK_OVERLAP", "1000"),
            ("DOCRAG_EMBED_BATCH_SIZE", "0"),
            ("DOCRAG_EMBEDDER", "word2vec"),
            ("QDRANT_URL", "not a url"),
            ("OPENAI_TEMPERATURE", "warm"),
        ] {
            let mut pairs = base.to_vec();
            pairs.push(extra);
            assert!(
                ServiceConfig::from_lookup(&lookup_from(&pairs)).is_err(),
                "{:?} should be rejected",
                extra
            );
        }
    }
}

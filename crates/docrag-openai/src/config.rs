//! OpenAI configuration

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use docrag_core::config::{Lookup, optional, parsed_or, required};
use docrag_core::{Error, GenerationConfig, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-large";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration for the OpenAI embedding and chat clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub embedding_model: String,
    /// Explicit vector size; sent to the API when set
    pub embedding_dimensions: Option<usize>,
    pub chat_model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    /// Create configuration from an arbitrary variable source
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let api_key = required(lookup, "OPENAI_API_KEY")?;

        let base_url = optional(lookup, "OPENAI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        url::Url::parse(&base_url).map_err(|e| {
            Error::Configuration(format!("invalid OPENAI_BASE_URL {:?}: {}", base_url, e))
        })?;

        let embedding_dimensions = match optional(lookup, "OPENAI_EMBEDDING_DIMENSIONS") {
            Some(_) => Some(parsed_or(lookup, "OPENAI_EMBEDDING_DIMENSIONS", 0usize)?),
            None => None,
        };

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            embedding_model: optional(lookup, "OPENAI_EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            embedding_dimensions,
            chat_model: optional(lookup, "OPENAI_CHAT_MODEL")
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            temperature: parsed_or(lookup, "OPENAI_TEMPERATURE", DEFAULT_TEMPERATURE)?,
            timeout_secs: parsed_or(lookup, "OPENAI_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
        })
    }

    /// Create configuration with explicit values
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimensions: None,
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Point the clients at an OpenAI-compatible endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Generation settings derived from this configuration
    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            model_id: self.chat_model.clone(),
            temperature: self.temperature,
            max_tokens: None,
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
        }
    }

    /// Resolve the vector size for the configured embedding model
    pub fn resolved_dimensions(&self) -> Result<usize> {
        if let Some(dimensions) = self.embedding_dimensions {
            if dimensions == 0 {
                return Err(Error::Configuration(
                    "OPENAI_EMBEDDING_DIMENSIONS must be greater than zero".to_string(),
                ));
            }
            return Ok(dimensions);
        }

        match self.embedding_model.as_str() {
            "text-embedding-3-large" => Ok(3072),
            "text-embedding-3-small" | "text-embedding-ada-002" => Ok(1536),
            other => Err(Error::Configuration(format!(
                "unknown dimension for embedding model {}; set OPENAI_EMBEDDING_DIMENSIONS",
                other
            ))),
        }
    }

    /// Build an HTTP client carrying the bearer token
    pub(crate) fn http_client(&self) -> Result<Client> {
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", self.api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| Error::Configuration("invalid OpenAI API key".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs.max(1)))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Network(e.to_string()))
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
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
    fn defaults_apply_when_only_key_is_set() {
        let config =
            OpenAiConfig::from_lookup(&lookup_from(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config, OpenAiConfig::new("sk-test"));
        assert_eq!(config.resolved_dimensions().unwrap(), 3072);
    }

    #[test]
    fn missing_key_is_a_configuration_error() {
        let err = OpenAiConfig::from_lookup(&lookup_from(&[])).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = OpenAiConfig::from_lookup(&lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "http://localhost:9000/v1/"),
            ("OPENAI_EMBEDDING_MODEL", "nomic-embed-text"),
            ("OPENAI_EMBEDDING_DIMENSIONS", "768"),
            ("OPENAI_CHAT_MODEL", "gpt-4o"),
            ("OPENAI_TEMPERATURE", "0.2"),
            ("OPENAI_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, "http://localhost:9000/v1");
        assert_eq!(config.endpoint("/embeddings"), "http://localhost:9000/v1/embeddings");
        assert_eq!(config.resolved_dimensions().unwrap(), 768);

        let generation = config.generation_config();
        assert_eq!(generation.model_id, "gpt-4o");
        assert_eq!(generation.temperature, 0.2);
        assert_eq!(generation.timeout, Duration::from_secs(5));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(OpenAiConfig::from_lookup(&lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "not a url"),
        ]))
        .is_err());

        assert!(OpenAiConfig::from_lookup(&lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_TEMPERATURE", "warm"),
        ]))
        .is_err());
    }

    #[test]
    fn unknown_models_need_explicit_dimensions() {
        let mut config = OpenAiConfig::new("sk-test");
        config.embedding_model = "custom-embedder".to_string();
        assert!(config.resolved_dimensions().is_err());

        config.embedding_dimensions = Some(0);
        assert!(config.resolved_dimensions().is_err());
    }
}

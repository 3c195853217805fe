//! Qdrant vector index

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, Distance, PointId, PointStruct,
    SearchPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

use docrag_core::config::{Lookup, optional};
use docrag_core::{
    DocumentChunk, Error, IndexedChunk, Result, ScoredChunk, SearchConfig, VectorIndex,
};

pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

const TEXT_KEY: &str = "text";
const SOURCE_KEY: &str = "source";
const CHUNK_INDEX_KEY: &str = "chunk_index";

/// Connection settings for a Qdrant deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
}

impl QdrantConfig {
    /// Create configuration from an arbitrary variable source
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let url =
            optional(lookup, "QDRANT_URL").unwrap_or_else(|| DEFAULT_QDRANT_URL.to_string());
        url::Url::parse(&url)
            .map_err(|e| Error::Configuration(format!("invalid QDRANT_URL {:?}: {}", url, e)))?;

        Ok(Self {
            url,
            api_key: optional(lookup, "QDRANT_API_KEY"),
        })
    }
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_QDRANT_URL.to_string(),
            api_key: None,
        }
    }
}

/// Qdrant collection used as the vector index
pub struct QdrantVectorIndex {
    client: Qdrant,
    collection: String,
}

fn index_error(e: impl std::fmt::Display) -> Error {
    Error::VectorIndex(e.to_string())
}

impl QdrantVectorIndex {
    /// Build a client for `collection`; no request is made until first use
    pub fn connect(config: &QdrantConfig, collection: impl Into<String>) -> Result<Self> {
        let mut builder = Qdrant::from_url(&config.url);
        if let Some(api_key) = &config.api_key {
            builder = builder.api_key(api_key.clone());
        }
        let client = builder.build().map_err(index_error)?;

        Ok(Self {
            client,
            collection: collection.into(),
        })
    }
}

#[async_trait]
impl VectorIndex for QdrantVectorIndex {
    fn name(&self) -> &str {
        &self.collection
    }

    async fn ensure_ready(&self, dimensions: usize) -> Result<()> {
        let collections = self.client.list_collections().await.map_err(index_error)?;

        let collection_exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection);

        if collection_exists {
            return Ok(());
        }

        let created = self
            .client
            .create_collection(
                CreateCollectionBuilder::new(self.collection.clone()).vectors_config(
                    VectorParamsBuilder::new(dimensions as u64, Distance::Cosine),
                ),
            )
            .await;

        match created {
            Ok(_) => {
                info!(collection = %self.collection, dimensions, "created Qdrant collection");
                Ok(())
            }
            // The other service may create it between the listing and this call.
            Err(e) if is_already_exists(&e.to_string()) => {
                info!(collection = %self.collection, "Qdrant collection created concurrently");
                Ok(())
            }
            Err(e) => Err(index_error(e)),
        }
    }

    async fn upsert(&self, points: Vec<IndexedChunk>) -> Result<usize> {
        if points.is_empty() {
            return Ok(0);
        }

        let count = points.len();
        let points: Vec<PointStruct> = points
            .into_iter()
            .map(|point| {
                let payload = chunk_payload(&point.chunk);
                PointStruct::new(point.chunk.id, point.embedding, payload)
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(self.collection.clone(), points).wait(true))
            .await
            .map_err(index_error)?;

        Ok(count)
    }

    async fn search(&self, vector: Vec<f32>, config: &SearchConfig) -> Result<Vec<ScoredChunk>> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(self.collection.clone(), vector, config.top_k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(index_error)?;

        let mut results = Vec::with_capacity(response.result.len());
        for point in response.result {
            let id = point.id.as_ref().map(point_id_string);
            match chunk_from_payload(id, &point.payload) {
                Some(chunk) => results.push(ScoredChunk {
                    chunk,
                    score: point.score,
                }),
                None => {
                    warn!(collection = %self.collection, "skipping point without text or source")
                }
            }
        }

        Ok(results)
    }

    async fn count(&self) -> Result<usize> {
        let response = self
            .client
            .count(CountPointsBuilder::new(self.collection.clone()).exact(true))
            .await
            .map_err(index_error)?;

        Ok(response.result.map(|r| r.count as usize).unwrap_or(0))
    }
}

fn is_already_exists(message: &str) -> bool {
    message.contains("already exists")
}

fn chunk_payload(chunk: &DocumentChunk) -> HashMap<String, Value> {
    let mut payload = HashMap::new();
    payload.insert(TEXT_KEY.to_string(), Value::from(chunk.text.clone()));
    payload.insert(SOURCE_KEY.to_string(), Value::from(chunk.source.clone()));
    payload.insert(CHUNK_INDEX_KEY.to_string(), Value::from(chunk.chunk_index as i64));

    if let Some(metadata) = chunk.metadata.as_object() {
        for (key, value) in metadata {
            if matches!(key.as_str(), TEXT_KEY | SOURCE_KEY | CHUNK_INDEX_KEY) {
                continue;
            }
            if let Some(value) = json_to_value(value) {
                payload.insert(key.clone(), value);
            }
        }
    }

    payload
}

fn chunk_from_payload(
    id: Option<String>,
    payload: &HashMap<String, Value>,
) -> Option<DocumentChunk> {
    let text = payload_string(payload, TEXT_KEY)?;
    let source = payload_string(payload, SOURCE_KEY)?;
    let chunk_index = match payload.get(CHUNK_INDEX_KEY).and_then(|v| v.kind.as_ref()) {
        Some(Kind::IntegerValue(i)) => usize::try_from(*i).unwrap_or_default(),
        _ => 0,
    };

    let mut chunk = DocumentChunk::new(source, chunk_index, text).ok()?;
    if let Some(id) = id {
        chunk.id = id;
    }

    let metadata: serde_json::Map<String, serde_json::Value> = payload
        .iter()
        .filter(|(key, _)| !matches!(key.as_str(), TEXT_KEY | SOURCE_KEY | CHUNK_INDEX_KEY))
        .filter_map(|(key, value)| value_to_json(value).map(|v| (key.clone(), v)))
        .collect();

    Some(chunk.with_metadata(serde_json::Value::Object(metadata)))
}

fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
    match payload.get(key).and_then(|v| v.kind.as_ref()) {
        Some(Kind::StringValue(s)) => Some(s.clone()),
        _ => None,
    }
}

fn point_id_string(id: &PointId) -> String {
    match &id.point_id_options {
        Some(PointIdOptions::Uuid(uuid)) => uuid.clone(),
        Some(PointIdOptions::Num(num)) => num.to_string(),
        None => String::new(),
    }
}

/// Scalar JSON values only; nested structures are not stored
fn json_to_value(value: &serde_json::Value) -> Option<Value> {
    match value {
        serde_json::Value::String(s) => Some(Value::from(s.clone())),
        serde_json::Value::Bool(b) => Some(Value::from(*b)),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Some(Value::from(i)),
            None => n.as_f64().map(Value::from),
        },
        _ => None,
    }
}

fn value_to_json(value: &Value) -> Option<serde_json::Value> {
    match value.kind.as_ref()? {
        Kind::StringValue(s) => Some(serde_json::Value::String(s.clone())),
        Kind::BoolValue(b) => Some(serde_json::Value::Bool(*b)),
        Kind::IntegerValue(i) => Some(serde_json::Value::from(*i)),
        Kind::DoubleValue(d) => serde_json::Number::from_f64(*d).map(serde_json::Value::Number),
        _ => None,
    }
}

//! HTTP services for docrag
//!
//! Two axum applications share one configuration: the ingestion service
//! (`POST /process`) and the query service (`POST /generate`). Both also serve
//! `GET /health` and a banner at `GET /`.

pub mod clients;
pub mod config;
pub mod http;
pub mod ingest;
pub mod query;

#[cfg(test)]
mod tests;

use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use docrag_core::Result;

pub use clients::Clients;
pub use config::{CorsOrigins, EmbedderBackend, IndexBackend, ServiceConfig};
pub use ingest::{IngestState, ProcessResponse};
pub use query::{GenerationRequest, GenerationResponse, QueryState};

pub const INGEST_PORT: u16 = 8001;
pub const QUERY_PORT: u16 = 8000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    pub message: String,
}

pub(crate) async fn health() -> Json<Health> {
    Json(Health {
        status: "healthy".to_string(),
    })
}

pub(crate) fn banner(message: &str) -> Json<Banner> {
    Json(Banner {
        message: message.to_string(),
    })
}

/// Build the ingestion application with its layers
pub async fn ingest_app(config: &ServiceConfig) -> Result<Router> {
    let clients = Clients::connect(config).await?;
    ingest_app_with(&clients, config)
}

/// Build the query application with its layers
pub async fn query_app(config: &ServiceConfig) -> Result<Router> {
    let clients = Clients::connect(config).await?;
    query_app_with(&clients, config)
}

/// Build both applications over the same clients.
///
/// Required for the in-memory index, whose contents are only visible inside
/// one process.
pub async fn combined_apps(config: &ServiceConfig) -> Result<(Router, Router)> {
    let clients = Clients::connect(config).await?;
    Ok((
        ingest_app_with(&clients, config)?,
        query_app_with(&clients, config)?,
    ))
}

fn ingest_app_with(clients: &Clients, config: &ServiceConfig) -> Result<Router> {
    let state = IngestState::from_clients(clients, config)?;
    http::with_layers(ingest::router(state), config)
}

fn query_app_with(clients: &Clients, config: &ServiceConfig) -> Result<Router> {
    let llm = clients::build_llm(config)?;
    let state = QueryState::from_clients(clients, llm, config)?;
    http::with_layers(query::router(state), config)
}

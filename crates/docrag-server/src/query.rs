//! Query service: `POST /generate`

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use docrag_core::{ChatMessage, Error, LLMProvider, Result};
use docrag_rag::RagEngine;

use crate::clients::Clients;
use crate::config::ServiceConfig;
use crate::{Banner, banner, health};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(default)]
    pub chat_history: Vec<ChatMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub response: String,
}

/// Any pipeline failure, reported as `500 {"detail": ...}`
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(error = %self.0, "generation failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": self.0.to_string() })),
        )
            .into_response()
    }
}

#[derive(Clone)]
pub struct QueryState {
    engine: Arc<RagEngine>,
}

impl QueryState {
    pub fn new(engine: RagEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    pub fn from_clients(
        clients: &Clients,
        llm: Arc<dyn LLMProvider>,
        config: &ServiceConfig,
    ) -> Result<Self> {
        let generation = config.openai()?.generation_config();
        Ok(Self::new(RagEngine::new(
            clients.embedder.clone(),
            clients.index.clone(),
            llm,
            generation,
        )))
    }
}

async fn generate(
    State(state): State<QueryState>,
    Json(request): Json<GenerationRequest>,
) -> std::result::Result<Json<GenerationResponse>, ApiError> {
    info!(history = request.chat_history.len(), "generation requested");
    let response = state
        .engine
        .generate(&request.prompt, &request.chat_history)
        .await?;
    Ok(Json(GenerationResponse { response }))
}

async fn query_banner() -> Json<Banner> {
    banner("docrag query service")
}

/// Routes of the query service, without layers
pub fn router(state: QueryState) -> Router {
    Router::new()
        .route("/", get(query_banner))
        .route("/health", get(health))
        .route("/generate", post(generate))
        .with_state(state)
}

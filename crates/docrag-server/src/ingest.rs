//! Ingestion service: `POST /process`

use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use docrag_core::{Error, Result};
use docrag_rag::{IngestionPipeline, ScratchDir};

use crate::clients::Clients;
use crate::config::ServiceConfig;
use crate::{Banner, banner, health};

/// Multipart field carrying the upload
const FILE_FIELD: &str = "file";

/// Shared state for the ingestion routes
#[derive(Clone)]
pub struct IngestState {
    pipeline: Arc<IngestionPipeline>,
    scratch: ScratchDir,
    /// Uploads share one scratch directory, so ingestion runs one at a time
    gate: Arc<Mutex<()>>,
    /// Same limit as the body layer, quoted back when an upload exceeds it
    max_upload_bytes: usize,
}

impl IngestState {
    pub fn new(pipeline: IngestionPipeline, scratch: ScratchDir, max_upload_bytes: usize) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            scratch,
            gate: Arc::new(Mutex::new(())),
            max_upload_bytes,
        }
    }

    pub fn from_clients(clients: &Clients, config: &ServiceConfig) -> Result<Self> {
        let pipeline = IngestionPipeline::new(
            clients.embedder.clone(),
            clients.index.clone(),
            &config.indexing,
        )?;
        Ok(Self::new(
            pipeline,
            ScratchDir::new(config.upload_dir.clone()),
            config.max_upload_bytes,
        ))
    }

    async fn ingest(&self, upload: Upload) -> Result<ProcessResponse> {
        let _guard = self.gate.lock().await;

        self.scratch.reset().await?;
        let path = self.scratch.persist(&upload.file_name, &upload.bytes).await?;
        let report = self.pipeline.ingest_file(&path).await?;

        Ok(ProcessResponse::success(report.source, report.chunk_count))
    }
}

/// Body of every `/process` reply; failures are reported with status 200
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub status: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_count: Option<usize>,
}

impl ProcessResponse {
    pub fn success(file_path: String, chunk_count: usize) -> Self {
        Self {
            status: "success".to_string(),
            message: format!(
                "File processed and uploaded to vector store. Created {} chunks.",
                chunk_count
            ),
            file_path: Some(file_path),
            chunk_count: Some(chunk_count),
        }
    }

    /// Report a failure with the error's message
    pub fn error(err: &Error) -> Self {
        Self {
            status: "error".to_string(),
            message: err.to_string(),
            file_path: None,
            chunk_count: None,
        }
    }
}

struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

fn upload_error(e: MultipartError, context: &str, max_upload_bytes: usize) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return Error::InvalidInput(format!(
            "uploaded file is too large (limit {} bytes)",
            max_upload_bytes
        ));
    }
    Error::InvalidInput(format!("{}: {}", context, e))
}

async fn read_upload(mut multipart: Multipart, max_upload_bytes: usize) -> Result<Upload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error(e, "failed to read multipart body", max_upload_bytes))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| Error::InvalidInput("uploaded file has no file name".to_string()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| upload_error(e, "failed to read uploaded file", max_upload_bytes))?;

        return Ok(Upload {
            file_name,
            bytes: bytes.to_vec(),
        });
    }

    Err(Error::InvalidInput(format!(
        "multipart field {:?} is required",
        FILE_FIELD
    )))
}

async fn process(State(state): State<IngestState>, multipart: Multipart) -> Json<ProcessResponse> {
    let result = match read_upload(multipart, state.max_upload_bytes).await {
        Ok(upload) => {
            info!(file_name = %upload.file_name, bytes = upload.bytes.len(), "upload received");
            state.ingest(upload).await
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(response) => Json(response),
        Err(e) => {
            warn!(error = %e, "ingestion failed");
            Json(ProcessResponse::error(&e))
        }
    }
}

async fn ingest_banner() -> Json<Banner> {
    banner("docrag ingestion service")
}

/// Routes of the ingestion service, without layers
pub fn router(state: IngestState) -> Router {
    Router::new()
        .route("/", get(ingest_banner))
        .route("/health", get(health))
        .route("/process", post(process))
        .with_state(state)
}

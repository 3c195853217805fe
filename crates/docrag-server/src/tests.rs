//! In-process HTTP tests for both services

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use docrag_core::{
    Embedder, Error, GenerationConfig, GenerationResult, LLMProvider, Result, VectorIndex,
};
use docrag_rag::{HashEmbedder, IngestionPipeline, LocalVectorIndex, RagEngine, ScratchDir};

use crate::*;

const BOUNDARY: &str = "docrag-test-boundary";

/// Replies with the first retrieved `Content:` line, or fails when told to
#[derive(Default)]
struct EchoLlm {
    fail: bool,
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl LLMProvider for EchoLlm {
    async fn generate(&self, prompt: &str) -> Result<GenerationResult> {
        self.generate_with_config(prompt, &GenerationConfig::default()).await
    }

    async fn generate_with_config(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<GenerationResult> {
        if self.fail {
            return Err(Error::LLMProvider("model unavailable".to_string()));
        }
        self.prompts.lock().unwrap().push(prompt.to_string());

        let text = prompt
            .lines()
            .find_map(|line| line.strip_prefix("Content: "))
            .map(|content| format!("From your documents: {}", content))
            .unwrap_or_else(|| "No documents matched.".to_string());
        Ok(GenerationResult {
            text,
            model_id: config.model_id.clone(),
            tokens_used: None,
        })
    }

    fn model_id(&self) -> &str {
        "echo"
    }
}

struct TestApps {
    ingest: Router,
    query: Router,
    index: Arc<LocalVectorIndex>,
    llm: Arc<EchoLlm>,
}

fn apps(upload_dir: &Path, llm: EchoLlm) -> TestApps {
    apps_with(ServiceConfig::local("docs"), upload_dir, llm)
}

fn apps_with(config: ServiceConfig, upload_dir: &Path, llm: EchoLlm) -> TestApps {
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::default());
    let index = Arc::new(LocalVectorIndex::new("docs"));
    let llm = Arc::new(llm);

    let pipeline =
        IngestionPipeline::new(embedder.clone(), index.clone(), &config.indexing).unwrap();
    let scratch = ScratchDir::new(upload_dir);
    let ingest_state = IngestState::new(pipeline, scratch, config.max_upload_bytes);
    let engine = RagEngine::new(embedder, index.clone(), llm.clone(), GenerationConfig::default());

    TestApps {
        ingest: http::with_layers(ingest::router(ingest_state), &config).unwrap(),
        query: http::with_layers(query::router(QueryState::new(engine)), &config).unwrap(),
        index,
        llm,
    }
}

fn multipart_request(field: &str, file_name: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::post("/process")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn health_and_banner() {
    let dir = tempfile::tempdir().unwrap();
    let apps = apps(dir.path(), EchoLlm::default());

    for app in [&apps.ingest, &apps.query] {
        let (status, body) = send(app, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "healthy"}));
    }

    let (_, body) = send(&apps.ingest, Request::get("/").body(Body::empty()).unwrap()).await;
    assert_eq!(body, json!({"message": "docrag ingestion service"}));
    let (_, body) = send(&apps.query, Request::get("/").body(Body::empty()).unwrap()).await;
    assert_eq!(body, json!({"message": "docrag query service"}));
}

#[tokio::test]
async fn uploaded_document_grounds_the_answer() {
    let dir = tempfile::tempdir().unwrap();
    let apps = apps(dir.path(), EchoLlm::default());

    let (status, body) = send(
        &apps.ingest,
        multipart_request("file", "sky.txt", b"The sky is blue."),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["chunk_count"], 1);
    insta::assert_snapshot!(body["message"].as_str().unwrap(), @"File processed and uploaded to vector store. Created 1 chunks.");
    assert_eq!(
        body["file_path"].as_str().unwrap(),
        dir.path().join("sky.txt").to_string_lossy()
    );
    assert_eq!(apps.index.count().await.unwrap(), 1);

    let (status, body) = send(
        &apps.query,
        json_request("/generate", json!({"prompt": "What color is the sky?"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"response": "From your documents: The sky is blue."}));
}

#[tokio::test]
async fn chat_history_is_forwarded_and_truncated() {
    let dir = tempfile::tempdir().unwrap();
    let apps = apps(dir.path(), EchoLlm::default());

    let history: Vec<Value> = (1..=6)
        .map(|i| json!({"role": "user", "content": format!("turn {}", i)}))
        .collect();
    let (status, body) = send(
        &apps.query,
        json_request("/generate", json!({"prompt": "Anything?", "chat_history": history})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "No documents matched.");

    let prompts = apps.llm.prompts.lock().unwrap();
    assert!(!prompts[0].contains("turn 1"));
    let kept = (2..=6).map(|i| format!("user: turn {}", i)).collect::<Vec<_>>();
    assert!(prompts[0].contains(&kept.join("\n")));
}

#[tokio::test]
async fn upload_without_file_field_is_an_error_status() {
    let dir = tempfile::tempdir().unwrap();
    let apps = apps(dir.path(), EchoLlm::default());

    let (status, body) = send(
        &apps.ingest,
        multipart_request("document", "sky.txt", b"The sky is blue."),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().contains("\"file\""));
    assert!(body.get("chunk_count").is_none());
}

#[tokio::test]
async fn binary_and_empty_uploads_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let apps = apps(dir.path(), EchoLlm::default());

    let (status, body) = send(
        &apps.ingest,
        multipart_request("file", "archive.bin", &[0x50, 0x4b, 0x03, 0x04, 0x00, 0x00]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");

    let (_, body) = send(&apps.ingest, multipart_request("file", "empty.txt", b"")).await;
    assert_eq!(
        body,
        json!({"status": "error", "message": "No documents created from file"})
    );

    assert_eq!(apps.index.count().await.unwrap(), 0);
}

#[tokio::test]
async fn each_upload_replaces_the_scratch_contents() {
    let dir = tempfile::tempdir().unwrap();
    let apps = apps(dir.path(), EchoLlm::default());

    send(&apps.ingest, multipart_request("file", "first.txt", b"First file.")).await;
    send(&apps.ingest, multipart_request("file", "second.txt", b"Second file.")).await;

    assert!(!dir.path().join("first.txt").exists());
    assert!(dir.path().join("second.txt").exists());
    assert_eq!(apps.index.count().await.unwrap(), 2);
}

#[tokio::test]
async fn concurrent_uploads_are_ingested_one_at_a_time() {
    let dir = tempfile::tempdir().unwrap();
    let apps = apps(dir.path(), EchoLlm::default());

    let ((_, first), (_, second)) = tokio::join!(
        send(&apps.ingest, multipart_request("file", "sky.txt", b"The sky is blue.")),
        send(&apps.ingest, multipart_request("file", "grass.txt", b"The grass is green.")),
    );

    assert_eq!(first["status"], "success");
    assert_eq!(second["status"], "success");
    assert_eq!(first["chunk_count"], 1);
    assert_eq!(second["chunk_count"], 1);
    assert_eq!(apps.index.count().await.unwrap(), 2);

    let remaining = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(remaining, 1);
}

#[tokio::test]
async fn oversized_uploads_report_the_limit() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ServiceConfig::local("docs");
    config.max_upload_bytes = 1024;
    let apps = apps_with(config, dir.path(), EchoLlm::default());

    let text = "The sky is blue. ".repeat(256);
    let (status, body) = send(
        &apps.ingest,
        multipart_request("file", "big.txt", text.as_bytes()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");
    insta::assert_snapshot!(body["message"].as_str().unwrap(), @"Invalid input: uploaded file is too large (limit 1024 bytes)");
    assert_eq!(apps.index.count().await.unwrap(), 0);
}

#[tokio::test]
async fn model_failure_is_a_500_with_detail() {
    let dir = tempfile::tempdir().unwrap();
    let apps = apps(
        dir.path(),
        EchoLlm {
            fail: true,
            ..EchoLlm::default()
        },
    );

    let (status, body) = send(
        &apps.query,
        json_request("/generate", json!({"prompt": "What color is the sky?"})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    insta::assert_snapshot!(body.to_string(), @r#"{"detail":"LLM provider error: model unavailable"}"#);
}

#[tokio::test]
async fn malformed_json_is_a_client_error() {
    let dir = tempfile::tempdir().unwrap();
    let apps = apps(dir.path(), EchoLlm::default());

    let request = Request::post("/generate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(&apps.query, request).await;
    assert!(status.is_client_error());

    let no_prompt = json_request("/generate", json!({"chat_history": []}));
    let (status, _) = send(&apps.query, no_prompt).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn cors_allows_only_configured_origins() {
    let dir = tempfile::tempdir().unwrap();
    let apps = apps(dir.path(), EchoLlm::default());

    let allowed = Request::get("/health")
        .header(header::ORIGIN, "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = apps.query.clone().oneshot(allowed).await.unwrap();
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:3000"
    );

    let denied = Request::get("/health")
        .header(header::ORIGIN, "http://evil.test")
        .body(Body::empty())
        .unwrap();
    let response = apps.query.clone().oneshot(denied).await.unwrap();
    assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[tokio::test]
async fn combined_apps_share_the_in_memory_index() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ServiceConfig::local("docs");
    config.upload_dir = dir.path().join("uploads");

    // The query app needs a chat model, which the local configuration lacks.
    assert!(combined_apps(&config).await.is_err());

    let clients = Clients::connect(&config).await.unwrap();
    let state = IngestState::from_clients(&clients, &config).unwrap();
    let app = ingest::router(state);
    let (_, body) = send(&app, multipart_request("file", "sky.txt", b"The sky is blue.")).await;

    assert_eq!(body["status"], "success");
    assert_eq!(clients.index.count().await.unwrap(), 1);
}

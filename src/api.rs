//! HTTP surface for Rusty Search.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /search` – Embed a query and return ranked chunks with snippets. Accepts
//!   `{ "query": string, "limit": number }` (`limit` defaults to 10, at most 100).
//! - `POST /upload?file_name=<name>` – Store the raw request body as a `.txt` file in the data
//!   directory and index it. Returns chunk counters for the stored file.
//! - `POST /index` – Start a background indexing pass over the data directory (202 Accepted).
//! - `GET /metrics` – Observe indexing counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! Failures are reported as `{ "error_code", "message", "status_code" }`.

use crate::embedding::EmbeddingError;
use crate::metrics::MetricsSnapshot;
use crate::processing::{
    DEFAULT_SEARCH_LIMIT, IndexingCause, ProcessingApi, SearchError, SearchHit, UploadError,
};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router exposing the search API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: ProcessingApi + 'static,
{
    Router::new()
        .route("/search", post(search::<S>))
        .route("/upload", post(upload::<S>))
        .route("/index", post(start_index::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

fn default_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

/// Request body for the `POST /search` endpoint.
#[derive(Deserialize)]
struct SearchRequest {
    /// Free-text query.
    query: String,
    /// Maximum number of results.
    #[serde(default = "default_limit")]
    limit: usize,
}

/// Success response for the `POST /search` endpoint.
#[derive(Serialize)]
struct SearchResponse {
    query: String,
    limit: usize,
    total_results: usize,
    results: Vec<SearchResultBody>,
}

#[derive(Serialize)]
struct SearchResultBody {
    id: String,
    score: f32,
    metadata: SearchResultMetadata,
}

#[derive(Serialize)]
struct SearchResultMetadata {
    file_name: String,
    file_path: String,
    text_snippet: String,
    chunk_index: usize,
}

impl From<SearchHit> for SearchResultBody {
    fn from(hit: SearchHit) -> Self {
        Self {
            id: hit.id,
            score: hit.score,
            metadata: SearchResultMetadata {
                file_name: hit.file_name,
                file_path: hit.file_path,
                text_snippet: hit.text_snippet,
                chunk_index: hit.chunk_index,
            },
        }
    }
}

/// Run a similarity search.
async fn search<S>(
    State(service): State<Arc<S>>,
    request: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, AppError>
where
    S: ProcessingApi,
{
    let Json(SearchRequest { query, limit }) = request?;
    let hits = service.search(&query, limit).await?;
    tracing::info!(limit, results = hits.len(), "Search request completed");
    Ok(Json(SearchResponse {
        query,
        limit,
        total_results: hits.len(),
        results: hits.into_iter().map(SearchResultBody::from).collect(),
    }))
}

/// Query string of the `POST /upload` endpoint.
#[derive(Deserialize)]
struct UploadParams {
    /// Name the file is stored under; must end in `.txt`.
    #[serde(default)]
    file_name: String,
}

/// Success response for the `POST /upload` endpoint.
#[derive(Serialize)]
struct UploadResponse {
    message: String,
    file_name: String,
    file_path: String,
    chunk_count: usize,
    inserted: usize,
    skipped: usize,
}

/// Store and index an uploaded text file.
async fn upload<S>(
    State(service): State<Arc<S>>,
    params: Result<Query<UploadParams>, QueryRejection>,
    body: Bytes,
) -> Result<Json<UploadResponse>, AppError>
where
    S: ProcessingApi,
{
    let Query(params) = params?;
    let outcome = service.index_upload(&params.file_name, &body).await?;
    tracing::info!(
        file = %outcome.file_path,
        chunks = outcome.report.chunk_count,
        inserted = outcome.report.inserted,
        skipped = outcome.report.skipped,
        "Upload request completed"
    );
    Ok(Json(UploadResponse {
        message: format!("File '{}' uploaded and indexed", outcome.report.file_name),
        file_name: outcome.report.file_name,
        file_path: outcome.file_path,
        chunk_count: outcome.report.chunk_count,
        inserted: outcome.report.inserted,
        skipped: outcome.report.skipped,
    }))
}

/// Response body for `POST /index`.
#[derive(Serialize)]
struct IndexStartedResponse {
    status: &'static str,
    directory: String,
}

/// Kick off a background indexing pass over the data directory.
async fn start_index<S>(State(service): State<Arc<S>>) -> impl IntoResponse
where
    S: ProcessingApi,
{
    let directory = service.start_directory_index();
    tracing::info!(directory = %directory.display(), "Background indexing requested");
    (
        StatusCode::ACCEPTED,
        Json(IndexStartedResponse {
            status: "started",
            directory: directory.display().to_string(),
        }),
    )
}

/// Return the indexing counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: ProcessingApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "search",
                method: "POST",
                path: "/search",
                description: "Embed a query and return the most similar chunks with snippets.",
                request_example: Some(json!({
                    "query": "rivers in spring",
                    "limit": 5
                })),
            },
            CommandDescriptor {
                name: "upload",
                method: "POST",
                path: "/upload?file_name=notes.txt",
                description: "Store the raw request body as a .txt file in the data directory and index it.",
                request_example: None,
            },
            CommandDescriptor {
                name: "index",
                method: "POST",
                path: "/index",
                description: "Start a background indexing pass over the data directory.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return indexing counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

/// Error body shared by every endpoint.
#[derive(Serialize)]
struct ErrorBody {
    error_code: &'static str,
    message: String,
    status_code: u16,
}

enum AppError {
    Search(SearchError),
    Upload(UploadError),
    /// Request body or query string could not be extracted.
    Rejected { status: StatusCode, message: String },
}

impl AppError {
    fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Rejected { status, .. } => (*status, "INVALID_REQUEST"),
            Self::Search(SearchError::Validation(_)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            Self::Search(SearchError::Embedding(error)) => classify_embedding(error),
            Self::Search(SearchError::Store(_)) => (StatusCode::BAD_GATEWAY, "VECTOR_STORE_ERROR"),
            Self::Upload(UploadError::InvalidFileName(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_FILE_NAME")
            }
            Self::Upload(UploadError::InvalidFileType(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_FILE_TYPE")
            }
            Self::Upload(UploadError::EmptyFile) => (StatusCode::BAD_REQUEST, "EMPTY_FILE"),
            Self::Upload(UploadError::InvalidEncoding) => {
                (StatusCode::BAD_REQUEST, "INVALID_ENCODING")
            }
            Self::Upload(UploadError::AlreadyExists(_)) => (StatusCode::CONFLICT, "FILE_EXISTS"),
            Self::Upload(UploadError::Io(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
            }
            Self::Upload(UploadError::Indexing(error)) => match error.cause() {
                IndexingCause::Embedding(inner) => classify_embedding(inner),
                IndexingCause::Store(_) => (StatusCode::BAD_GATEWAY, "VECTOR_STORE_ERROR"),
                IndexingCause::EmptyFile => (StatusCode::BAD_REQUEST, "EMPTY_FILE"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "INDEXING_FAILED"),
            },
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Search(error) => error.to_string(),
            Self::Upload(error) => error.to_string(),
            Self::Rejected { message, .. } => message.clone(),
        }
    }
}

fn classify_embedding(error: &EmbeddingError) -> (StatusCode, &'static str) {
    if error.is_backend_failure() {
        (StatusCode::BAD_GATEWAY, "EMBEDDING_BACKEND_ERROR")
    } else {
        (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.classify();
        let message = self.message();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error_code, error = %message, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error_code, error = %message, "Request rejected");
        }
        let body = ErrorBody {
            error_code,
            message,
            status_code: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<SearchError> for AppError {
    fn from(inner: SearchError) -> Self {
        Self::Search(inner)
    }
}

impl From<UploadError> for AppError {
    fn from(inner: UploadError) -> Self {
        Self::Upload(inner)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{create_router, get_commands};
    use crate::embedding::EmbeddingError;
    use crate::metrics::MetricsSnapshot;
    use crate::processing::{
        FileReport, IndexingCause, IndexingError, IndexingStage, ProcessingApi, SearchError,
        SearchHit, UploadError, UploadOutcome,
    };
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
        response::Response,
    };
    use reqwest::StatusCode as UpstreamStatus;
    use serde_json::{Value, json};
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    #[tokio::test]
    async fn commands_catalog_exposes_search_endpoint() {
        let response = get_commands().await;
        let commands = response.0.commands;
        let search = commands
            .iter()
            .find(|cmd| cmd.name == "search")
            .expect("search command present");

        assert_eq!(search.method, "POST");
        assert_eq!(search.path, "/search");
        assert!(commands.iter().any(|cmd| cmd.name == "upload"));
        assert!(commands.len() >= 3);
    }

    #[tokio::test]
    async fn search_route_shapes_results_and_defaults_limit() {
        let service = Arc::new(StubProcessingService::default());
        let app = create_router(service.clone());

        let response = send(app, Method::POST, "/search", json!({ "query": "brown" })).await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["query"], "brown");
        assert_eq!(json["limit"], 10);
        assert_eq!(json["total_results"], 1);
        let result = &json["results"][0];
        assert_eq!(result["id"], "point-1");
        assert_eq!(result["metadata"]["file_name"], "fox.txt");
        assert_eq!(result["metadata"]["text_snippet"], "The quick brown fox jumps");
        assert_eq!(result["metadata"]["chunk_index"], 2);

        assert_eq!(
            service.searches.lock().await.clone(),
            vec![("brown".to_string(), 10)]
        );
    }

    #[tokio::test]
    async fn search_validation_errors_are_bad_requests() {
        let app = create_router(Arc::new(StubProcessingService::default()));

        let response = send(
            app,
            Method::POST,
            "/search",
            json!({ "query": "brown", "limit": 0 }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error_code"], "VALIDATION_ERROR");
        assert_eq!(json["status_code"], 400);
        assert!(json["message"].as_str().unwrap_or_default().contains("limit"));
    }

    #[tokio::test]
    async fn malformed_search_bodies_use_the_error_body() {
        let service = Arc::new(StubProcessingService::default());
        let cases = [
            (Body::from("{ not json"), StatusCode::BAD_REQUEST),
            (
                Body::from(json!({ "query": "brown", "limit": -1 }).to_string()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                Body::from(json!({ "limit": 3 }).to_string()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];
        for (body, status) in cases {
            let response = create_router(service.clone())
                .oneshot(
                    Request::builder()
                        .method(Method::POST)
                        .uri("/search")
                        .header("content-type", "application/json")
                        .body(body)
                        .expect("request"),
                )
                .await
                .expect("router response");

            assert_eq!(response.status(), status);
            let json = body_json(response).await;
            assert_eq!(json["error_code"], "INVALID_REQUEST");
            assert_eq!(json["status_code"], status.as_u16());
            assert!(!json["message"].as_str().unwrap_or_default().is_empty());
        }

        let response = create_router(service.clone())
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/search")
                    .body(Body::from(json!({ "query": "brown" }).to_string()))
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body_json(response).await["error_code"], "INVALID_REQUEST");

        assert!(service.searches.lock().await.is_empty());
    }

    #[tokio::test]
    async fn upload_route_passes_name_and_body() {
        let service = Arc::new(StubProcessingService::default());
        let app = create_router(service.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/upload?file_name=notes.txt")
                    .header("content-type", "text/plain")
                    .body(Body::from("Rivers and hills."))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["file_name"], "notes.txt");
        assert_eq!(json["file_path"], "data/notes.txt");
        assert_eq!(json["chunk_count"], 3);
        assert_eq!(json["inserted"], 3);
        assert_eq!(json["skipped"], 0);

        let uploads = service.uploads.lock().await.clone();
        assert_eq!(
            uploads,
            vec![("notes.txt".to_string(), b"Rivers and hills.".to_vec())]
        );
    }

    #[tokio::test]
    async fn upload_errors_map_to_statuses() {
        let cases = [
            ("exists.txt", StatusCode::CONFLICT, "FILE_EXISTS"),
            ("image.png", StatusCode::BAD_REQUEST, "INVALID_FILE_TYPE"),
            ("backend.txt", StatusCode::BAD_GATEWAY, "EMBEDDING_BACKEND_ERROR"),
        ];
        for (name, status, code) in cases {
            let app = create_router(Arc::new(StubProcessingService::default()));
            let response = app
                .oneshot(
                    Request::builder()
                        .method(Method::POST)
                        .uri(format!("/upload?file_name={name}"))
                        .body(Body::from("content"))
                        .expect("request"),
                )
                .await
                .expect("router response");

            assert_eq!(response.status(), status, "{name}");
            let json = body_json(response).await;
            assert_eq!(json["error_code"], code);
            assert_eq!(json["status_code"], status.as_u16());
        }
    }

    #[tokio::test]
    async fn index_route_starts_background_pass() {
        let service = Arc::new(StubProcessingService::default());
        let app = create_router(service.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/index")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let json = body_json(response).await;
        assert_eq!(json["status"], "started");
        assert_eq!(json["directory"], "data");
        assert_eq!(service.index_starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn metrics_route_returns_counters() {
        let app = create_router(Arc::new(StubProcessingService::default()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["files_indexed"], 4);
        assert_eq!(json["file_failures"], 1);
        assert_eq!(json["chunks_upserted"], 12);
        assert_eq!(json["chunks_skipped"], 3);
    }

    async fn send(app: axum::Router, method: Method, uri: &str, payload: Value) -> Response {
        app.oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .expect("request"),
        )
        .await
        .expect("router response")
    }

    async fn body_json(response: Response) -> Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json body")
    }

    #[derive(Default)]
    struct StubProcessingService {
        searches: Mutex<Vec<(String, usize)>>,
        uploads: Mutex<Vec<(String, Vec<u8>)>>,
        index_starts: AtomicUsize,
    }

    #[async_trait]
    impl ProcessingApi for StubProcessingService {
        async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError> {
            if limit == 0 {
                return Err(SearchError::Validation(
                    "limit must be between 1 and 100, got 0".into(),
                ));
            }
            self.searches.lock().await.push((query.to_string(), limit));
            Ok(vec![SearchHit {
                id: "point-1".into(),
                score: 0.87,
                file_name: "fox.txt".into(),
                file_path: "data/fox.txt".into(),
                chunk_index: 2,
                text_snippet: "The quick brown fox jumps".into(),
            }])
        }

        async fn index_upload(
            &self,
            file_name: &str,
            content: &[u8],
        ) -> Result<UploadOutcome, UploadError> {
            match file_name {
                "exists.txt" => return Err(UploadError::AlreadyExists(file_name.into())),
                "image.png" => return Err(UploadError::InvalidFileType(file_name.into())),
                "backend.txt" => {
                    return Err(UploadError::Indexing(IndexingError::new(
                        file_name,
                        IndexingStage::Embedding,
                        IndexingCause::Embedding(EmbeddingError::Backend {
                            status: UpstreamStatus::SERVICE_UNAVAILABLE,
                            body: "loading".into(),
                        }),
                    )));
                }
                _ => {}
            }
            self.uploads
                .lock()
                .await
                .push((file_name.to_string(), content.to_vec()));
            Ok(UploadOutcome {
                file_path: format!("data/{file_name}"),
                report: FileReport {
                    file_name: file_name.to_string(),
                    file_path: format!("data/{file_name}"),
                    chunk_count: 3,
                    inserted: 3,
                    skipped: 0,
                },
            })
        }

        fn start_directory_index(&self) -> PathBuf {
            self.index_starts.fetch_add(1, Ordering::SeqCst);
            PathBuf::from("data")
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                files_indexed: 4,
                file_failures: 1,
                chunks_upserted: 12,
                chunks_skipped: 3,
            }
        }
    }
}

//! HTTP surface.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/upload` | Multipart upload (`files`, optional `metadata`) |
//! | `GET`  | `/api/database/state` | Current `databaseState` snapshot |
//! | `GET`  | `/api/visualization` | Folder-tree view of stored files |
//! | `GET`  | `/api/search?q=…&k=…` | Semantic search (query string) |
//! | `POST` | `/api/search/semantic` | Semantic search (JSON body) |
//! | `GET`  | `/api/download?path=…` | Raw bytes of a stored file |
//! | `GET`  | `/api/health` | Liveness check |
//!
//! Error responses are `{ "success": false, "error": …, "code": … }`;
//! partially failed batches still return 200 with per-file `errors[]`.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use omnivault_core::{BatchReport, SearchHit, SearchSource};
use omnivault_ingest::IngestFile;

use crate::context::AppContext;
use crate::state::{database_state, visualization_tree, DatabaseState};

/// Uploads larger than this are rejected at the body layer.
const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// Default and maximum `k` for search requests.
const DEFAULT_K: usize = 10;
const MAX_K: usize = 50;

/// Run the server until the process is terminated.
pub async fn run_server(ctx: Arc<AppContext>, bind: &str) -> anyhow::Result<()> {
    let app = router(ctx);

    info!("Listening on http://{bind}");
    let listener = tokio::net::TcpListener::bind(bind).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the router; split out so tests can drive it in-process.
pub fn router(ctx: Arc<AppContext>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/upload", post(handle_upload))
        .route("/api/database/state", get(handle_database_state))
        .route("/api/visualization", get(handle_visualization))
        .route("/api/search", get(handle_search_query))
        .route("/api/search/semantic", post(handle_search_semantic))
        .route("/api/download", get(handle_download))
        .route("/api/health", get(handle_health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(ctx)
}

// ============================================================================
// Errors
// ============================================================================

/// Error envelope rendered as `{ success: false, error, code }`.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "NOT_FOUND",
            message: message.into(),
        }
    }

    fn internal(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "success": false,
            "error": self.message,
            "code": self.code,
        });
        (self.status, Json(body)).into_response()
    }
}

// ============================================================================
// POST /api/upload
// ============================================================================

#[derive(Serialize)]
struct UploadResponse {
    success: bool,
    message: String,
    processing: BatchReport,
    #[serde(rename = "databaseState")]
    database_state: DatabaseState,
}

async fn handle_upload(
    State(ctx): State<Arc<AppContext>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let staging = tempfile::tempdir()
        .map_err(|e| AppError::internal("STORAGE_WRITE_FAILED", e.to_string()))?;

    let mut files: Vec<IngestFile> = Vec::new();
    let mut metadata: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request("UNSUPPORTED_TYPE", format!("malformed multipart: {e}")))?
    {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("files") => {
                let original_name = field
                    .file_name()
                    .map(str::to_string)
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| format!("upload_{}", files.len()));
                let bytes = field.bytes().await.map_err(|e| {
                    AppError::bad_request("UNSUPPORTED_TYPE", format!("unreadable file part: {e}"))
                })?;

                // Stage under an index prefix so duplicate names in one
                // batch do not clobber each other.
                let staged = staging.path().join(format!("{}_{}", files.len(), original_name));
                tokio::fs::write(&staged, &bytes)
                    .await
                    .map_err(|e| AppError::internal("STORAGE_WRITE_FAILED", e.to_string()))?;
                files.push(IngestFile::new(staged, original_name));
            }
            Some("metadata") => {
                metadata = field.text().await.ok().filter(|s| !s.is_empty());
            }
            _ => {}
        }
    }

    if files.is_empty() {
        return Err(AppError::bad_request("UNSUPPORTED_TYPE", "No files provided"));
    }

    info!("/api/upload received {} files", files.len());
    let coordinator = ctx.coordinator();
    let report = coordinator.process_batch(&files, metadata.as_deref()).await;

    let database_state = database_state(&ctx)
        .await
        .map_err(|e| AppError::internal("METADATA_WRITE_FAILED", e.to_string()))?;

    Ok(Json(UploadResponse {
        success: true,
        message: format!("Processed {} files", report.total_files),
        processing: report,
        database_state,
    }))
}

// ============================================================================
// GET /api/database/state, GET /api/visualization
// ============================================================================

async fn handle_database_state(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<DatabaseState>, AppError> {
    let state = database_state(&ctx)
        .await
        .map_err(|e| AppError::internal("METADATA_WRITE_FAILED", e.to_string()))?;
    Ok(Json(state))
}

async fn handle_visualization(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<crate::state::TreeNode>, AppError> {
    let tree = visualization_tree(&ctx)
        .await
        .map_err(|e| AppError::internal("METADATA_WRITE_FAILED", e.to_string()))?;
    Ok(Json(tree))
}

// ============================================================================
// Search
// ============================================================================

#[derive(Deserialize)]
struct SearchQueryParams {
    q: Option<String>,
    k: Option<usize>,
}

#[derive(Deserialize)]
struct SemanticSearchBody {
    query: Option<String>,
    k: Option<usize>,
}

#[derive(Serialize)]
struct SearchResponseBody {
    success: bool,
    results: Vec<SearchHit>,
    source: SearchSource,
}

async fn handle_search_query(
    State(ctx): State<Arc<AppContext>>,
    Query(params): Query<SearchQueryParams>,
) -> Result<Json<SearchResponseBody>, AppError> {
    run_search(&ctx, params.q.as_deref(), params.k).await
}

async fn handle_search_semantic(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<SemanticSearchBody>,
) -> Result<Json<SearchResponseBody>, AppError> {
    run_search(&ctx, body.query.as_deref(), body.k).await
}

async fn run_search(
    ctx: &AppContext,
    query: Option<&str>,
    k: Option<usize>,
) -> Result<Json<SearchResponseBody>, AppError> {
    let query = query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::bad_request("QUERY_FAILED", "Query text is required"))?;
    let k = k.unwrap_or(DEFAULT_K).clamp(1, MAX_K);

    let response = ctx
        .search_engine()
        .search(query, k, None)
        .await
        .map_err(|e| {
            error!("Search failed: {e}");
            AppError::internal("QUERY_FAILED", e.to_string())
        })?;

    Ok(Json(SearchResponseBody {
        success: true,
        results: response.results,
        source: response.source,
    }))
}

// ============================================================================
// GET /api/download
// ============================================================================

#[derive(Deserialize)]
struct DownloadParams {
    path: Option<String>,
}

async fn handle_download(
    State(ctx): State<Arc<AppContext>>,
    Query(params): Query<DownloadParams>,
) -> Result<Response, AppError> {
    let relative = params
        .path
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::bad_request("INVALID_PATH", "Path parameter is required"))?;

    let target = ctx
        .layout
        .resolve_download(relative)
        .map_err(|e| AppError::bad_request("INVALID_PATH", e.to_string()))?;

    if !target.is_file() {
        return Err(AppError::not_found(format!("File not found: {relative}")));
    }

    let bytes = tokio::fs::read(&target)
        .await
        .map_err(|e| AppError::internal("STORAGE_WRITE_FAILED", e.to_string()))?;

    let mime = mime_guess::from_path(&target)
        .first_or_octet_stream()
        .to_string();
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());

    Ok((
        [
            (header::CONTENT_TYPE, mime),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

// ============================================================================
// GET /api/health
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

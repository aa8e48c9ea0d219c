//! HTTP API server.
//!
//! Exposes the document-analysis service as a JSON HTTP API for browser
//! and tool clients.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/workspaces` | Create a workspace |
//! | `GET`  | `/workspaces` | List workspaces with document counts |
//! | `GET`  | `/workspaces/{id}` | Workspace detail plus its documents |
//! | `PUT`  | `/workspaces/{id}` | Rename / re-describe a workspace |
//! | `DELETE` | `/workspaces/{id}` | Delete a workspace (documents survive) |
//! | `POST` | `/upload` | Upload one file (multipart `file`) |
//! | `POST` | `/upload-multiple` | Upload a batch (multipart `files`) |
//! | `GET`  | `/documents` | List documents, optionally by workspace |
//! | `GET`  | `/documents/{id}` | Document metadata |
//! | `DELETE` | `/documents/{id}` | Delete a document (history survives) |
//! | `PUT`  | `/documents/{id}/workspace` | Assign / un-assign workspace |
//! | `GET`  | `/suggest/{id}` | Suggestions, generated on demand |
//! | `POST` | `/analyze` | Run one analysis type |
//! | `POST` | `/analyze-upload` | Upload a file and analyze it in one call |
//! | `POST` | `/analyze-all` | Run all six types, failures isolated |
//! | `POST` | `/report` | Shortcut: analyze as `report` |
//! | `POST` | `/slides` | Shortcut: analyze as `slides` |
//! | `GET`  | `/analysis/{id}` | Analysis history for a document |
//! | `GET`  | `/export/{id}` | Export history as `?format=json\|csv` |
//! | `POST` | `/compare` | Compare two or more documents |
//! | `GET`  | `/comparisons` | Comparison history |
//! | `POST` | `/decision-matrix` | Build a weighted decision matrix |
//! | `GET`  | `/decision-matrices` | Matrix history |
//! | `POST` | `/qa` | Question over one or more documents |
//! | `GET`  | `/qa-history` | Recent Q&A exchanges (`?limit=`) |
//! | `POST` | `/charts` | Generate a chart from one document |
//! | `GET`  | `/charts/{id}` | Charts generated for a document |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "validation", "message": "workspace name must not be empty" } }
//! ```
//!
//! Error codes: `validation` (400), `unsupported_type` (400), `not_found`
//! (404), `size_limit` (413), `extract` (422), `oracle` (502),
//! `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser
//! clients.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::AppError;
use crate::export::{self, ExportFormat};
use crate::models::{AnalysisType, ChartType, Criterion};
use crate::oracle::{self, AnalysisOracle};
use crate::{aggregate, analysis, db, documents, history, migrate};

/// Hard cap on request bodies. The per-file limit from `[upload]` is
/// enforced in the documents service; this only keeps multipart parsing
/// bounded.
const BODY_LIMIT_BYTES: usize = 64 * 1024 * 1024;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    pool: sqlx::SqlitePool,
    oracle: Arc<dyn AnalysisOracle>,
    config: Arc<Config>,
}

/// Starts the HTTP server: connects the database, applies migrations,
/// builds the configured oracle, and serves until the process ends.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(&config.db.path).await?;
    migrate::run_migrations(&pool).await?;

    let oracle = oracle::create_oracle(&config.oracle)?;

    let bind_addr = config.server.bind.clone();
    let app = router(pool, oracle, Arc::new(config.clone()));

    tracing::info!(bind = %bind_addr, "server listening");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the application router over an already-connected pool and
/// oracle. Split out of [`run_server`] so tests can serve it on an
/// ephemeral port.
pub fn router(
    pool: sqlx::SqlitePool,
    oracle: Arc<dyn AnalysisOracle>,
    config: Arc<Config>,
) -> Router {
    let state = AppState {
        pool,
        oracle,
        config,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/workspaces", post(handle_create_workspace))
        .route("/workspaces", get(handle_list_workspaces))
        .route("/workspaces/{id}", get(handle_get_workspace))
        .route("/workspaces/{id}", put(handle_update_workspace))
        .route("/workspaces/{id}", delete(handle_delete_workspace))
        .route("/upload", post(handle_upload))
        .route("/upload-multiple", post(handle_upload_multiple))
        .route("/documents", get(handle_list_documents))
        .route("/documents/{id}", get(handle_get_document))
        .route("/documents/{id}", delete(handle_delete_document))
        .route("/documents/{id}/workspace", put(handle_assign_workspace))
        .route("/suggest/{id}", get(handle_get_suggestions))
        .route("/analyze", post(handle_analyze))
        .route("/analyze-upload", post(handle_analyze_upload))
        .route("/analyze-all", post(handle_analyze_all))
        .route("/report", post(handle_report))
        .route("/slides", post(handle_slides))
        .route("/analysis/{id}", get(handle_analysis_history))
        .route("/export/{id}", get(handle_export))
        .route("/compare", post(handle_compare))
        .route("/comparisons", get(handle_list_comparisons))
        .route("/decision-matrix", post(handle_decision_matrix))
        .route("/decision-matrices", get(handle_list_matrices))
        .route("/qa", post(handle_qa))
        .route("/qa-history", get(handle_qa_history))
        .route("/charts", post(handle_chart))
        .route("/charts/{id}", get(handle_list_charts))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) | AppError::UnsupportedType(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::SizeLimit { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Extract(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Oracle(_) => StatusCode::BAD_GATEWAY,
            AppError::Db(_) | AppError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "internal error");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

type HandlerResult<T> = std::result::Result<T, AppError>;

// ============ Workspaces ============

#[derive(Deserialize)]
struct CreateWorkspaceRequest {
    name: String,
    #[serde(default)]
    description: Option<String>,
}

async fn handle_create_workspace(
    State(state): State<AppState>,
    Json(req): Json<CreateWorkspaceRequest>,
) -> HandlerResult<Response> {
    let workspace =
        documents::create_workspace(&state.pool, &req.name, req.description.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(workspace)).into_response())
}

async fn handle_list_workspaces(State(state): State<AppState>) -> HandlerResult<Response> {
    let workspaces = documents::list_workspaces(&state.pool).await?;
    Ok(Json(workspaces).into_response())
}

async fn handle_get_workspace(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HandlerResult<Response> {
    let detail = documents::get_workspace(&state.pool, &id).await?;
    Ok(Json(detail).into_response())
}

#[derive(Deserialize)]
struct UpdateWorkspaceRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

async fn handle_update_workspace(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateWorkspaceRequest>,
) -> HandlerResult<Response> {
    let workspace = documents::update_workspace(
        &state.pool,
        &id,
        req.name.as_deref(),
        req.description.as_deref(),
    )
    .await?;
    Ok(Json(workspace).into_response())
}

async fn handle_delete_workspace(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HandlerResult<Response> {
    documents::delete_workspace(&state.pool, &id).await?;
    Ok(Json(serde_json::json!({ "deleted": id })).into_response())
}

// ============ Documents ============

struct MultipartUpload {
    files: Vec<(String, Vec<u8>)>,
    workspace_id: Option<String>,
    analysis_type: Option<String>,
    auto_analyze: bool,
}

async fn text_field(field: axum::extract::multipart::Field<'_>) -> HandlerResult<Option<String>> {
    let name = field.name().unwrap_or_default().to_string();
    let value = field
        .text()
        .await
        .map_err(|e| AppError::validation(format!("bad {} field: {}", name, e)))?;
    Ok(if value.is_empty() { None } else { Some(value) })
}

async fn read_multipart(mut multipart: Multipart) -> HandlerResult<MultipartUpload> {
    let mut files = Vec::new();
    let mut workspace_id = None;
    let mut analysis_type = None;
    let mut auto_analyze = true;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("malformed multipart body: {}", e)))?
    {
        match field.name() {
            Some("file") | Some("files") => {
                let filename = field
                    .file_name()
                    .ok_or_else(|| AppError::validation("file field is missing a filename"))?
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(format!("failed to read file: {}", e)))?;
                files.push((filename, bytes.to_vec()));
            }
            Some("workspace_id") => workspace_id = text_field(field).await?,
            Some("analysis_type") => analysis_type = text_field(field).await?,
            Some("auto_analyze") => {
                if let Some(value) = text_field(field).await? {
                    auto_analyze = value.parse::<bool>().map_err(|_| {
                        AppError::validation(format!("bad auto_analyze field: {}", value))
                    })?;
                }
            }
            _ => {}
        }
    }

    Ok(MultipartUpload {
        files,
        workspace_id,
        analysis_type,
        auto_analyze,
    })
}

async fn handle_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> HandlerResult<Response> {
    let upload = read_multipart(multipart).await?;
    let (filename, bytes) = upload
        .files
        .into_iter()
        .next()
        .ok_or_else(|| AppError::validation("no file provided"))?;

    let document = documents::upload_document(
        &state.pool,
        state.oracle.clone(),
        state.config.upload.max_bytes,
        &filename,
        &bytes,
        upload.workspace_id.as_deref(),
        upload.auto_analyze,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(document)).into_response())
}

/// Upload one file and immediately run a single analysis on it. The
/// multipart `analysis_type` field defaults to `summarize`.
async fn handle_analyze_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> HandlerResult<Response> {
    let upload = read_multipart(multipart).await?;
    let (filename, bytes) = upload
        .files
        .into_iter()
        .next()
        .ok_or_else(|| AppError::validation("no file provided"))?;

    let type_name = upload
        .analysis_type
        .unwrap_or_else(|| "summarize".to_string());
    let analysis_type = AnalysisType::parse(&type_name)
        .ok_or_else(|| AppError::validation(format!("unknown analysis type: {}", type_name)))?;

    let document = documents::upload_document(
        &state.pool,
        state.oracle.clone(),
        state.config.upload.max_bytes,
        &filename,
        &bytes,
        upload.workspace_id.as_deref(),
        upload.auto_analyze,
    )
    .await?;

    let record =
        analysis::analyze(&state.pool, state.oracle.as_ref(), &document.id, analysis_type).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "document": document,
            "analysis": record,
        })),
    )
        .into_response())
}

async fn handle_upload_multiple(
    State(state): State<AppState>,
    multipart: Multipart,
) -> HandlerResult<Response> {
    let upload = read_multipart(multipart).await?;
    if upload.files.is_empty() {
        return Err(AppError::validation("no files provided"));
    }

    let outcomes = documents::upload_many(
        &state.pool,
        state.oracle.clone(),
        state.config.upload.max_bytes,
        upload.files,
        upload.workspace_id.as_deref(),
        upload.auto_analyze,
    )
    .await?;

    Ok(Json(outcomes).into_response())
}

#[derive(Deserialize)]
struct ListDocumentsQuery {
    #[serde(default)]
    workspace_id: Option<String>,
}

async fn handle_list_documents(
    State(state): State<AppState>,
    Query(query): Query<ListDocumentsQuery>,
) -> HandlerResult<Response> {
    let docs = documents::list_documents(&state.pool, query.workspace_id.as_deref()).await?;
    Ok(Json(docs).into_response())
}

async fn handle_get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HandlerResult<Response> {
    let document = documents::get_document(&state.pool, &id).await?;
    Ok(Json(document).into_response())
}

async fn handle_delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HandlerResult<Response> {
    documents::delete_document(&state.pool, &id).await?;
    Ok(Json(serde_json::json!({ "deleted": id })).into_response())
}

#[derive(Deserialize)]
struct AssignWorkspaceRequest {
    #[serde(default)]
    workspace_id: Option<String>,
}

async fn handle_assign_workspace(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AssignWorkspaceRequest>,
) -> HandlerResult<Response> {
    let document =
        documents::assign_document(&state.pool, &id, req.workspace_id.as_deref()).await?;
    Ok(Json(document).into_response())
}

/// Returns suggestions for a document, running the classification pass
/// on demand when the upload-time pass has not stored one yet.
async fn handle_get_suggestions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HandlerResult<Response> {
    let suggestions = analysis::suggestions_for(&state.pool, state.oracle.as_ref(), &id).await?;
    Ok(Json(serde_json::json!({
        "document_id": id,
        "suggestions": suggestions,
    }))
    .into_response())
}

// ============ Analysis ============

#[derive(Deserialize)]
struct AnalyzeRequest {
    document_id: String,
    analysis_type: String,
}

async fn handle_analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> HandlerResult<Response> {
    let analysis_type = AnalysisType::parse(&req.analysis_type).ok_or_else(|| {
        AppError::validation(format!("unknown analysis type: {}", req.analysis_type))
    })?;

    let record = analysis::analyze(
        &state.pool,
        state.oracle.as_ref(),
        &req.document_id,
        analysis_type,
    )
    .await?;
    Ok(Json(record).into_response())
}

#[derive(Deserialize)]
struct AnalyzeAllRequest {
    document_id: String,
}

async fn handle_analyze_all(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeAllRequest>,
) -> HandlerResult<Response> {
    let entries =
        analysis::run_comprehensive(&state.pool, state.oracle.as_ref(), &req.document_id).await?;
    Ok(Json(serde_json::json!({
        "document_id": req.document_id,
        "results": entries,
    }))
    .into_response())
}

async fn handle_analysis_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HandlerResult<Response> {
    let records = analysis::get_history(&state.pool, &id).await?;
    Ok(Json(records).into_response())
}

#[derive(Deserialize)]
struct ShortcutRequest {
    document_id: String,
}

/// `POST /report`: single analysis with the type forced to `report`.
async fn handle_report(
    State(state): State<AppState>,
    Json(req): Json<ShortcutRequest>,
) -> HandlerResult<Response> {
    let record = analysis::analyze(
        &state.pool,
        state.oracle.as_ref(),
        &req.document_id,
        AnalysisType::Report,
    )
    .await?;
    Ok(Json(record).into_response())
}

/// `POST /slides`: single analysis with the type forced to `slides`.
async fn handle_slides(
    State(state): State<AppState>,
    Json(req): Json<ShortcutRequest>,
) -> HandlerResult<Response> {
    let record = analysis::analyze(
        &state.pool,
        state.oracle.as_ref(),
        &req.document_id,
        AnalysisType::Slides,
    )
    .await?;
    Ok(Json(record).into_response())
}

#[derive(Deserialize)]
struct ExportQuery {
    #[serde(default = "default_export_format")]
    format: String,
}

fn default_export_format() -> String {
    "json".to_string()
}

async fn handle_export(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> HandlerResult<Response> {
    let format = ExportFormat::parse(&query.format)
        .ok_or_else(|| AppError::validation(format!("unknown export format: {}", query.format)))?;

    let payload = export::export_analyses(&state.pool, &id, format).await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, payload.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", payload.filename),
            ),
        ],
        payload.body,
    )
        .into_response())
}

// ============ Aggregate operations ============

#[derive(Deserialize)]
struct CompareRequest {
    document_ids: Vec<String>,
}

async fn handle_compare(
    State(state): State<AppState>,
    Json(req): Json<CompareRequest>,
) -> HandlerResult<Response> {
    let comparison =
        aggregate::compare(&state.pool, state.oracle.as_ref(), &req.document_ids).await?;
    Ok(Json(comparison).into_response())
}

async fn handle_list_comparisons(State(state): State<AppState>) -> HandlerResult<Response> {
    let comparisons = history::list_comparisons(&state.pool).await?;
    Ok(Json(comparisons).into_response())
}

#[derive(Deserialize)]
struct DecisionMatrixRequest {
    name: String,
    document_ids: Vec<String>,
    criteria: Vec<Criterion>,
}

async fn handle_decision_matrix(
    State(state): State<AppState>,
    Json(req): Json<DecisionMatrixRequest>,
) -> HandlerResult<Response> {
    let matrix = aggregate::build_decision_matrix(
        &state.pool,
        state.oracle.as_ref(),
        &req.name,
        &req.document_ids,
        &req.criteria,
    )
    .await?;
    Ok(Json(matrix).into_response())
}

async fn handle_list_matrices(State(state): State<AppState>) -> HandlerResult<Response> {
    let matrices = history::list_decision_matrices(&state.pool).await?;
    Ok(Json(matrices).into_response())
}

#[derive(Deserialize)]
struct AskRequest {
    document_ids: Vec<String>,
    question: String,
}

async fn handle_qa(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> HandlerResult<Response> {
    let record = aggregate::ask(
        &state.pool,
        state.oracle.as_ref(),
        &req.document_ids,
        &req.question,
    )
    .await?;
    Ok(Json(record).into_response())
}

#[derive(Deserialize)]
struct QaHistoryQuery {
    #[serde(default)]
    limit: Option<i64>,
}

async fn handle_qa_history(
    State(state): State<AppState>,
    Query(query): Query<QaHistoryQuery>,
) -> HandlerResult<Response> {
    let records = history::list_qa_history(&state.pool, query.limit).await?;
    Ok(Json(records).into_response())
}

#[derive(Deserialize)]
struct ChartRequest {
    document_id: String,
    chart_type: String,
}

async fn handle_chart(
    State(state): State<AppState>,
    Json(req): Json<ChartRequest>,
) -> HandlerResult<Response> {
    let chart_type = ChartType::parse(&req.chart_type)
        .ok_or_else(|| AppError::validation(format!("unknown chart type: {}", req.chart_type)))?;

    let record = aggregate::generate_chart(
        &state.pool,
        state.oracle.as_ref(),
        &req.document_id,
        chart_type,
    )
    .await?;
    Ok(Json(record).into_response())
}

async fn handle_list_charts(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HandlerResult<Response> {
    let charts = history::list_charts(&state.pool, &id).await?;
    Ok(Json(charts).into_response())
}

// ============ Health ============

async fn handle_health() -> Response {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
    .into_response()
}

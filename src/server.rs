//! HTTP server.
//!
//! Serves the HTML pages (home, document list, upload form, FAQ page) plus
//! two JSON endpoints (`/jobs/{id}` for polling generation jobs, `/health`).
//!
//! Flash messages are carried through redirects as a `flash` query parameter
//! holding a short code; the code is translated to display text server-side,
//! and unknown codes render nothing.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Home page with recent documents |
//! | `GET`  | `/documents` | Document list with FAQ counts and job state |
//! | `GET`  | `/upload` | Upload form |
//! | `POST` | `/upload` | Multipart upload handler (single file field) |
//! | `GET`  | `/faq?document_id={id}` | Up to ten FAQs for a document |
//! | `POST` | `/faq?document_id={id}` | Enqueue a generation job |
//! | `GET`  | `/jobs/{id}` | Generation job state as JSON |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! JSON error responses use the shape
//! `{ "error": { "code": "not_found", "message": "..." } }`.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tera::Tera;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use crate::config::Config;
use crate::db;
use crate::documents;
use crate::jobs;
use crate::migrate;
use crate::models::{format_ts_iso, JobState};
use crate::templates;
use crate::upload::store_upload;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    pool: sqlx::SqlitePool,
    tera: Arc<Tera>,
}

/// Starts the HTTP server on `[server].bind` and runs until the process is
/// terminated.
///
/// Startup runs the schema migrations (idempotent) and fails any generation
/// jobs left queued or running by a previous process.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();

    let pool = db::connect(&config.db.path).await?;
    migrate::run_migrations(&pool).await?;
    jobs::recover_stale_jobs(&pool).await?;

    let state = AppState {
        config: Arc::new(config.clone()),
        pool,
        tera: Arc::new(templates::build_tera()?),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(handle_home))
        .route("/documents", get(handle_documents))
        .route("/upload", get(handle_upload_form).post(handle_upload))
        .route("/faq", get(handle_faq).post(handle_generate))
        .route("/jobs/{id}", get(handle_job))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(state.config.uploads.max_upload_bytes))
        .layer(cors)
        .with_state(state);

    println!("faqgen listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Constructs a 400 Bad Request error.
fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

/// Constructs a 404 Not Found error.
fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

/// Constructs a 500 error and logs the underlying failure.
fn internal(err: anyhow::Error) -> AppError {
    error!("request failed: {:#}", err);
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: err.to_string(),
    }
}

// ============ Flash messages ============

/// Translate a flash code carried through a redirect into display text.
/// Unknown codes render nothing.
fn flash_message(code: &str) -> Option<&'static str> {
    match code {
        "missing_file" => Some("Choose a PDF file to upload."),
        "upload_ok" => Some("Upload complete."),
        "upload_dup" => Some("That file was already uploaded; showing the existing document."),
        "started" => Some("FAQ generation started."),
        "job_running" => Some("A generation job is already running for this document."),
        "unknown_document" => Some("That document does not exist."),
        _ => None,
    }
}

#[derive(Deserialize)]
struct PageQuery {
    flash: Option<String>,
}

#[derive(Deserialize)]
struct FaqQuery {
    document_id: Option<String>,
    flash: Option<String>,
}

fn page_context(flash_code: &Option<String>) -> tera::Context {
    let flash = flash_code.as_deref().and_then(flash_message);
    let mut ctx = tera::Context::new();
    ctx.insert("flash", &flash);
    ctx
}

fn render_page(state: &AppState, name: &str, ctx: &tera::Context) -> Result<Html<String>, AppError> {
    state
        .tera
        .render(name, ctx)
        .map(Html)
        .map_err(|e| internal(e.into()))
}

// ============ HTML pages ============

/// Handler for `GET /`.
async fn handle_home(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let docs = documents::list_documents(&state.pool)
        .await
        .map_err(internal)?;
    let recent: Vec<serde_json::Value> = docs
        .iter()
        .take(5)
        .map(|d| json!({"id": d.id, "filename": d.filename, "faq_count": d.faq_count}))
        .collect();

    let mut ctx = page_context(&q.flash);
    ctx.insert("documents", &recent);
    render_page(&state, "home.html", &ctx)
}

/// Handler for `GET /documents`.
async fn handle_documents(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let docs = documents::list_documents(&state.pool)
        .await
        .map_err(internal)?;
    let rows: Vec<serde_json::Value> = docs
        .iter()
        .map(|d| {
            json!({
                "id": d.id,
                "filename": d.filename,
                "uploaded_at": format_ts_iso(d.uploaded_at),
                "faq_count": d.faq_count,
                "last_job_state": d.last_job_state.as_deref().unwrap_or("-"),
            })
        })
        .collect();

    let mut ctx = page_context(&q.flash);
    ctx.insert("documents", &rows);
    render_page(&state, "documents.html", &ctx)
}

/// Handler for `GET /upload`.
async fn handle_upload_form(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let mut ctx = page_context(&q.flash);
    ctx.insert(
        "max_upload_mb",
        &(state.config.uploads.max_upload_bytes / (1024 * 1024)),
    );
    render_page(&state, "upload.html", &ctx)
}

/// Handler for `POST /upload`.
///
/// Reads the first multipart field that carries a filename, stores it, and
/// redirects to the document's FAQ page. A missing or empty file redirects
/// back to the form with a flash message instead of failing.
async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Redirect, AppError> {
    let mut picked: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(e.to_string()))?
    {
        let Some(name) = field.file_name().map(|s| s.to_string()) else {
            continue;
        };
        if name.trim().is_empty() {
            continue;
        }
        let data = field
            .bytes()
            .await
            .map_err(|e| bad_request(e.to_string()))?;
        picked = Some((name, data.to_vec()));
        break;
    }

    let Some((name, bytes)) = picked else {
        return Ok(Redirect::to("/upload?flash=missing_file"));
    };
    if bytes.is_empty() {
        return Ok(Redirect::to("/upload?flash=missing_file"));
    }

    let stored = store_upload(&state.config, &state.pool, &name, &bytes)
        .await
        .map_err(internal)?;
    let code = if stored.created {
        "upload_ok"
    } else {
        "upload_dup"
    };
    Ok(Redirect::to(&format!(
        "/faq?document_id={}&flash={}",
        stored.id, code
    )))
}

/// Handler for `GET /faq`.
///
/// Renders up to ten FAQ rows for the document plus the newest generation
/// job. An unknown or missing document id renders the page with a flash
/// message and an empty list, not an error page.
async fn handle_faq(
    State(state): State<AppState>,
    Query(q): Query<FaqQuery>,
) -> Result<Html<String>, AppError> {
    let mut ctx = page_context(&q.flash);

    let mut document = None;
    let mut faqs = Vec::new();
    let mut job = None;
    if let Some(ref id) = q.document_id {
        match documents::get_document(&state.pool, id)
            .await
            .map_err(internal)?
        {
            Some(doc) => {
                faqs = documents::list_faqs(&state.pool, &doc.id, documents::FAQ_PAGE_LIMIT)
                    .await
                    .map_err(internal)?;
                job = jobs::latest_job(&state.pool, &doc.id)
                    .await
                    .map_err(internal)?;
                document = Some(doc);
            }
            None => {
                ctx.insert("flash", &flash_message("unknown_document"));
            }
        }
    }

    let job_live = job.as_ref().map(|j| j.state.is_live()).unwrap_or(false);
    ctx.insert("document", &document);
    ctx.insert("faqs", &faqs);
    ctx.insert("job", &job);
    ctx.insert("job_live", &job_live);
    render_page(&state, "faq.html", &ctx)
}

/// Handler for `POST /faq`.
///
/// Enqueues a background generation job for the document and redirects back
/// to the FAQ page. Refused with a flash message when the document is
/// unknown or already has a live job.
async fn handle_generate(
    State(state): State<AppState>,
    Query(q): Query<FaqQuery>,
) -> Result<Redirect, AppError> {
    let Some(id) = q.document_id else {
        return Ok(Redirect::to("/faq?flash=unknown_document"));
    };

    let doc = match documents::get_document(&state.pool, &id)
        .await
        .map_err(internal)?
    {
        Some(doc) => doc,
        None => {
            return Ok(Redirect::to(&format!(
                "/faq?document_id={}&flash=unknown_document",
                id
            )));
        }
    };

    // The enqueue itself refuses when a live job exists, so two concurrent
    // POSTs cannot both start a runner.
    let Some(job_id) = jobs::enqueue(&state.pool, &doc.id)
        .await
        .map_err(internal)?
    else {
        return Ok(Redirect::to(&format!(
            "/faq?document_id={}&flash=job_running",
            doc.id
        )));
    };
    jobs::spawn_runner(
        state.config.clone(),
        state.pool.clone(),
        job_id,
        doc.id.clone(),
    );

    Ok(Redirect::to(&format!(
        "/faq?document_id={}&flash=started",
        doc.id
    )))
}

// ============ JSON endpoints ============

/// JSON response body for `GET /jobs/{id}`.
#[derive(Serialize)]
struct JobResponse {
    id: String,
    document_id: String,
    state: JobState,
    error: Option<String>,
    faq_count: Option<i64>,
    created_at: String, // ISO8601
    updated_at: String, // ISO8601
}

/// Handler for `GET /jobs/{id}` — poll a generation job.
async fn handle_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobResponse>, AppError> {
    let job = jobs::get_job(&state.pool, &id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(format!("no job with id: {}", id)))?;

    Ok(Json(JobResponse {
        id: job.id,
        document_id: job.document_id,
        state: job.state,
        error: job.error,
        faq_count: job.faq_count,
        created_at: format_ts_iso(job.created_at),
        updated_at: format_ts_iso(job.updated_at),
    }))
}

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Handler for `GET /health`.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

//! Background generation jobs.
//!
//! The web surface never runs the pipeline inside a request handler. A POST
//! enqueues a job row, spawns the runner on the runtime, and redirects;
//! clients poll `GET /jobs/{id}` for the outcome. At most one live (queued
//! or running) job is allowed per document.

use anyhow::Result;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::generate;
use crate::models::{GenerationJob, JobState};

fn row_to_job(row: &sqlx::sqlite::SqliteRow) -> GenerationJob {
    let state: String = row.get("state");
    GenerationJob {
        id: row.get("id"),
        document_id: row.get("document_id"),
        state: JobState::parse(&state).unwrap_or(JobState::Failed),
        error: row.get("error"),
        faq_count: row.get("faq_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Insert a queued job for a document and return its id, unless the
/// document already has a live (queued or running) job.
///
/// The guard lives inside the insert statement, so two concurrent requests
/// for the same document cannot both enqueue: one insert affects zero rows
/// and comes back as `None`.
pub async fn enqueue(pool: &SqlitePool, document_id: &str) -> Result<Option<String>> {
    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().timestamp();
    let result = sqlx::query(
        r#"
        INSERT INTO generation_jobs (id, document_id, state, error, faq_count, created_at, updated_at)
        SELECT ?, ?, 'queued', NULL, NULL, ?, ?
        WHERE NOT EXISTS (
            SELECT 1 FROM generation_jobs
            WHERE document_id = ? AND state IN ('queued', 'running')
        )
        "#,
    )
    .bind(&id)
    .bind(document_id)
    .bind(now)
    .bind(now)
    .bind(document_id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }
    info!(job_id = %id, document_id, "job queued");
    Ok(Some(id))
}

/// Fetch one job by id.
pub async fn get_job(pool: &SqlitePool, id: &str) -> Result<Option<GenerationJob>> {
    let row = sqlx::query(
        "SELECT id, document_id, state, error, faq_count, created_at, updated_at FROM generation_jobs WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.as_ref().map(row_to_job))
}

/// The newest job for a document regardless of state.
pub async fn latest_job(pool: &SqlitePool, document_id: &str) -> Result<Option<GenerationJob>> {
    let row = sqlx::query(
        r#"
        SELECT id, document_id, state, error, faq_count, created_at, updated_at
        FROM generation_jobs
        WHERE document_id = ?
        ORDER BY created_at DESC, id LIMIT 1
        "#,
    )
    .bind(document_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.as_ref().map(row_to_job))
}

async fn mark_running(pool: &SqlitePool, id: &str) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query("UPDATE generation_jobs SET state = 'running', updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    info!(job_id = %id, "job running");
    Ok(())
}

async fn mark_done(pool: &SqlitePool, id: &str, faq_count: i64) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query(
        "UPDATE generation_jobs SET state = 'done', faq_count = ?, updated_at = ? WHERE id = ?",
    )
    .bind(faq_count)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    info!(job_id = %id, faq_count, "job done");
    Ok(())
}

async fn mark_failed(pool: &SqlitePool, id: &str, error: &str) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query(
        "UPDATE generation_jobs SET state = 'failed', error = ?, updated_at = ? WHERE id = ?",
    )
    .bind(error)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    error!(job_id = %id, error, "job failed");
    Ok(())
}

/// Run a queued job on the runtime and return immediately.
///
/// Pipeline failures land on the job row as `failed`; only bookkeeping
/// errors (the job row itself is unwritable) surface in the log.
pub fn spawn_runner(config: Arc<Config>, pool: SqlitePool, job_id: String, document_id: String) {
    tokio::spawn(async move {
        if let Err(e) = run_job(&config, &pool, &job_id, &document_id).await {
            error!(job_id = %job_id, error = %e, "job bookkeeping failed");
        }
    });
}

async fn run_job(
    config: &Config,
    pool: &SqlitePool,
    job_id: &str,
    document_id: &str,
) -> Result<()> {
    mark_running(pool, job_id).await?;
    match generate::generate_faqs(config, pool, document_id, None).await {
        Ok(report) => mark_done(pool, job_id, report.recovered as i64).await,
        Err(e) => mark_failed(pool, job_id, &format!("{:#}", e)).await,
    }
}

/// Mark jobs left queued or running by a previous process as failed.
///
/// Called once at serve startup; a job cannot survive its runtime.
pub async fn recover_stale_jobs(pool: &SqlitePool) -> Result<u64> {
    let now = chrono::Utc::now().timestamp();
    let result = sqlx::query(
        r#"
        UPDATE generation_jobs
        SET state = 'failed', error = 'interrupted by restart', updated_at = ?
        WHERE state IN ('queued', 'running')
        "#,
    )
    .bind(now)
    .execute(pool)
    .await?;
    let recovered = result.rows_affected();
    if recovered > 0 {
        warn!(recovered, "marked stale jobs from a previous run as failed");
    }
    Ok(recovered)
}

//! Document and FAQ queries.
//!
//! Shared by the CLI commands and the HTTP handlers, so both surfaces show
//! the same rows.

use anyhow::{bail, Result};
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;
use crate::models::{format_ts_iso, Document, Faq};

/// How many FAQ rows the FAQ page and `faqs` command display.
pub const FAQ_PAGE_LIMIT: i64 = 10;

/// One row of the document listing, with FAQ count and the state of the
/// newest generation job attached.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub id: String,
    pub filename: String,
    pub uploaded_at: i64,
    pub faq_count: i64,
    pub last_job_state: Option<String>,
}

/// List all documents, newest upload first.
pub async fn list_documents(pool: &SqlitePool) -> Result<Vec<DocumentSummary>> {
    let rows = sqlx::query(
        r#"
        SELECT d.id, d.filename, d.uploaded_at,
               (SELECT COUNT(*) FROM faqs f WHERE f.document_id = d.id) AS faq_count,
               (SELECT j.state FROM generation_jobs j WHERE j.document_id = d.id
                ORDER BY j.created_at DESC, j.id LIMIT 1) AS last_job_state
        FROM documents d
        ORDER BY d.uploaded_at DESC, d.id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| DocumentSummary {
            id: row.get("id"),
            filename: row.get("filename"),
            uploaded_at: row.get("uploaded_at"),
            faq_count: row.get("faq_count"),
            last_job_state: row.get("last_job_state"),
        })
        .collect())
}

/// Fetch one document by id.
pub async fn get_document(pool: &SqlitePool, id: &str) -> Result<Option<Document>> {
    let row = sqlx::query(
        "SELECT id, filename, stored_path, content_hash, uploaded_at FROM documents WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| Document {
        id: row.get("id"),
        filename: row.get("filename"),
        stored_path: row.get("stored_path"),
        content_hash: row.get("content_hash"),
        uploaded_at: row.get("uploaded_at"),
    }))
}

/// Fetch up to `limit` FAQ rows for a document, ordered by the ordinal the
/// model assigned. Duplicate or gapped ordinals are shown as stored.
pub async fn list_faqs(pool: &SqlitePool, document_id: &str, limit: i64) -> Result<Vec<Faq>> {
    let rows = sqlx::query(
        r#"
        SELECT id, document_id, number, question, answer, updated_at
        FROM faqs WHERE document_id = ?
        ORDER BY number ASC, updated_at ASC LIMIT ?
        "#,
    )
    .bind(document_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| Faq {
            id: row.get("id"),
            document_id: row.get("document_id"),
            number: row.get("number"),
            question: row.get("question"),
            answer: row.get("answer"),
            updated_at: row.get("updated_at"),
        })
        .collect())
}

/// CLI entry point for `faqgen documents`.
pub async fn run_documents(config: &Config) -> Result<()> {
    let pool = db::connect(&config.db.path).await?;
    let docs = list_documents(&pool).await?;
    pool.close().await;

    if docs.is_empty() {
        println!("no documents uploaded yet");
        return Ok(());
    }

    println!(
        "{:<36}  {:<32} {:>5}  {:<8}  UPLOADED",
        "ID", "FILENAME", "FAQS", "JOB"
    );
    for doc in &docs {
        println!(
            "{:<36}  {:<32} {:>5}  {:<8}  {}",
            doc.id,
            doc.filename,
            doc.faq_count,
            doc.last_job_state.as_deref().unwrap_or("-"),
            format_ts_iso(doc.uploaded_at)
        );
    }

    Ok(())
}

/// CLI entry point for `faqgen faqs <document-id>`.
pub async fn run_faqs(config: &Config, document_id: &str) -> Result<()> {
    let pool = db::connect(&config.db.path).await?;

    let doc = match get_document(&pool, document_id).await? {
        Some(d) => d,
        None => {
            pool.close().await;
            bail!("document not found: {}", document_id);
        }
    };

    let faqs = list_faqs(&pool, document_id, FAQ_PAGE_LIMIT).await?;
    pool.close().await;

    println!("--- FAQs for {} ({}) ---", doc.filename, faqs.len());
    if faqs.is_empty() {
        println!("no FAQs generated yet; run: faqgen generate {}", doc.id);
        return Ok(());
    }

    for faq in &faqs {
        println!("Q{}: {}", faq.number, faq.question);
        println!("R{}: {}", faq.number, faq.answer);
        println!();
    }

    Ok(())
}

//! FAQ generation pipeline.
//!
//! The linear pipeline for one document: extract text from the stored PDF,
//! split it into overlapping chunks, assemble a character-budgeted context,
//! prompt the model once, parse the reply into numbered pairs, and persist
//! the batch in a single transaction.

use anyhow::{bail, Context, Result};
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::context::assemble_context;
use crate::db;
use crate::documents;
use crate::extract;
use crate::llm::{build_prompt, OllamaClient};
use crate::models::FaqPair;
use crate::parse::parse_faq_response;

/// Hard ceiling on FAQs per run, whatever the caller asks for.
pub const MAX_FAQS: usize = 10;

/// Counters from one pipeline run.
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub pages: usize,
    pub pages_skipped: usize,
    pub extracted_chars: usize,
    pub chunk_count: usize,
    pub context_chars: usize,
    pub requested: usize,
    pub recovered: usize,
}

/// Run the full pipeline for one document and persist the parsed pairs.
///
/// `num_faqs` overrides the configured count when given; either way the
/// effective count is capped at [`MAX_FAQS`]. Fails up front when the
/// document id is unknown or no model is configured.
pub async fn generate_faqs(
    config: &Config,
    pool: &SqlitePool,
    document_id: &str,
    num_faqs: Option<usize>,
) -> Result<GenerationReport> {
    let doc = match documents::get_document(pool, document_id).await? {
        Some(d) => d,
        None => bail!("document not found: {}", document_id),
    };

    let client = OllamaClient::new(&config.generation)?;
    let requested = num_faqs.unwrap_or(config.generation.num_faqs).min(MAX_FAQS);

    let extraction = extract::extract_file(std::path::Path::new(&doc.stored_path))
        .with_context(|| format!("Failed to extract text from {}", doc.stored_path))?;

    let chunks = chunk_text(
        &extraction.text,
        config.chunking.chunk_size,
        config.chunking.overlap,
    )?;
    let context = assemble_context(&chunks, config.context.max_chars);

    info!(
        document_id = %doc.id,
        model = client.model_name(),
        requested,
        chunks = chunks.len(),
        "generating FAQs"
    );

    let response = client.generate(&build_prompt(&context, requested)).await?;
    let pairs = parse_faq_response(&response);
    if pairs.len() < requested {
        warn!(
            document_id = %doc.id,
            recovered = pairs.len(),
            requested,
            "model reply yielded fewer FAQ pairs than requested"
        );
    }

    save_faqs(pool, &doc.id, &pairs).await?;

    Ok(GenerationReport {
        pages: extraction.pages,
        pages_skipped: extraction.pages_skipped,
        extracted_chars: extraction.text.chars().count(),
        chunk_count: chunks.len(),
        context_chars: context.chars().count(),
        requested,
        recovered: pairs.len(),
    })
}

/// Insert one batch of parsed pairs for a document.
///
/// The batch is committed in a single transaction; if any insert fails the
/// whole batch is rolled back and no rows land.
pub async fn save_faqs(pool: &SqlitePool, document_id: &str, pairs: &[FaqPair]) -> Result<usize> {
    let mut tx = pool.begin().await?;
    let now = chrono::Utc::now().timestamp();

    for pair in pairs {
        sqlx::query(
            r#"
            INSERT INTO faqs (id, document_id, number, question, answer, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(document_id)
        .bind(pair.number)
        .bind(&pair.question)
        .bind(&pair.answer)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(pairs.len())
}

/// CLI entry point for `faqgen generate <document-id>`.
pub async fn run_generate(
    config: &Config,
    document_id: &str,
    num_faqs: Option<usize>,
) -> Result<()> {
    let pool = db::connect(&config.db.path).await?;
    let report = generate_faqs(config, &pool, document_id, num_faqs).await;
    pool.close().await;
    let report = report?;

    println!("generate {}", document_id);
    println!(
        "  pages: {} ({} skipped)",
        report.pages, report.pages_skipped
    );
    println!("  extracted chars: {}", report.extracted_chars);
    println!("  chunks: {}", report.chunk_count);
    println!("  context chars: {}", report.context_chars);
    println!(
        "  faqs saved: {} of {} requested",
        report.recovered, report.requested
    );
    println!("ok");

    Ok(())
}

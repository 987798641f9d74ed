//! Upload intake.
//!
//! Stores an incoming PDF under a generated unique name and registers it in
//! the documents table. The stored name starts with a prefix of the content
//! hash, so re-uploading the same bytes under the same filename resolves to
//! the same stored path and de-duplicates instead of creating a second row.

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::path::Path;
use uuid::Uuid;

use crate::config::Config;
use crate::db;

/// Outcome of storing an upload.
#[derive(Debug)]
pub struct StoredDocument {
    pub id: String,
    pub stored_path: String,
    /// False when the upload resolved to an already-registered document.
    pub created: bool,
}

/// Write the uploaded bytes to the uploads directory and register the
/// document, de-duplicating by stored path.
pub async fn store_upload(
    config: &Config,
    pool: &SqlitePool,
    original_name: &str,
    bytes: &[u8],
) -> Result<StoredDocument> {
    if original_name.trim().is_empty() {
        bail!("no filename provided");
    }
    if bytes.is_empty() {
        bail!("uploaded file is empty");
    }

    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let content_hash = format!("{:x}", hasher.finalize());

    let stored_name = format!("{}_{}", &content_hash[..16], sanitize_filename(original_name));
    std::fs::create_dir_all(&config.uploads.dir).with_context(|| {
        format!(
            "Failed to create uploads directory: {}",
            config.uploads.dir.display()
        )
    })?;
    let path = config.uploads.dir.join(&stored_name);
    let stored_path = path.to_string_lossy().to_string();

    // Check if this exact upload is already registered
    let existing_id: Option<String> =
        sqlx::query_scalar("SELECT id FROM documents WHERE stored_path = ?")
            .bind(&stored_path)
            .fetch_optional(pool)
            .await?;
    if let Some(id) = existing_id {
        return Ok(StoredDocument {
            id,
            stored_path,
            created: false,
        });
    }

    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("Failed to write upload to {}", path.display()))?;

    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().timestamp();
    let inserted = sqlx::query(
        r#"
        INSERT INTO documents (id, filename, stored_path, content_hash, uploaded_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(stored_path) DO NOTHING
        "#,
    )
    .bind(&id)
    .bind(original_name)
    .bind(&stored_path)
    .bind(&content_hash)
    .bind(now)
    .execute(pool)
    .await?;

    // Lost a race against a concurrent identical upload
    if inserted.rows_affected() == 0 {
        let id: String = sqlx::query_scalar("SELECT id FROM documents WHERE stored_path = ?")
            .bind(&stored_path)
            .fetch_one(pool)
            .await?;
        return Ok(StoredDocument {
            id,
            stored_path,
            created: false,
        });
    }

    Ok(StoredDocument {
        id,
        stored_path,
        created: true,
    })
}

/// Reduce a client-supplied filename to a safe path component: the final
/// path segment with everything outside `[A-Za-z0-9._-]` replaced by `_`.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches(['.', '_']);
    if trimmed.is_empty() {
        "document.pdf".to_string()
    } else {
        trimmed.to_string()
    }
}

/// CLI entry point for `faqgen upload <file>`.
pub async fn run_upload(config: &Config, file: &Path) -> Result<()> {
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let name = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document.pdf");

    let pool = db::connect(&config.db.path).await?;
    let stored = store_upload(config, &pool, name, &bytes).await?;
    pool.close().await;

    println!("upload {}", name);
    println!("  document id: {}", stored.id);
    println!("  stored path: {}", stored.stored_path);
    if !stored.created {
        println!("  already uploaded (deduplicated by stored path)");
    }
    println!("ok");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, DbConfig, ServerConfig};
    use crate::{db, migrate};

    fn test_config(root: &std::path::Path) -> Config {
        Config {
            db: DbConfig {
                path: root.join("faqgen.db"),
            },
            uploads: crate::config::UploadsConfig {
                dir: root.join("uploads"),
                ..Default::default()
            },
            chunking: Default::default(),
            context: Default::default(),
            generation: Default::default(),
            server: ServerConfig {
                bind: "127.0.0.1:5001".to_string(),
            },
        }
    }

    async fn setup(root: &std::path::Path) -> (Config, SqlitePool) {
        let config = test_config(root);
        let pool = db::connect(&config.db.path).await.unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        (config, pool)
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("report.pdf"), "report.pdf");
        assert_eq!(
            sanitize_filename("my report (v2).pdf"),
            "my_report__v2_.pdf"
        );
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\files\\doc.pdf"), "doc.pdf");
        assert_eq!(sanitize_filename("..."), "document.pdf");
        assert_eq!(sanitize_filename("déjà vu.pdf"), "d_j__vu.pdf");
    }

    #[tokio::test]
    async fn test_upload_registers_document_and_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let (config, pool) = setup(dir.path()).await;

        let stored = store_upload(&config, &pool, "paper.pdf", b"%PDF-1.4 fake")
            .await
            .unwrap();
        assert!(stored.created);
        assert!(std::path::Path::new(&stored.stored_path).exists());
        assert!(stored.stored_path.ends_with("_paper.pdf"));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_same_upload_twice_deduplicates() {
        let dir = tempfile::tempdir().unwrap();
        let (config, pool) = setup(dir.path()).await;

        let first = store_upload(&config, &pool, "paper.pdf", b"%PDF-1.4 fake")
            .await
            .unwrap();
        let second = store_upload(&config, &pool, "paper.pdf", b"%PDF-1.4 fake")
            .await
            .unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.id, second.id);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_different_content_same_name_is_a_new_document() {
        let dir = tempfile::tempdir().unwrap();
        let (config, pool) = setup(dir.path()).await;

        let first = store_upload(&config, &pool, "paper.pdf", b"%PDF-1.4 one")
            .await
            .unwrap();
        let second = store_upload(&config, &pool, "paper.pdf", b"%PDF-1.4 two")
            .await
            .unwrap();

        assert!(first.created);
        assert!(second.created);
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_rejects_blank_filename_and_empty_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let (config, pool) = setup(dir.path()).await;

        assert!(store_upload(&config, &pool, "  ", b"data").await.is_err());
        assert!(store_upload(&config, &pool, "a.pdf", b"").await.is_err());
    }
}

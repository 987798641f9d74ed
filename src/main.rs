//! # faqgen CLI (`faqgen`)
//!
//! The `faqgen` binary is the primary interface for faqgen. It provides
//! commands for database initialization, PDF upload, FAQ generation, and
//! starting the web UI server.
//!
//! ## Usage
//!
//! ```bash
//! faqgen --config ./config/faqgen.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `faqgen init` | Create the SQLite database and run schema migrations |
//! | `faqgen upload <file>` | Store a PDF in the upload directory and register it |
//! | `faqgen documents` | List uploaded documents with FAQ counts and job status |
//! | `faqgen generate <id>` | Extract text from a document and generate FAQs |
//! | `faqgen faqs <id>` | Print the saved FAQs for a document |
//! | `faqgen serve` | Start the web server (upload form, FAQ pages, job API) |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! faqgen init --config ./config/faqgen.toml
//!
//! # Upload a PDF
//! faqgen upload ./manual.pdf --config ./config/faqgen.toml
//!
//! # Generate five FAQs for an uploaded document
//! faqgen generate 4cf3a1de-9be2-4c1a-8d6f-0f6f3a2ce881 --num-faqs 5
//!
//! # Print what the model produced
//! faqgen faqs 4cf3a1de-9be2-4c1a-8d6f-0f6f3a2ce881
//!
//! # Start the web UI on the configured bind address
//! faqgen serve --config ./config/faqgen.toml
//! ```

mod chunk;
mod config;
mod context;
mod db;
mod documents;
mod extract;
mod generate;
mod jobs;
mod llm;
mod migrate;
mod models;
mod parse;
mod server;
mod templates;
mod upload;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// faqgen CLI: a local-first FAQ generator for PDF documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/faqgen.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "faqgen",
    about = "faqgen: upload a PDF, get question/answer pairs from a locally hosted language model",
    version,
    long_about = "faqgen extracts text from uploaded PDF documents, assembles a bounded prompt \
    context from overlapping chunks, asks a locally hosted Ollama-compatible model for numbered \
    question/answer pairs, and stores the results in SQLite. FAQs are served through a small \
    web UI and a JSON job-status endpoint."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/faqgen.toml`. Database, upload, chunking,
    /// generation, and server settings are read from this file.
    #[arg(long, global = true, default_value = "./config/faqgen.toml")]
    config: PathBuf,

    /// Log level (error,warn,info,debug,trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables
    /// (documents, faqs, generation_jobs). This command is idempotent;
    /// running it multiple times is safe.
    Init,

    /// Upload a PDF file.
    ///
    /// Copies the file into the configured upload directory under a
    /// sanitized name and registers it as a document. Uploading the same
    /// file twice reuses the existing document instead of creating a
    /// duplicate; the same name with different content is a new document.
    Upload {
        /// Path to the PDF file to upload.
        file: PathBuf,
    },

    /// List uploaded documents.
    ///
    /// Shows each document's id, filename, FAQ count, most recent
    /// generation job state, and upload time, newest first.
    Documents,

    /// Generate FAQs for an uploaded document.
    ///
    /// Extracts text from the stored PDF, chunks it, sends a bounded
    /// context to the configured model, and saves the recovered
    /// question/answer pairs. Requires `[generation].model` to be set.
    Generate {
        /// Document UUID (as printed by `upload` or `documents`).
        document_id: String,

        /// How many FAQs to request (capped at 10). Defaults to
        /// `[generation].num_faqs` from the config file.
        #[arg(long)]
        num_faqs: Option<usize>,
    },

    /// Print the saved FAQs for a document.
    Faqs {
        /// Document UUID.
        document_id: String,
    },

    /// Start the web server.
    ///
    /// Serves the upload form, document list, and FAQ pages on the
    /// address configured in `[server].bind`, plus a JSON endpoint for
    /// polling generation jobs. Runs migrations on startup and marks
    /// jobs left over from a previous run as failed.
    Serve,
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg.db.path).await?;
            let result = migrate::run_migrations(&pool).await;
            pool.close().await;
            result?;
            println!("Database initialized successfully.");
        }
        Commands::Upload { file } => {
            upload::run_upload(&cfg, &file).await?;
        }
        Commands::Documents => {
            documents::run_documents(&cfg).await?;
        }
        Commands::Generate {
            document_id,
            num_faqs,
        } => {
            generate::run_generate(&cfg, &document_id, num_faqs).await?;
        }
        Commands::Faqs { document_id } => {
            documents::run_faqs(&cfg, &document_id).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

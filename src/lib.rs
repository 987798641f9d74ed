//! # faqgen
//!
//! A local-first FAQ generator for PDF documents.
//!
//! faqgen extracts text from uploaded PDFs, assembles a bounded prompt
//! context from overlapping chunks, asks a locally hosted Ollama-compatible
//! model for numbered question/answer pairs, and stores the results in
//! SQLite. FAQs are served through a small web UI, a CLI, and a JSON
//! job-status endpoint.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────┐
//! │ PDF upload  │──▶│   Pipeline    │──▶│  SQLite   │
//! │ CLI / web   │   │ Extract+Chunk│   │ docs+faqs │
//! └─────────────┘   │ Prompt+Parse │   └────┬─────┘
//!                   └──────────────┘        │
//!                      ┌────────────────────┤
//!                      ▼                    ▼
//!                 ┌──────────┐       ┌───────────┐
//!                 │   CLI    │       │   HTTP    │
//!                 │ (faqgen) │       │ (web UI)  │
//!                 └──────────┘       └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! faqgen init                   # create database
//! faqgen upload ./manual.pdf    # store a PDF, get a document id
//! faqgen generate <id>          # ask the model for FAQs
//! faqgen faqs <id>              # print what was saved
//! faqgen serve                  # start the web UI
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`upload`] | PDF storage and document registration |
//! | [`extract`] | Page-tolerant PDF text extraction |
//! | [`chunk`] | Overlapping text chunking |
//! | [`context`] | Bounded prompt context assembly |
//! | [`llm`] | Ollama-compatible generation client |
//! | [`parse`] | Lenient Q/R reply parsing |
//! | [`generate`] | End-to-end FAQ generation pipeline |
//! | [`jobs`] | Background job records and runner |
//! | [`server`] | Web UI and JSON job endpoint |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chunk;
pub mod config;
pub mod context;
pub mod db;
pub mod documents;
pub mod extract;
pub mod generate;
pub mod jobs;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod parse;
pub mod server;
pub mod templates;
pub mod upload;

//! Core data models used throughout faqgen.
//!
//! These types represent the documents, FAQ pairs, and generation jobs that
//! flow through the upload and generation pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// An uploaded PDF registered in SQLite.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: String,
    pub filename: String,
    pub stored_path: String,
    pub content_hash: String,
    pub uploaded_at: i64,
}

/// A question/answer pair recovered from a model reply, before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaqPair {
    pub number: i64,
    pub question: String,
    pub answer: String,
}

/// A persisted FAQ row.
#[derive(Debug, Clone, Serialize)]
pub struct Faq {
    pub id: String,
    pub document_id: Option<String>,
    pub number: i64,
    pub question: String,
    pub answer: String,
    pub updated_at: i64,
}

/// Lifecycle of a background generation job.
///
/// Jobs move `Queued -> Running -> Done | Failed`. The state is stored as a
/// lowercase string so rows stay readable in plain `sqlite3` sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Running,
    Done,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Done => "done",
            JobState::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(JobState::Queued),
            "running" => Some(JobState::Running),
            "done" => Some(JobState::Done),
            "failed" => Some(JobState::Failed),
            _ => None,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, JobState::Queued | JobState::Running)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A background FAQ generation job.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationJob {
    pub id: String,
    pub document_id: String,
    pub state: JobState,
    pub error: Option<String>,
    pub faq_count: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Formats a unix timestamp as ISO 8601 UTC for display surfaces.
pub fn format_ts_iso(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}

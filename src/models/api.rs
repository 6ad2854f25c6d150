use serde::{Deserialize, Serialize};

use super::chunk::{Citation, RetrievalResult};
use super::document::DocumentStatus;

// ──────────────────────────── Upload ────────────────────────────

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub content_hash: String,
    pub duplicate: bool,
    pub status: DocumentStatus,
    pub chunk_count: u32,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub content_hash: String,
    pub status: DocumentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

// ──────────────────────────── Retrieve ────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RetrieveRequest {
    pub content_hash: String,
    pub query: String,
    #[serde(default = "default_top_k")]
    pub k: usize,
    #[serde(default)]
    pub min_score: Option<f64>,
    #[serde(default)]
    pub chapter: Option<String>,
    #[serde(default)]
    pub subsection: Option<String>,
}

fn default_top_k() -> usize {
    5
}

#[derive(Debug, Serialize)]
pub struct RetrieveResponse {
    pub results: Vec<RetrievalResult>,
}

// ──────────────────────────── Chat ────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    pub content_hash: String,
    #[serde(default)]
    pub student_level: Option<u8>,
    #[serde(default = "default_top_k")]
    pub k: usize,
    #[serde(default)]
    pub min_score: Option<f64>,
}

/// One server-sent event on the chat stream. The `done` sentinel terminates
/// the stream; `error` distinguishes an aborted answer from a finished one.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    Delta { content: String },
    Sources { sources: Vec<Citation> },
    Done,
    Error { message: String },
}

// ──────────────────────────── Misc ────────────────────────────

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub content_hash: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

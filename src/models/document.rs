use serde::{Deserialize, Serialize};

/// Processing state of an ingested document.
///
/// Advances `pending -> parsing -> chunking -> embedding -> storing ->
/// completed`; `failed` is terminal and reachable from any step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Parsing,
    Chunking,
    Embedding,
    Storing,
    Completed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Parsing => "parsing",
            Self::Chunking => "chunking",
            Self::Embedding => "embedding",
            Self::Storing => "storing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "parsing" => Some(Self::Parsing),
            "chunking" => Some(Self::Chunking),
            "embedding" => Some(Self::Embedding),
            "storing" => Some(Self::Storing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted document record, keyed by content hash.
///
/// Mutated only by the ingestion pipeline as processing advances; the
/// chapter count is maintained by the external chapter metadata service.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentRecord {
    pub content_hash: String,
    pub title: Option<String>,
    pub file_type: String,
    pub page_count: u32,
    pub status: DocumentStatus,
    pub failure_reason: Option<String>,
    pub chapter_count: u32,
    pub chunk_count: u32,
    pub avg_chunk_chars: f64,
    pub embedding_dimension: u32,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl DocumentRecord {
    /// Fresh record for a document entering the pipeline.
    pub fn pending(content_hash: &str, title: Option<String>, file_type: &str) -> Self {
        Self {
            content_hash: content_hash.to_string(),
            title,
            file_type: file_type.to_string(),
            page_count: 0,
            status: DocumentStatus::Pending,
            failure_reason: None,
            chapter_count: 0,
            chunk_count: 0,
            avg_chunk_chars: 0.0,
            embedding_dimension: 0,
            created_at: None,
            updated_at: None,
        }
    }
}

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the ingestion/retrieval pipeline.
///
/// `DuplicateDocument` is informational rather than fatal: the upload route
/// reports it as a successful duplicate detection, not a failure.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("document contains no extractable text")]
    EmptyDocument,

    #[error("embedding service error: {0}")]
    EmbeddingService(String),

    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    EmbeddingDimensionMismatch { expected: u32, got: usize },

    #[error("vector store unavailable: {0}")]
    VectorStoreUnavailable(String),

    #[error("document {content_hash} already ingested")]
    DuplicateDocument { content_hash: String },

    #[error("retrieval timed out after {0:?}")]
    RetrievalTimeout(Duration),

    #[error("completion service error: {0}")]
    CompletionService(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn database(err: impl std::fmt::Display) -> Self {
        Self::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let e = PipelineError::EmbeddingDimensionMismatch {
            expected: 1536,
            got: 512,
        };
        assert_eq!(
            e.to_string(),
            "embedding dimension mismatch: expected 1536, got 512"
        );

        let e = PipelineError::UnsupportedFormat("docx".to_string());
        assert!(e.to_string().contains("docx"));
    }
}

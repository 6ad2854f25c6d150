pub mod embedded;

use async_trait::async_trait;

use crate::errors::PipelineError;
use crate::models::chunk::{Chunk, RetrievalResult};

/// Collection name for a document, a deterministic function of its content
/// hash. Re-uploading identical bytes always maps to the same collection.
pub fn collection_name(content_hash: &str) -> String {
    format!("doc_{content_hash}")
}

/// Opaque chapter/subsection match applied during search. `None` fields
/// match everything.
#[derive(Debug, Clone, Default)]
pub struct SectionFilter {
    pub chapter: Option<String>,
    pub subsection: Option<String>,
}

impl SectionFilter {
    pub fn is_empty(&self) -> bool {
        self.chapter.is_none() && self.subsection.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionStats {
    pub count: usize,
    pub dimension: usize,
}

/// Abstract vector store interface: one isolated collection per document.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Idempotent; the same hash always yields the same collection.
    async fn create_or_open(&self, content_hash: &str) -> Result<(), PipelineError>;

    /// Insert chunks with their embeddings. Rejects mismatched-length input.
    async fn add(
        &self,
        content_hash: &str,
        chunks: &[Chunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), PipelineError>;

    /// The k nearest chunks by cosine similarity, descending by score, ties
    /// broken by ascending chunk index. A missing or empty collection yields
    /// an empty result, not an error.
    async fn search(
        &self,
        content_hash: &str,
        query_embedding: &[f32],
        k: usize,
        filter: Option<&SectionFilter>,
    ) -> Result<Vec<RetrievalResult>, PipelineError>;

    /// Stats for a collection, `None` when it does not exist.
    async fn stats(&self, content_hash: &str) -> Result<Option<CollectionStats>, PipelineError>;

    /// Remove a collection and all its vectors. Deleting a non-existent
    /// collection is a no-op so document deletion stays idempotent.
    async fn delete(&self, content_hash: &str) -> Result<bool, PipelineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_name_is_deterministic() {
        assert_eq!(collection_name("abc123"), "doc_abc123");
        assert_eq!(collection_name("abc123"), collection_name("abc123"));
    }
}

pub mod dashscope;

use async_trait::async_trait;

use crate::errors::PipelineError;

/// Whether texts are embedded as corpus documents or as a search query.
/// Affects only how the request is annotated to the embedding service;
/// output dimensionality is identical for both modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingMode {
    Document,
    Query,
}

impl EmbeddingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Query => "query",
        }
    }
}

/// Abstract embedding model interface.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Embed texts, one vector per input in the same order. Either every
    /// vector is delivered or the whole call fails; partial results are
    /// never returned.
    async fn embed(
        &self,
        texts: &[String],
        mode: EmbeddingMode,
    ) -> Result<Vec<Vec<f32>>, PipelineError>;

    /// Configured embedding dimensionality.
    fn dimensions(&self) -> u32;
}

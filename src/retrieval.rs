use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::embedding::{EmbeddingMode, EmbeddingModel};
use crate::errors::PipelineError;
use crate::models::chunk::RetrievalResult;
use crate::vector_store::{SectionFilter, VectorStore};

/// Semantic search over one document's collection.
///
/// Queries embed in query mode, which some providers weight differently
/// from document mode. The whole embed-plus-search call is bounded by a
/// single deadline.
pub struct RetrievalService {
    embedding_model: Arc<dyn EmbeddingModel>,
    vector_store: Arc<dyn VectorStore>,
    timeout: Duration,
}

impl RetrievalService {
    pub fn new(
        embedding_model: Arc<dyn EmbeddingModel>,
        vector_store: Arc<dyn VectorStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            embedding_model,
            vector_store,
            timeout,
        }
    }

    /// Top-k chunks for `query` from the document identified by
    /// `content_hash`, highest score first. Results below `min_score` are
    /// dropped; ranks are reassigned after filtering so they stay
    /// contiguous from 1. A missing collection yields an empty list.
    pub async fn retrieve(
        &self,
        content_hash: &str,
        query: &str,
        k: usize,
        min_score: Option<f64>,
        filter: Option<&SectionFilter>,
    ) -> Result<Vec<RetrievalResult>, PipelineError> {
        let search = self.embed_and_search(content_hash, query, k, filter);
        let mut results = tokio::time::timeout(self.timeout, search)
            .await
            .map_err(|_| PipelineError::RetrievalTimeout(self.timeout))??;

        if let Some(threshold) = min_score {
            results.retain(|r| r.score >= threshold);
            for (i, result) in results.iter_mut().enumerate() {
                result.rank = i + 1;
            }
        }

        debug!(
            "Retrieved {} chunks for query against {content_hash}",
            results.len()
        );
        Ok(results)
    }

    async fn embed_and_search(
        &self,
        content_hash: &str,
        query: &str,
        k: usize,
        filter: Option<&SectionFilter>,
    ) -> Result<Vec<RetrievalResult>, PipelineError> {
        let embeddings = self
            .embedding_model
            .embed(&[query.to_string()], EmbeddingMode::Query)
            .await?;
        let query_embedding = embeddings
            .first()
            .ok_or_else(|| PipelineError::EmbeddingService("empty embedding response".into()))?;
        self.vector_store
            .search(content_hash, query_embedding, k, filter)
            .await
    }
}

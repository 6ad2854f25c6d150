use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use super::{collection_name, CollectionStats, SectionFilter, VectorStore};
use crate::errors::PipelineError;
use crate::models::chunk::{Chunk, ChunkMetadata, RetrievalResult};

/// In-process vector store, one collection per document hash.
///
/// Fills the role ChromaDB played in the original system: isolated
/// per-document collections with cosine-similarity search. All state lives
/// behind a single RwLock; reads (searches) run concurrently.
#[derive(Default)]
pub struct EmbeddedVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

#[derive(Default)]
struct Collection {
    dimension: usize,
    entries: Vec<StoredChunk>,
}

struct StoredChunk {
    content: String,
    embedding: Vec<f32>,
    metadata: ChunkMetadata,
}

impl EmbeddedVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn matches_filter(metadata: &ChunkMetadata, filter: Option<&SectionFilter>) -> bool {
    let Some(filter) = filter else { return true };
    if let Some(chapter) = &filter.chapter {
        if metadata.chapter.as_deref() != Some(chapter.as_str()) {
            return false;
        }
    }
    if let Some(subsection) = &filter.subsection {
        if metadata.subsection.as_deref() != Some(subsection.as_str()) {
            return false;
        }
    }
    true
}

#[async_trait]
impl VectorStore for EmbeddedVectorStore {
    async fn create_or_open(&self, content_hash: &str) -> Result<(), PipelineError> {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection_name(content_hash))
            .or_default();
        Ok(())
    }

    async fn add(
        &self,
        content_hash: &str,
        chunks: &[Chunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), PipelineError> {
        if chunks.len() != embeddings.len() {
            return Err(PipelineError::VectorStoreUnavailable(format!(
                "chunk/embedding length mismatch: {} chunks, {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }

        let mut collections = self.collections.write().await;
        let collection = collections
            .entry(collection_name(content_hash))
            .or_default();

        for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
            if collection.entries.is_empty() {
                collection.dimension = embedding.len();
            } else if embedding.len() != collection.dimension {
                return Err(PipelineError::VectorStoreUnavailable(format!(
                    "vector dimension {} does not match collection dimension {}",
                    embedding.len(),
                    collection.dimension
                )));
            }
            collection.entries.push(StoredChunk {
                content: chunk.content.clone(),
                embedding: embedding.clone(),
                metadata: chunk.metadata.clone(),
            });
        }

        info!(
            "Stored {} chunks in {} ({} total)",
            chunks.len(),
            collection_name(content_hash),
            collection.entries.len()
        );
        Ok(())
    }

    async fn search(
        &self,
        content_hash: &str,
        query_embedding: &[f32],
        k: usize,
        filter: Option<&SectionFilter>,
    ) -> Result<Vec<RetrievalResult>, PipelineError> {
        let collections = self.collections.read().await;
        let Some(collection) = collections.get(&collection_name(content_hash)) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<(f64, &StoredChunk)> = collection
            .entries
            .iter()
            .filter(|entry| matches_filter(&entry.metadata, filter))
            .map(|entry| (cosine_similarity(query_embedding, &entry.embedding), entry))
            .collect();

        // Descending score; ascending chunk index on ties so results are
        // reproducible across runs.
        scored.sort_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then(a.1.metadata.chunk_index.cmp(&b.1.metadata.chunk_index))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(i, (score, entry))| RetrievalResult {
                content: entry.content.clone(),
                page: entry.metadata.page,
                chunk_index: entry.metadata.chunk_index,
                score,
                rank: i + 1,
            })
            .collect())
    }

    async fn stats(&self, content_hash: &str) -> Result<Option<CollectionStats>, PipelineError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection_name(content_hash))
            .map(|c| CollectionStats {
                count: c.entries.len(),
                dimension: c.dimension,
            }))
    }

    async fn delete(&self, content_hash: &str) -> Result<bool, PipelineError> {
        let mut collections = self.collections.write().await;
        let existed = collections.remove(&collection_name(content_hash)).is_some();
        if existed {
            info!("Deleted collection {}", collection_name(content_hash));
        }
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: u32, content: &str) -> Chunk {
        Chunk {
            content: content.to_string(),
            span: (0, content.len()),
            metadata: ChunkMetadata {
                page: Some(index + 1),
                chunk_index: index,
                document_hash: "h1".to_string(),
                chapter: None,
                subsection: None,
            },
        }
    }

    fn chunk_in_chapter(index: u32, content: &str, chapter: &str) -> Chunk {
        let mut c = chunk(index, content);
        c.metadata.chapter = Some(chapter.to_string());
        c
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[tokio::test]
    async fn test_add_rejects_length_mismatch() {
        let store = EmbeddedVectorStore::new();
        let result = store
            .add("h1", &[chunk(0, "a")], &[vec![1.0], vec![2.0]])
            .await;
        assert!(matches!(
            result,
            Err(PipelineError::VectorStoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_search_orders_by_score_then_index() {
        let store = EmbeddedVectorStore::new();
        // Chunks 1 and 2 share an identical embedding; the tie must break
        // toward the lower chunk index regardless of insertion order.
        store
            .add(
                "h1",
                &[chunk(2, "tie-b"), chunk(0, "far"), chunk(1, "tie-a")],
                &[
                    vec![1.0, 1.0],
                    vec![-1.0, 0.5],
                    vec![1.0, 1.0],
                ],
            )
            .await
            .unwrap();

        let results = store.search("h1", &[1.0, 1.0], 10, None).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].chunk_index, 1);
        assert_eq!(results[1].chunk_index, 2);
        assert_eq!(results[2].chunk_index, 0);
        assert_eq!(results[0].rank, 1);
        assert!(results[0].score >= results[1].score);
        assert!(results[1].score >= results[2].score);
    }

    #[tokio::test]
    async fn test_search_returns_at_most_k() {
        let store = EmbeddedVectorStore::new();
        let chunks: Vec<Chunk> = (0..10).map(|i| chunk(i, "c")).collect();
        let embeddings: Vec<Vec<f32>> = (0..10).map(|i| vec![i as f32, 1.0]).collect();
        store.add("h1", &chunks, &embeddings).await.unwrap();

        let results = store.search("h1", &[1.0, 1.0], 3, None).await.unwrap();
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn test_search_missing_collection_is_empty() {
        let store = EmbeddedVectorStore::new();
        let results = store.search("nope", &[1.0], 5, None).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_section_filter() {
        let store = EmbeddedVectorStore::new();
        store
            .add(
                "h1",
                &[
                    chunk_in_chapter(0, "intro", "ch1"),
                    chunk_in_chapter(1, "body", "ch2"),
                ],
                &[vec![1.0, 0.0], vec![1.0, 0.0]],
            )
            .await
            .unwrap();

        let filter = SectionFilter {
            chapter: Some("ch2".to_string()),
            subsection: None,
        };
        let results = store
            .search("h1", &[1.0, 0.0], 10, Some(&filter))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk_index, 1);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = EmbeddedVectorStore::new();
        store.create_or_open("h1").await.unwrap();
        assert!(store.delete("h1").await.unwrap());
        assert!(!store.delete("h1").await.unwrap());
        assert!(!store.delete("never-existed").await.unwrap());
    }

    #[tokio::test]
    async fn test_stats() {
        let store = EmbeddedVectorStore::new();
        assert_eq!(store.stats("h1").await.unwrap(), None);

        store
            .add("h1", &[chunk(0, "a")], &[vec![1.0, 2.0, 3.0]])
            .await
            .unwrap();
        let stats = store.stats("h1").await.unwrap().unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.dimension, 3);
    }

    #[tokio::test]
    async fn test_create_or_open_is_idempotent() {
        let store = EmbeddedVectorStore::new();
        store.create_or_open("h1").await.unwrap();
        store
            .add("h1", &[chunk(0, "a")], &[vec![1.0]])
            .await
            .unwrap();
        // Re-opening must not clear existing vectors.
        store.create_or_open("h1").await.unwrap();
        assert_eq!(store.stats("h1").await.unwrap().unwrap().count, 1);
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::chunker::{chunk_spans, ChunkSpan};
use crate::database::Database;
use crate::embedding::{EmbeddingMode, EmbeddingModel};
use crate::errors::PipelineError;
use crate::models::chunk::{Chunk, ChunkMetadata};
use crate::models::document::{DocumentRecord, DocumentStatus};
use crate::parser::{self, ParsedDocument, SourceFormat};
use crate::vector_store::VectorStore;

/// Deterministic digest of uploaded bytes; identifies a document everywhere
/// (record key, collection name, chunk metadata).
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Outcome of an ingestion request.
#[derive(Debug, Clone)]
pub struct IngestReceipt {
    pub content_hash: String,
    pub status: DocumentStatus,
    pub chunk_count: u32,
    pub page_count: u32,
}

/// Orchestrates hashing, dedup, parsing, chunking, embedding, and storage.
///
/// Documents advance `pending -> parsing -> chunking -> embedding ->
/// storing -> completed`; any failure marks the record `failed` with a
/// reason and removes partially stored vectors. There is no automatic
/// retry; re-uploading the document is the retry.
pub struct IngestionPipeline {
    database: Arc<dyn Database>,
    vector_store: Arc<dyn VectorStore>,
    embedding_model: Arc<dyn EmbeddingModel>,
    chunk_size: usize,
    chunk_overlap: usize,
    // Serializes uploads of the same content hash so a race never produces
    // two partial collections; distinct hashes are never blocked.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl IngestionPipeline {
    pub fn new(
        database: Arc<dyn Database>,
        vector_store: Arc<dyn VectorStore>,
        embedding_model: Arc<dyn EmbeddingModel>,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Self {
        Self {
            database,
            vector_store,
            embedding_model,
            chunk_size,
            chunk_overlap,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Ingest an uploaded document end to end. The returned future completes
    /// when the document is `completed` or `failed`; callers needing progress
    /// in the meantime use [`IngestionPipeline::status`].
    ///
    /// Re-uploading byte-identical content returns `DuplicateDocument`
    /// without doing any parsing or embedding work.
    pub async fn ingest(
        &self,
        bytes: &[u8],
        filename: &str,
        title: Option<String>,
    ) -> Result<IngestReceipt, PipelineError> {
        let hash = content_hash(bytes);

        let lock = self.lock_for(&hash).await;
        let _guard = lock.lock().await;

        // Dedup before any compute: a completed record with this hash means
        // the collection already exists.
        if let Some(existing) = self
            .database
            .get_document(&hash)
            .await
            .map_err(PipelineError::database)?
        {
            if existing.status == DocumentStatus::Completed {
                info!("Duplicate upload detected for {hash}");
                return Err(PipelineError::DuplicateDocument { content_hash: hash });
            }
        }

        // Unsupported formats fail before a record is even created.
        let format = SourceFormat::from_filename(filename)?;

        self.database
            .upsert_document(&DocumentRecord::pending(&hash, title.clone(), format.as_str()))
            .await
            .map_err(PipelineError::database)?;

        match self.run_pipeline(&hash, bytes, format, title).await {
            Ok(receipt) => Ok(receipt),
            Err(err) => {
                // Leave no partially populated collection behind; retrieval
                // must never see incomplete vectors for this hash.
                if let Err(cleanup_err) = self.vector_store.delete(&hash).await {
                    error!("Failed to clean up collection for {hash}: {cleanup_err}");
                }
                if let Err(db_err) = self
                    .database
                    .set_status(&hash, DocumentStatus::Failed, Some(&err.to_string()))
                    .await
                {
                    error!("Failed to record failure for {hash}: {db_err}");
                }
                Err(err)
            }
        }
    }

    async fn run_pipeline(
        &self,
        hash: &str,
        bytes: &[u8],
        format: SourceFormat,
        title: Option<String>,
    ) -> Result<IngestReceipt, PipelineError> {
        self.advance(hash, DocumentStatus::Parsing).await?;
        let parsed = parser::parse(bytes, format)?;

        self.advance(hash, DocumentStatus::Chunking).await?;
        let chunks = self.build_chunks(hash, &parsed)?;
        if chunks.is_empty() {
            return Err(PipelineError::EmptyDocument);
        }

        self.advance(hash, DocumentStatus::Embedding).await?;
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self
            .embedding_model
            .embed(&texts, EmbeddingMode::Document)
            .await?;
        // Guard the store against a model implementation that returns the
        // wrong width; nothing is written past this point on mismatch.
        let expected = self.embedding_model.dimensions();
        for embedding in &embeddings {
            if embedding.len() != expected as usize {
                return Err(PipelineError::EmbeddingDimensionMismatch {
                    expected,
                    got: embedding.len(),
                });
            }
        }

        self.advance(hash, DocumentStatus::Storing).await?;
        self.vector_store.create_or_open(hash).await?;
        self.vector_store.add(hash, &chunks, &embeddings).await?;

        let chunk_count = chunks.len() as u32;
        let total_chars: usize = chunks.iter().map(|c| c.content.chars().count()).sum();
        let record = DocumentRecord {
            content_hash: hash.to_string(),
            title,
            file_type: format.as_str().to_string(),
            page_count: parsed.page_count,
            status: DocumentStatus::Completed,
            failure_reason: None,
            chapter_count: 0,
            chunk_count,
            avg_chunk_chars: total_chars as f64 / chunk_count as f64,
            embedding_dimension: expected,
            created_at: None,
            updated_at: None,
        };
        self.database
            .upsert_document(&record)
            .await
            .map_err(PipelineError::database)?;

        info!(
            "Ingested {hash}: {chunk_count} chunks, {} pages, dim {expected}",
            parsed.page_count
        );
        Ok(IngestReceipt {
            content_hash: hash.to_string(),
            status: DocumentStatus::Completed,
            chunk_count,
            page_count: parsed.page_count,
        })
    }

    /// Current processing state of a document, if it exists.
    pub async fn status(
        &self,
        content_hash: &str,
    ) -> Result<Option<(DocumentStatus, Option<String>)>, PipelineError> {
        let record = self
            .database
            .get_document(content_hash)
            .await
            .map_err(PipelineError::database)?;
        Ok(record.map(|r| (r.status, r.failure_reason)))
    }

    fn build_chunks(
        &self,
        hash: &str,
        parsed: &ParsedDocument,
    ) -> Result<Vec<Chunk>, PipelineError> {
        let spans = chunk_spans(&parsed.text, self.chunk_size, self.chunk_overlap)?;
        Ok(spans
            .iter()
            .enumerate()
            .map(|(i, span): (usize, &ChunkSpan)| Chunk {
                content: span.slice(&parsed.text).to_string(),
                span: (span.start, span.end),
                metadata: ChunkMetadata {
                    page: parsed.page_for_offset(span.start),
                    chunk_index: i as u32,
                    document_hash: hash.to_string(),
                    chapter: None,
                    subsection: None,
                },
            })
            .collect())
    }

    async fn advance(&self, hash: &str, status: DocumentStatus) -> Result<(), PipelineError> {
        self.database
            .set_status(hash, status, None)
            .await
            .map_err(PipelineError::database)
    }

    async fn lock_for(&self, hash: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(hash.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

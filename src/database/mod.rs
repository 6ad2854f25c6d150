pub mod sqlite;

use async_trait::async_trait;

use crate::models::document::{DocumentRecord, DocumentStatus};

/// Abstract database interface for document records.
///
/// Records are keyed by content hash; readers never mutate them.
#[async_trait]
pub trait Database: Send + Sync {
    /// Initialize tables.
    async fn initialize(&self) -> anyhow::Result<()>;

    /// Insert or update a document record.
    async fn upsert_document(&self, record: &DocumentRecord) -> anyhow::Result<()>;

    /// Advance a document's processing status, recording a failure reason
    /// when the new status is `failed`.
    async fn set_status(
        &self,
        content_hash: &str,
        status: DocumentStatus,
        failure_reason: Option<&str>,
    ) -> anyhow::Result<()>;

    /// Fetch a document record by content hash.
    async fn get_document(&self, content_hash: &str) -> anyhow::Result<Option<DocumentRecord>>;

    /// List document records, newest first.
    async fn list_documents(&self, limit: i64, offset: i64)
        -> anyhow::Result<Vec<DocumentRecord>>;

    /// Delete a document record. Returns whether a row existed.
    async fn delete_document(&self, content_hash: &str) -> anyhow::Result<bool>;
}

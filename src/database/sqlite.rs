use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::info;

use super::Database;
use crate::models::document::{DocumentRecord, DocumentStatus};

/// SQLite database for document records and processing status.
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    pub async fn new(url: &str, pool_size: u32) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .connect_with(options)
            .await?;

        info!("Connected to SQLite at {url} (pool_size={pool_size})");
        Ok(Self { pool })
    }

    /// In-memory database for tests.
    #[cfg(test)]
    pub async fn in_memory() -> anyhow::Result<Self> {
        let db = Self::new("sqlite::memory:", 1).await?;
        db.initialize().await?;
        Ok(db)
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> DocumentRecord {
    let status: String = row.get("status");
    DocumentRecord {
        content_hash: row.get("content_hash"),
        title: row.get("title"),
        file_type: row.get("file_type"),
        page_count: row.get::<i64, _>("page_count") as u32,
        status: DocumentStatus::parse(&status).unwrap_or(DocumentStatus::Failed),
        failure_reason: row.get("failure_reason"),
        chapter_count: row.get::<i64, _>("chapter_count") as u32,
        chunk_count: row.get::<i64, _>("chunk_count") as u32,
        avg_chunk_chars: row.get("avg_chunk_chars"),
        embedding_dimension: row.get::<i64, _>("embedding_dimension") as u32,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLUMNS: &str = "content_hash, title, file_type, page_count, status, \
     failure_reason, chapter_count, chunk_count, avg_chunk_chars, \
     embedding_dimension, created_at, updated_at";

#[async_trait]
impl Database for SqliteDatabase {
    async fn initialize(&self) -> anyhow::Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (
                content_hash TEXT PRIMARY KEY,
                title TEXT,
                file_type TEXT NOT NULL,
                page_count INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'pending',
                failure_reason TEXT,
                chapter_count INTEGER NOT NULL DEFAULT 0,
                chunk_count INTEGER NOT NULL DEFAULT 0,
                avg_chunk_chars REAL NOT NULL DEFAULT 0,
                embedding_dimension INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_status ON documents(status)")
            .execute(&self.pool)
            .await?;

        info!("Database tables initialized");
        Ok(())
    }

    async fn upsert_document(&self, record: &DocumentRecord) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO documents (content_hash, title, file_type, page_count, status,
                failure_reason, chapter_count, chunk_count, avg_chunk_chars, embedding_dimension)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT (content_hash)
             DO UPDATE SET
                title = COALESCE(excluded.title, documents.title),
                file_type = excluded.file_type,
                page_count = excluded.page_count,
                status = excluded.status,
                failure_reason = excluded.failure_reason,
                chunk_count = excluded.chunk_count,
                avg_chunk_chars = excluded.avg_chunk_chars,
                embedding_dimension = excluded.embedding_dimension,
                updated_at = datetime('now')",
        )
        .bind(&record.content_hash)
        .bind(&record.title)
        .bind(&record.file_type)
        .bind(record.page_count as i64)
        .bind(record.status.as_str())
        .bind(&record.failure_reason)
        .bind(record.chapter_count as i64)
        .bind(record.chunk_count as i64)
        .bind(record.avg_chunk_chars)
        .bind(record.embedding_dimension as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_status(
        &self,
        content_hash: &str,
        status: DocumentStatus,
        failure_reason: Option<&str>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE documents
             SET status = ?1, failure_reason = ?2, updated_at = datetime('now')
             WHERE content_hash = ?3",
        )
        .bind(status.as_str())
        .bind(failure_reason)
        .bind(content_hash)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_document(&self, content_hash: &str) -> anyhow::Result<Option<DocumentRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM documents WHERE content_hash = ?1"
        ))
        .bind(content_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_record))
    }

    async fn list_documents(
        &self,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<DocumentRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM documents
             ORDER BY created_at DESC, content_hash
             LIMIT ?1 OFFSET ?2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_record).collect())
    }

    async fn delete_document(&self, content_hash: &str) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE content_hash = ?1")
            .bind(content_hash)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_and_get() {
        let db = SqliteDatabase::in_memory().await.unwrap();
        let mut record = DocumentRecord::pending("h1", Some("Physics".to_string()), "pdf");
        db.upsert_document(&record).await.unwrap();

        let fetched = db.get_document("h1").await.unwrap().unwrap();
        assert_eq!(fetched.content_hash, "h1");
        assert_eq!(fetched.title.as_deref(), Some("Physics"));
        assert_eq!(fetched.status, DocumentStatus::Pending);
        assert!(fetched.created_at.is_some());

        record.status = DocumentStatus::Completed;
        record.chunk_count = 12;
        record.avg_chunk_chars = 850.5;
        record.embedding_dimension = 1536;
        db.upsert_document(&record).await.unwrap();

        let fetched = db.get_document("h1").await.unwrap().unwrap();
        assert_eq!(fetched.status, DocumentStatus::Completed);
        assert_eq!(fetched.chunk_count, 12);
        assert_eq!(fetched.avg_chunk_chars, 850.5);
        assert_eq!(fetched.embedding_dimension, 1536);
    }

    #[tokio::test]
    async fn test_get_missing_document() {
        let db = SqliteDatabase::in_memory().await.unwrap();
        assert!(db.get_document("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_status_with_failure_reason() {
        let db = SqliteDatabase::in_memory().await.unwrap();
        db.upsert_document(&DocumentRecord::pending("h1", None, "txt"))
            .await
            .unwrap();

        db.set_status("h1", DocumentStatus::Failed, Some("document contains no extractable text"))
            .await
            .unwrap();

        let fetched = db.get_document("h1").await.unwrap().unwrap();
        assert_eq!(fetched.status, DocumentStatus::Failed);
        assert_eq!(
            fetched.failure_reason.as_deref(),
            Some("document contains no extractable text")
        );
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let db = SqliteDatabase::in_memory().await.unwrap();
        for hash in ["h1", "h2", "h3"] {
            db.upsert_document(&DocumentRecord::pending(hash, None, "txt"))
                .await
                .unwrap();
        }

        let docs = db.list_documents(10, 0).await.unwrap();
        assert_eq!(docs.len(), 3);

        let docs = db.list_documents(2, 0).await.unwrap();
        assert_eq!(docs.len(), 2);

        assert!(db.delete_document("h2").await.unwrap());
        assert!(!db.delete_document("h2").await.unwrap());
        assert_eq!(db.list_documents(10, 0).await.unwrap().len(), 2);
    }
}

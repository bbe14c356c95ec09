//! SQLite-backed [`DocumentStore`] implementation.
//!
//! Timestamps are stored as Unix milliseconds so that the
//! `uploaded_at DESC` index gives the same order as the in-memory store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use docsift_core::models::{DocumentRecord, DocumentStatus};
use docsift_core::store::DocumentStore;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

const SELECT_COLUMNS: &str = "SELECT id, file_name, author, title, text_content, \
     text_content_storage_path, storage_path, created_at, uploaded_at, page_count, \
     size, content_type, status, error FROM documents";

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

fn row_to_record(row: &SqliteRow) -> Result<DocumentRecord> {
    let status: String = row.try_get("status")?;
    let page_count: Option<i64> = row.try_get("page_count")?;
    let size: i64 = row.try_get("size")?;

    Ok(DocumentRecord {
        id: row.try_get("id")?,
        file_name: row.try_get("file_name")?,
        author: row.try_get("author")?,
        title: row.try_get("title")?,
        text_content: row.try_get("text_content")?,
        text_content_storage_path: row.try_get("text_content_storage_path")?,
        storage_path: row.try_get("storage_path")?,
        created_at: from_millis(row.try_get("created_at")?),
        uploaded_at: from_millis(row.try_get("uploaded_at")?),
        page_count: page_count.and_then(|p| u32::try_from(p).ok()),
        size: u64::try_from(size).unwrap_or(0),
        content_type: row.try_get("content_type")?,
        status: status.parse::<DocumentStatus>()?,
        error: row.try_get("error")?,
    })
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn list_documents(&self) -> Result<Vec<DocumentRecord>> {
        let rows = sqlx::query(&format!(
            "{} ORDER BY uploaded_at DESC, id ASC",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list documents")?;

        rows.iter().map(row_to_record).collect()
    }

    async fn get_document(&self, id: &str) -> Result<Option<DocumentRecord>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to load document {}", id))?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn upsert_document(&self, doc: &DocumentRecord) -> Result<String> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, file_name, author, title, text_content,
                                   text_content_storage_path, storage_path,
                                   created_at, uploaded_at, page_count, size,
                                   content_type, status, error)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                file_name = excluded.file_name,
                author = excluded.author,
                title = excluded.title,
                text_content = excluded.text_content,
                text_content_storage_path = excluded.text_content_storage_path,
                storage_path = excluded.storage_path,
                created_at = excluded.created_at,
                uploaded_at = excluded.uploaded_at,
                page_count = excluded.page_count,
                size = excluded.size,
                content_type = excluded.content_type,
                status = excluded.status,
                error = excluded.error
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.file_name)
        .bind(&doc.author)
        .bind(&doc.title)
        .bind(&doc.text_content)
        .bind(&doc.text_content_storage_path)
        .bind(&doc.storage_path)
        .bind(doc.created_at.timestamp_millis())
        .bind(doc.uploaded_at.timestamp_millis())
        .bind(doc.page_count.map(i64::from))
        .bind(i64::try_from(doc.size).unwrap_or(i64::MAX))
        .bind(&doc.content_type)
        .bind(doc.status.as_str())
        .bind(&doc.error)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to store document {}", doc.id))?;

        Ok(doc.id.clone())
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete document {}", id))?;
        Ok(result.rows_affected() > 0)
    }
}

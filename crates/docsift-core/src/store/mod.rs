//! Storage abstractions for docsift.
//!
//! The search engine talks to two collaborators:
//!
//! - [`DocumentStore`]: the document collection holding one
//!   [`DocumentRecord`] per uploaded file.
//! - [`BlobStore`]: the blob storage holding uploaded bytes and externally
//!   stored text, reachable through time-limited retrieval URLs.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::DocumentRecord;

/// Document collection backend.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`list_documents`](DocumentStore::list_documents) | Full corpus, newest upload first |
/// | [`get_document`](DocumentStore::get_document) | One record by ID |
/// | [`upsert_document`](DocumentStore::upsert_document) | Insert or replace a record |
/// | [`delete_document`](DocumentStore::delete_document) | Remove a record |
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every record, ordered by `uploaded_at` descending.
    async fn list_documents(&self) -> Result<Vec<DocumentRecord>>;

    async fn get_document(&self, id: &str) -> Result<Option<DocumentRecord>>;

    /// Insert or replace a record by ID. Returns the ID.
    async fn upsert_document(&self, doc: &DocumentRecord) -> Result<String>;

    /// Returns `false` if no record had this ID.
    async fn delete_document(&self, id: &str) -> Result<bool>;
}

/// Blob storage backend.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// A time-limited URL from which the blob at `path` can be fetched.
    async fn retrieval_url(&self, path: &str) -> Result<String>;

    /// Fetch a URL produced by [`retrieval_url`](BlobStore::retrieval_url)
    /// and decode it as UTF-8 text.
    async fn fetch_text(&self, url: &str) -> Result<String>;

    /// Store `bytes` at `path`, replacing any existing blob.
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Remove the blob at `path`. Removing a missing blob is not an error.
    async fn delete(&self, path: &str) -> Result<()>;
}

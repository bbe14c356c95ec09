//! In-memory [`DocumentStore`] and [`BlobStore`] for tests and embedding.
//!
//! Both use `std::sync::RwLock` for thread safety.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::models::DocumentRecord;

use super::{BlobStore, DocumentStore};

/// In-memory document collection.
pub struct InMemoryStore {
    docs: RwLock<HashMap<String, DocumentRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
        }
    }

    /// Build a store pre-populated with `docs`.
    pub fn with_documents(docs: impl IntoIterator<Item = DocumentRecord>) -> Self {
        let map = docs.into_iter().map(|d| (d.id.clone(), d)).collect();
        Self {
            docs: RwLock::new(map),
        }
    }

    pub fn len(&self) -> usize {
        self.docs.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn list_documents(&self) -> Result<Vec<DocumentRecord>> {
        let docs = self.docs.read().unwrap();
        let mut all: Vec<DocumentRecord> = docs.values().cloned().collect();
        all.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn get_document(&self, id: &str) -> Result<Option<DocumentRecord>> {
        Ok(self.docs.read().unwrap().get(id).cloned())
    }

    async fn upsert_document(&self, doc: &DocumentRecord) -> Result<String> {
        self.docs
            .write()
            .unwrap()
            .insert(doc.id.clone(), doc.clone());
        Ok(doc.id.clone())
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        Ok(self.docs.write().unwrap().remove(id).is_some())
    }
}

const MEMORY_SCHEME: &str = "memory://";

/// In-memory blob storage. Retrieval URLs use the `memory://` scheme.
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a text blob directly.
    pub fn insert_text(&self, path: &str, text: &str) {
        self.blobs
            .write()
            .unwrap()
            .insert(path.to_string(), text.as_bytes().to_vec());
    }

    pub fn contains(&self, path: &str) -> bool {
        self.blobs.read().unwrap().contains_key(path)
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn retrieval_url(&self, path: &str) -> Result<String> {
        Ok(format!("{}{}", MEMORY_SCHEME, path))
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let path = url
            .strip_prefix(MEMORY_SCHEME)
            .ok_or_else(|| anyhow!("Not a memory URL: {}", url))?;
        let bytes = match self.blobs.read().unwrap().get(path) {
            Some(b) => b.clone(),
            None => bail!("Blob not found: {}", path),
        };
        Ok(String::from_utf8(bytes)?)
    }

    async fn put(&self, path: &str, bytes: Vec<u8>, _content_type: &str) -> Result<()> {
        self.blobs.write().unwrap().insert(path.to_string(), bytes);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.blobs.write().unwrap().remove(path);
        Ok(())
    }
}

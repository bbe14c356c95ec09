//! Opens the configured document store and blob store together.

use anyhow::Result;
use std::sync::Arc;

use docsift_core::models::DocumentRecord;
use docsift_core::store::{BlobStore, DocumentStore};

use crate::blob::build_blob_store;
use crate::config::Config;
use crate::sqlite_store::SqliteStore;
use crate::{db, migrate};

pub struct Backends {
    pub store: SqliteStore,
    pub blobs: Arc<dyn BlobStore>,
}

impl Backends {
    /// Connect to the database (creating the schema if needed) and build
    /// the blob backend from config.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply(&pool).await?;
        Ok(Self {
            store: SqliteStore::new(pool),
            blobs: build_blob_store(&config.blob)?,
        })
    }

    pub async fn close(&self) {
        self.store.close().await;
    }

    /// Delete a record and every blob it references.
    ///
    /// Returns `None` when the ID is unknown.
    pub async fn remove_document(&self, id: &str) -> Result<Option<DocumentRecord>> {
        let Some(doc) = self.store.get_document(id).await? else {
            return Ok(None);
        };
        for path in [&doc.storage_path, &doc.text_content_storage_path]
            .into_iter()
            .flatten()
        {
            self.blobs.delete(path).await?;
        }
        self.store.delete_document(id).await?;
        Ok(Some(doc))
    }
}

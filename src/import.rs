//! `docsift import`: load extracted records from a JSON file.
//!
//! The file holds an array of records in the same camelCase shape the
//! search API returns. Text extraction happens elsewhere; this is how its
//! output lands in the document store.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use docsift_core::models::DocumentRecord;
use docsift_core::store::DocumentStore;

use crate::backends::Backends;
use crate::config::Config;

/// Parse a JSON array of records.
pub fn read_records(path: &Path) -> Result<Vec<DocumentRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse document records from {}", path.display()))
}

/// Upsert every record into `store`. Returns the number stored.
pub async fn import_records<S>(store: &S, records: &[DocumentRecord]) -> Result<usize>
where
    S: DocumentStore + ?Sized,
{
    for doc in records {
        store.upsert_document(doc).await?;
    }
    Ok(records.len())
}

pub async fn run_import(config: &Config, path: &Path) -> Result<()> {
    let records = read_records(path)?;
    let backends = Backends::open(config).await?;
    let imported = import_records(&backends.store, &records).await;
    backends.close().await;
    let imported = imported?;

    info!(count = imported, file = %path.display(), "import complete");
    println!("Imported {} documents.", imported);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsift_core::models::DocumentStatus;
    use docsift_core::store::memory::InMemoryStore;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_import_camel_case_records() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("docs.json");
        std::fs::write(
            &path,
            r#"[
                {
                    "id": "inv-1",
                    "fileName": "invoice_2023.pdf",
                    "textContent": "Payment due. Thank you for your business.",
                    "createdAt": "2023-01-01T00:00:00Z",
                    "uploadedAt": "2023-01-02T00:00:00Z",
                    "pageCount": 2,
                    "status": "ready"
                },
                {
                    "id": "ext-1",
                    "fileName": "scan.pdf",
                    "textContentStoragePath": "texts/scan.txt",
                    "createdAt": "2023-01-01T00:00:00Z",
                    "uploadedAt": "2023-01-03T00:00:00Z"
                }
            ]"#,
        )
        .unwrap();

        let records = read_records(&path).unwrap();
        let store = InMemoryStore::new();
        assert_eq!(import_records(&store, &records).await.unwrap(), 2);

        let inv = store.get_document("inv-1").await.unwrap().unwrap();
        assert_eq!(inv.page_count, Some(2));
        assert_eq!(inv.status, DocumentStatus::Ready);
        let ext = store.get_document("ext-1").await.unwrap().unwrap();
        assert!(ext.needs_hydration());
        assert_eq!(ext.content_type, "application/octet-stream");
    }

    #[test]
    fn test_rejects_malformed_json() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.json");
        std::fs::write(&path, r#"{"id": "x"}"#).unwrap();
        assert!(read_records(&path).is_err());
    }
}

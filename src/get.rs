//! `docsift get`, `docsift list` and `docsift delete`.

use anyhow::{bail, Result};

use docsift_core::store::DocumentStore;

use crate::backends::Backends;
use crate::config::Config;

/// Print one record as JSON.
pub async fn run_get(config: &Config, id: &str) -> Result<()> {
    let backends = Backends::open(config).await?;
    let doc = backends.store.get_document(id).await;
    backends.close().await;

    match doc? {
        Some(doc) => {
            println!("{}", serde_json::to_string_pretty(&doc)?);
            Ok(())
        }
        None => bail!("document not found: {}", id),
    }
}

/// List every record, newest upload first.
pub async fn run_list(config: &Config, json: bool) -> Result<()> {
    let backends = Backends::open(config).await?;
    let docs = backends.store.list_documents().await;
    backends.close().await;
    let docs = docs?;

    if json {
        println!("{}", serde_json::to_string_pretty(&docs)?);
        return Ok(());
    }
    if docs.is_empty() {
        println!("No documents.");
        return Ok(());
    }
    for doc in &docs {
        println!(
            "{}  {:<10}  {}  {}",
            doc.id,
            doc.status.as_str(),
            doc.uploaded_at.format("%Y-%m-%d %H:%M"),
            doc.file_name
        );
    }
    Ok(())
}

pub async fn run_delete(config: &Config, id: &str) -> Result<()> {
    let backends = Backends::open(config).await?;
    let removed = backends.remove_document(id).await;
    backends.close().await;

    match removed? {
        Some(doc) => {
            println!("Deleted {} ({})", doc.id, doc.file_name);
            Ok(())
        }
        None => bail!("document not found: {}", id),
    }
}

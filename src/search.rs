//! `docsift search` and `docsift suggest`.

use anyhow::{bail, Result};

use docsift_core::models::{MatchMode, SearchField, SearchResult};
use docsift_core::search::{search, suggest, SearchRequest};

use crate::backends::Backends;
use crate::config::Config;

pub async fn run_search(
    config: &Config,
    query: &str,
    mode: &str,
    field: &str,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let mode: MatchMode = mode.parse()?;
    let field: SearchField = field.parse()?;
    if limit == Some(0) {
        bail!("--limit must be >= 1");
    }
    let params = config.search.params_with_limit(limit);

    let backends = Backends::open(config).await?;
    let request = SearchRequest {
        query,
        mode,
        field,
        params,
    };
    let results = search(&backends.store, &*backends.blobs, &request).await;
    backends.close().await;
    let results = results?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }
    for (i, result) in results.iter().enumerate() {
        print_result(i + 1, result);
    }
    Ok(())
}

fn print_result(rank: usize, result: &SearchResult) {
    let doc = &result.document;
    let title = doc.title.as_deref().unwrap_or("(untitled)");
    println!("{}. {} / {}", rank, doc.file_name, title);
    println!("    uploaded: {}", doc.uploaded_at.format("%Y-%m-%d"));
    if let Some(ref author) = doc.author {
        println!("    author: {}", author);
    }
    if let Some(ref snippet) = result.snippet {
        println!("    excerpt: \"{}\"", snippet.replace('\n', " ").trim());
    }
    if let Some(offset) = result.match_offset {
        match result.estimated_page {
            Some(page) => println!("    match: char {} (page {})", offset, page),
            None => println!("    match: char {}", offset),
        }
    }
    println!("    id: {}", doc.id);
    println!();
}

pub async fn run_suggest(config: &Config, partial: &str, json: bool) -> Result<()> {
    let backends = Backends::open(config).await?;
    let suggestions = suggest(&backends.store, partial, config.search.params().suggest_limit).await;
    backends.close().await;
    let suggestions = suggestions?;

    if json {
        println!("{}", serde_json::to_string_pretty(&suggestions)?);
        return Ok(());
    }
    for s in &suggestions {
        println!("{}\t{}", s.id, s.suggestion);
    }
    Ok(())
}

//! Search orchestration over a [`DocumentStore`] and a [`BlobStore`].
//!
//! The algorithm runs entirely through the store traits, with no database
//! or configuration dependencies. The calling application builds the
//! [`SearchParams`] from its config and passes the backends in.
//!
//! # Pipeline
//!
//! 1. Reject blank queries and queries with no letter or digit.
//! 2. Fetch the corpus, newest upload first.
//! 3. Hydrate records whose text lives in blob storage, concurrently.
//!    A failed fetch only leaves that record without text.
//! 4. Keep records whose selected fields match under the requested mode.
//! 5. Rank by fuzzy relevance.
//! 6. Truncate to `max_results`.
//! 7. Attach snippets, highlights, match offsets and page estimates.

use anyhow::{Context, Result};
use futures::future::join_all;
use tracing::{debug, warn};

use crate::highlight::highlight_all;
use crate::locate::{locate, DEFAULT_SNIPPET_RADIUS};
use crate::matcher::{matches, record_matches};
use crate::models::{DocumentRecord, MatchMode, SearchField, SearchResult, Suggestion};
use crate::rank::{rank, FieldWeights, DEFAULT_FUZZY_THRESHOLD};
use crate::segment::has_word;
use crate::store::{BlobStore, DocumentStore};

pub const DEFAULT_MAX_RESULTS: usize = 100;
pub const DEFAULT_SUGGEST_LIMIT: usize = 5;

/// Search tuning parameters, decoupled from application config.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    /// Context chars on each side of a snippet match.
    pub snippet_radius: usize,
    /// Maximum results returned by [`search`].
    pub max_results: usize,
    /// Maximum entries returned by [`suggest`].
    pub suggest_limit: usize,
    pub weights: FieldWeights,
    /// Fraction of the query that may be mistyped for a field to count in ranking.
    pub fuzzy_threshold: f64,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            snippet_radius: DEFAULT_SNIPPET_RADIUS,
            max_results: DEFAULT_MAX_RESULTS,
            suggest_limit: DEFAULT_SUGGEST_LIMIT,
            weights: FieldWeights::default(),
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

/// Bundles all inputs for a single search invocation.
#[derive(Debug, Clone)]
pub struct SearchRequest<'a> {
    pub query: &'a str,
    pub mode: MatchMode,
    pub field: SearchField,
    pub params: SearchParams,
}

impl<'a> SearchRequest<'a> {
    pub fn new(query: &'a str, mode: MatchMode, field: SearchField) -> Self {
        Self {
            query,
            mode,
            field,
            params: SearchParams::default(),
        }
    }
}

/// True if `query` is worth running: non-blank with at least one letter or digit.
pub fn is_searchable(query: &str) -> bool {
    !query.trim().is_empty() && has_word(query)
}

/// Run a search against the given backends.
///
/// Returns an empty list for unsearchable queries. Only a failure to fetch
/// the corpus is an error.
pub async fn search<S, B>(store: &S, blobs: &B, req: &SearchRequest<'_>) -> Result<Vec<SearchResult>>
where
    S: DocumentStore + ?Sized,
    B: BlobStore + ?Sized,
{
    let query = req.query.trim();
    if !is_searchable(query) {
        return Ok(Vec::new());
    }

    let mut corpus = store
        .list_documents()
        .await
        .context("Failed to fetch document corpus")?;
    let corpus_size = corpus.len();

    let hydrated = hydrate(blobs, &mut corpus).await;

    let filtered: Vec<DocumentRecord> = corpus
        .into_iter()
        .filter(|d| record_matches(d, query, req.mode, req.field))
        .collect();
    let matched = filtered.len();

    let mut ranked = rank(
        filtered,
        query,
        &req.params.weights,
        req.params.fuzzy_threshold,
    );
    ranked.truncate(req.params.max_results);

    debug!(
        query,
        mode = %req.mode,
        field = %req.field,
        corpus = corpus_size,
        hydrated,
        matched,
        returned = ranked.len(),
        "search complete"
    );

    Ok(ranked
        .into_iter()
        .map(|d| enrich(d, query, req.mode, req.params.snippet_radius))
        .collect())
}

/// Fill in `text_content` for records whose text lives in blob storage.
///
/// All fetches run concurrently. Each task reports back the index of its
/// own record, so results are written without shared mutable state. A
/// failed fetch is logged and leaves the record as it was. Returns the
/// number of records hydrated.
pub async fn hydrate<B>(blobs: &B, docs: &mut [DocumentRecord]) -> usize
where
    B: BlobStore + ?Sized,
{
    let jobs: Vec<(usize, String)> = docs
        .iter()
        .enumerate()
        .filter(|(_, d)| d.needs_hydration())
        .map(|(i, d)| (i, d.text_content_storage_path.clone().unwrap_or_default()))
        .collect();
    if jobs.is_empty() {
        return 0;
    }

    let fetches = jobs
        .into_iter()
        .map(|(i, path)| async move { (i, fetch_external_text(blobs, &path).await) });

    let mut hydrated = 0;
    for (i, result) in join_all(fetches).await {
        match result {
            Ok(text) => {
                docs[i].text_content = Some(text);
                hydrated += 1;
            }
            Err(e) => warn!(
                document_id = %docs[i].id,
                error = %e,
                "failed to hydrate text content; searching without it"
            ),
        }
    }
    hydrated
}

async fn fetch_external_text<B>(blobs: &B, path: &str) -> Result<String>
where
    B: BlobStore + ?Sized,
{
    let url = blobs
        .retrieval_url(path)
        .await
        .with_context(|| format!("No retrieval URL for {}", path))?;
    blobs
        .fetch_text(&url)
        .await
        .with_context(|| format!("Failed to fetch text from {}", path))
}

/// Page number for a match at `position` percent of a document.
///
/// Clamped to `[1, page_count]`; `None` without a page count.
pub fn estimate_page(position: f64, page_count: Option<u32>) -> Option<u32> {
    let pages = page_count.filter(|p| *p > 0)?;
    let page = (position / 100.0 * pages as f64).ceil() as u32;
    Some(page.clamp(1, pages))
}

/// Decorate a matching record with snippet, highlight and position data.
///
/// Content fields stay unset when the content has no locatable match.
pub fn enrich(doc: DocumentRecord, query: &str, mode: MatchMode, radius: usize) -> SearchResult {
    let content_match = doc.content().and_then(|t| locate(t, query, mode, radius));
    let highlighted_content = match (&content_match, doc.content()) {
        (Some(_), Some(text)) => Some(highlight_all(text, query, mode).into_string()),
        _ => None,
    };
    let highlighted_file_name = highlight_all(&doc.file_name, query, mode).into_string();
    let highlighted_author = doc
        .author
        .as_deref()
        .map(|a| highlight_all(a, query, mode).into_string());

    let (snippet, highlighted_snippet, match_offset, match_position, estimated_page) =
        match content_match {
            Some(info) => (
                Some(info.snippet),
                Some(info.highlighted_snippet.into_string()),
                Some(info.offset),
                Some(info.position),
                estimate_page(info.position, doc.page_count),
            ),
            None => (None, None, None, None, None),
        };

    SearchResult {
        document: doc,
        snippet,
        highlighted_snippet,
        highlighted_content,
        highlighted_file_name,
        highlighted_author,
        match_offset,
        match_position,
        estimated_page,
    }
}

/// File-name autocomplete.
///
/// A `contains` match on file names only, newest first, capped at `limit`.
/// No hydration and no ranking.
pub async fn suggest<S>(store: &S, partial: &str, limit: usize) -> Result<Vec<Suggestion>>
where
    S: DocumentStore + ?Sized,
{
    let partial = partial.trim();
    if !is_searchable(partial) {
        return Ok(Vec::new());
    }

    let corpus = store
        .list_documents()
        .await
        .context("Failed to fetch document corpus")?;

    Ok(corpus
        .into_iter()
        .filter(|d| matches(&d.file_name, partial, MatchMode::Contains))
        .take(limit)
        .map(|d| Suggestion {
            id: d.id,
            suggestion: d.file_name,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::{HIGHLIGHT_CLOSE, HIGHLIGHT_OPEN};
    use crate::store::memory::{InMemoryBlobStore, InMemoryStore};
    use async_trait::async_trait;
    use chrono::{Duration, Utc};

    fn doc(id: &str, name: &str, content: Option<&str>, age_mins: i64) -> DocumentRecord {
        let mut d = DocumentRecord::new(name, 100, "text/plain");
        d.id = id.to_string();
        d.text_content = content.map(str::to_string);
        d.uploaded_at = Utc::now() - Duration::minutes(age_mins);
        d
    }

    fn req(query: &str, mode: MatchMode, field: SearchField) -> SearchRequest<'_> {
        SearchRequest::new(query, mode, field)
    }

    #[tokio::test]
    async fn test_invoice_scenario() {
        let store = InMemoryStore::with_documents(vec![doc(
            "inv",
            "invoice_2023.pdf",
            Some("Payment due. Thank you for your business."),
            0,
        )]);
        let blobs = InMemoryBlobStore::new();

        let results = search(
            &store,
            &blobs,
            &req("Payment", MatchMode::Contains, SearchField::Content),
        )
        .await
        .unwrap();

        assert_eq!(results.len(), 1);
        let content = results[0].highlighted_content.as_deref().unwrap();
        assert!(content.contains(r#"<mark class="search-highlight">Payment</mark>"#));
        assert_eq!(results[0].match_offset, Some(0));
        assert!(results[0].highlighted_snippet.is_some());
    }

    #[tokio::test]
    async fn test_blank_and_punctuation_queries_return_nothing() {
        let store = InMemoryStore::with_documents(vec![doc("a", "a b.txt", Some("a . b ! c"), 0)]);
        let blobs = InMemoryBlobStore::new();
        for q in ["   ", "", "...", " ?! "] {
            let results = search(&store, &blobs, &req(q, MatchMode::Contains, SearchField::All))
                .await
                .unwrap();
            assert!(results.is_empty(), "query {:?} returned results", q);
        }
    }

    #[tokio::test]
    async fn test_result_cap() {
        let docs = (0..150).map(|i| doc(&format!("d{}", i), "report.txt", Some("quarterly report"), i));
        let store = InMemoryStore::with_documents(docs);
        let blobs = InMemoryBlobStore::new();

        let results = search(&store, &blobs, &req("report", MatchMode::Contains, SearchField::All))
            .await
            .unwrap();
        assert_eq!(results.len(), 100);
    }

    #[tokio::test]
    async fn test_hydrates_external_text() {
        let mut external = doc("ext", "scan.pdf", None, 0);
        external.text_content_storage_path = Some("texts/scan.txt".to_string());
        let store = InMemoryStore::with_documents(vec![external]);
        let blobs = InMemoryBlobStore::new();
        blobs.insert_text("texts/scan.txt", "Signed contract. Effective immediately.");

        let results = search(
            &store,
            &blobs,
            &req("effective immediately", MatchMode::EndsWith, SearchField::Content),
        )
        .await
        .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].highlighted_snippet.is_some());

        // hydration is in-memory only
        let stored = store.get_document("ext").await.unwrap().unwrap();
        assert!(stored.text_content.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_external_text_degrades() {
        let mut broken = doc("broken", "lost.pdf", Some(""), 0);
        broken.text_content_storage_path = Some("texts/missing.txt".to_string());
        let ok = doc("ok", "fine.txt", Some("the missing piece"), 1);
        let store = InMemoryStore::with_documents(vec![broken, ok]);
        let blobs = InMemoryBlobStore::new();

        let results = search(&store, &blobs, &req("missing", MatchMode::Contains, SearchField::All))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.id, "ok");

        // degraded, not dropped: it still matches on its file name
        let results = search(&store, &blobs, &req("lost", MatchMode::Contains, SearchField::All))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].snippet.is_none());
        assert!(results[0].highlighted_file_name.contains(HIGHLIGHT_OPEN));
    }

    struct FailingStore;

    #[async_trait]
    impl DocumentStore for FailingStore {
        async fn list_documents(&self) -> Result<Vec<DocumentRecord>> {
            anyhow::bail!("connection refused")
        }
        async fn get_document(&self, _id: &str) -> Result<Option<DocumentRecord>> {
            Ok(None)
        }
        async fn upsert_document(&self, doc: &DocumentRecord) -> Result<String> {
            Ok(doc.id.clone())
        }
        async fn delete_document(&self, _id: &str) -> Result<bool> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn test_corpus_failure_propagates() {
        let blobs = InMemoryBlobStore::new();
        let err = search(
            &FailingStore,
            &blobs,
            &req("anything", MatchMode::Contains, SearchField::All),
        )
        .await
        .unwrap_err();
        assert!(format!("{:#}", err).contains("connection refused"));
    }

    #[tokio::test]
    async fn test_field_scope_filters() {
        let mut by_author = doc("auth", "notes.txt", Some("nothing here"), 0);
        by_author.author = Some("Ada Lovelace".to_string());
        let by_content = doc("body", "other.txt", Some("Lovelace wrote this."), 1);
        let store = InMemoryStore::with_documents(vec![by_author, by_content]);
        let blobs = InMemoryBlobStore::new();

        let author_only = search(&store, &blobs, &req("lovelace", MatchMode::Contains, SearchField::Author))
            .await
            .unwrap();
        assert_eq!(author_only.len(), 1);
        assert_eq!(author_only[0].document.id, "auth");
        assert_eq!(
            author_only[0].highlighted_author.as_deref(),
            Some(format!("Ada {}Lovelace{}", HIGHLIGHT_OPEN, HIGHLIGHT_CLOSE).as_str())
        );
        assert!(author_only[0].highlighted_content.is_none());

        let all = search(&store, &blobs, &req("lovelace", MatchMode::Contains, SearchField::All))
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_ends_with_scenario() {
        let store = InMemoryStore::with_documents(vec![doc("t", "t.txt", Some("Thank you. Goodbye."), 0)]);
        let blobs = InMemoryBlobStore::new();
        let results = search(&store, &blobs, &req("Thank you", MatchMode::EndsWith, SearchField::Content))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_estimate_page() {
        assert_eq!(estimate_page(0.0, Some(10)), Some(1));
        assert_eq!(estimate_page(55.0, Some(10)), Some(6));
        assert_eq!(estimate_page(99.9, Some(10)), Some(10));
        assert_eq!(estimate_page(50.0, None), None);
        assert_eq!(estimate_page(50.0, Some(0)), None);
    }

    #[test]
    fn test_enrich_sets_page() {
        let mut d = doc("p", "book.txt", Some("aaaa aaaa. target here."), 0);
        d.page_count = Some(4);
        let r = enrich(d, "target", MatchMode::StartsWith, 220);
        assert_eq!(r.match_offset, Some(11));
        assert_eq!(r.estimated_page, Some(2));
    }

    #[tokio::test]
    async fn test_suggest() {
        let docs = (0..8).map(|i| doc(&format!("d{}", i), &format!("report_{}.pdf", i), None, i));
        let mut store_docs: Vec<DocumentRecord> = docs.collect();
        store_docs.push(doc("x", "invoice.pdf", Some("report inside content"), 0));
        let store = InMemoryStore::with_documents(store_docs);

        let out = suggest(&store, "REPORT", 5).await.unwrap();
        assert_eq!(out.len(), 5);
        assert_eq!(out[0].suggestion, "report_0.pdf");
        assert!(out.iter().all(|s| s.suggestion.starts_with("report_")));

        assert!(suggest(&store, "  ", 5).await.unwrap().is_empty());
    }
}

//! Core data models shared by the search engine, the stores, and the
//! upload pipeline.
//!
//! [`DocumentRecord`] is the unit stored in the document collection.
//! [`SearchResult`] is a record decorated with highlight and match metadata
//! for a single search response; it is never persisted.

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Processing state of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Placeholder created, bytes still in flight.
    #[default]
    Uploading,
    /// Bytes stored, waiting for text extraction.
    Processing,
    /// Text extraction finished.
    Ready,
    /// Upload gave up after retries.
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Uploading => "uploading",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Ready => "ready",
            DocumentStatus::Failed => "failed",
        }
    }
}

impl FromStr for DocumentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "uploading" => Ok(DocumentStatus::Uploading),
            "processing" => Ok(DocumentStatus::Processing),
            "ready" => Ok(DocumentStatus::Ready),
            "failed" => Ok(DocumentStatus::Failed),
            other => bail!("Unknown document status: {}", other),
        }
    }
}

/// Searchable metadata for one uploaded file.
///
/// A record with neither `text_content` nor `text_content_storage_path`
/// has no searchable text and never matches on content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: String,
    pub file_name: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text_content: Option<String>,
    #[serde(default)]
    pub text_content_storage_path: Option<String>,
    #[serde(default)]
    pub storage_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default)]
    pub page_count: Option<u32>,
    #[serde(default)]
    pub size: u64,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default)]
    pub status: DocumentStatus,
    #[serde(default)]
    pub error: Option<String>,
}

fn default_content_type() -> String {
    "application/octet-stream".to_string()
}

impl DocumentRecord {
    /// Create a placeholder record with a fresh UUID, stamped now.
    pub fn new(file_name: impl Into<String>, size: u64, content_type: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            file_name: file_name.into(),
            author: None,
            title: None,
            text_content: None,
            text_content_storage_path: None,
            storage_path: None,
            created_at: now,
            uploaded_at: now,
            page_count: None,
            size,
            content_type: content_type.into(),
            status: DocumentStatus::Uploading,
            error: None,
        }
    }

    /// Inline text, treating an empty string as absent.
    pub fn content(&self) -> Option<&str> {
        self.text_content.as_deref().filter(|t| !t.is_empty())
    }

    /// True when the text must be fetched from blob storage before searching.
    pub fn needs_hydration(&self) -> bool {
        self.content().is_none()
            && self
                .text_content_storage_path
                .as_deref()
                .is_some_and(|p| !p.is_empty())
    }
}

/// How a query must line up with the text it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum MatchMode {
    /// Case-insensitive substring anywhere.
    #[default]
    Contains,
    /// Query begins some sentence.
    StartsWith,
    /// Query ends some sentence.
    EndsWith,
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchMode::Contains => "contains",
            MatchMode::StartsWith => "startsWith",
            MatchMode::EndsWith => "endsWith",
        })
    }
}

impl FromStr for MatchMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "contains" => Ok(MatchMode::Contains),
            "startsWith" | "starts-with" | "starts_with" => Ok(MatchMode::StartsWith),
            "endsWith" | "ends-with" | "ends_with" => Ok(MatchMode::EndsWith),
            other => bail!(
                "Unknown match mode: {}. Use contains, startsWith, or endsWith.",
                other
            ),
        }
    }
}

/// Which record attributes a query is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SearchField {
    /// Content, file name, author or title.
    #[default]
    All,
    Content,
    FileName,
    Author,
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SearchField::All => "all",
            SearchField::Content => "content",
            SearchField::FileName => "fileName",
            SearchField::Author => "author",
        })
    }
}

impl FromStr for SearchField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(SearchField::All),
            "content" => Ok(SearchField::Content),
            "fileName" | "file-name" | "file_name" => Ok(SearchField::FileName),
            "author" => Ok(SearchField::Author),
            other => bail!(
                "Unknown search field: {}. Use all, content, fileName, or author.",
                other
            ),
        }
    }
}

/// A [`DocumentRecord`] decorated with match and highlight data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    #[serde(flatten)]
    pub document: DocumentRecord,
    /// Plain-text window around the first content match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    /// The same window with the match wrapped in a highlight marker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlighted_snippet: Option<String>,
    /// Full content with every match wrapped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlighted_content: Option<String>,
    pub highlighted_file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlighted_author: Option<String>,
    /// Character offset of the first content match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_offset: Option<usize>,
    /// `match_offset / content length * 100`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_position: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_page: Option<u32>,
}

/// Autocomplete entry produced by [`suggest`](crate::search::suggest).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub id: String,
    pub suggestion: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_json_uses_camel_case() {
        let mut doc = DocumentRecord::new("report.pdf", 42, "application/pdf");
        doc.text_content_storage_path = Some("texts/report.txt".to_string());
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["fileName"], "report.pdf");
        assert_eq!(json["textContentStoragePath"], "texts/report.txt");
        assert_eq!(json["status"], "uploading");
    }

    #[test]
    fn test_record_deserializes_with_defaults() {
        let doc: DocumentRecord = serde_json::from_str(
            r#"{"id":"d1","fileName":"a.txt","createdAt":"2024-01-01T00:00:00Z","uploadedAt":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(doc.status, DocumentStatus::Uploading);
        assert_eq!(doc.content_type, "application/octet-stream");
        assert!(doc.text_content.is_none());
    }

    #[test]
    fn test_needs_hydration() {
        let mut doc = DocumentRecord::new("a.pdf", 1, "application/pdf");
        assert!(!doc.needs_hydration());
        doc.text_content_storage_path = Some("texts/a.txt".to_string());
        assert!(doc.needs_hydration());
        doc.text_content = Some(String::new());
        assert!(doc.needs_hydration());
        doc.text_content = Some("body".to_string());
        assert!(!doc.needs_hydration());
    }

    #[test]
    fn test_mode_and_field_parse() {
        assert_eq!("startsWith".parse::<MatchMode>().unwrap(), MatchMode::StartsWith);
        assert_eq!("ends-with".parse::<MatchMode>().unwrap(), MatchMode::EndsWith);
        assert!("fuzzy".parse::<MatchMode>().is_err());
        assert_eq!("fileName".parse::<SearchField>().unwrap(), SearchField::FileName);
        assert!("title".parse::<SearchField>().is_err());
        assert_eq!(MatchMode::EndsWith.to_string(), "endsWith");
    }
}

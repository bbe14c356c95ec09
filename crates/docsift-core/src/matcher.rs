//! Match predicates for the three [`MatchMode`]s.
//!
//! All comparisons are case-insensitive using Unicode lowercasing. Because
//! lowercasing can change the byte length of a string (`İ` becomes `i̇`),
//! matching runs against a [`Folded`] copy of the text that remembers which
//! original character every folded byte came from. Every range this module
//! returns is expressed in byte offsets of the *original* text.
//!
//! Anchored modes work sentence by sentence (see [`crate::segment`]):
//!
//! - `startsWith`: the sentence, with leading punctuation and whitespace
//!   stripped, starts with the query.
//! - `endsWith`: the sentence, with trailing punctuation and whitespace
//!   stripped, ends with the query.
//!
//! [`matches`], [`find_first`] and [`find_all`] share [`anchored_match`],
//! so a field that matches always has a locatable range.

use std::ops::Range;

use crate::models::{DocumentRecord, MatchMode, SearchField};
use crate::segment::{sentences, Span};

/// A lowercased copy of a text with a map back to the original.
#[derive(Debug, Clone)]
pub struct Folded {
    pub lower: String,
    /// For every byte of `lower`: the `[start, end)` bytes of the original char.
    origin: Vec<(usize, usize)>,
}

impl Folded {
    pub fn new(text: &str) -> Self {
        let mut lower = String::with_capacity(text.len());
        let mut origin = Vec::with_capacity(text.len());
        for (i, c) in text.char_indices() {
            let end = i + c.len_utf8();
            for lc in c.to_lowercase().map(unify_sigma) {
                lower.push(lc);
                origin.extend(std::iter::repeat((i, end)).take(lc.len_utf8()));
            }
        }
        Self { lower, origin }
    }

    /// Map a non-empty folded byte range to the original text.
    pub fn to_original(&self, range: Range<usize>) -> Range<usize> {
        debug_assert!(range.start < range.end && range.end <= self.origin.len());
        self.origin[range.start].0..self.origin[range.end - 1].1
    }
}

/// Word-final sigma compares equal to `σ`, which is what `Σ` lowercases to.
fn unify_sigma(c: char) -> char {
    if c == 'ς' {
        'σ'
    } else {
        c
    }
}

/// Lowercase a query the same way [`Folded`] lowercases text.
pub fn fold(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(unify_sigma)
        .collect()
}

/// Characters stripped from sentence edges before an anchored comparison.
pub fn is_edge_noise(c: char) -> bool {
    c.is_whitespace()
        || c.is_ascii_punctuation()
        || matches!(
            c,
            '\u{2018}'..='\u{201F}' | '\u{2026}' | '\u{00AB}' | '\u{00BB}' | '\u{00BF}' | '\u{00A1}'
        )
}

/// Anchored match of an already-folded query inside one sentence.
///
/// Returns the matched range in original-text offsets (the sentence's own
/// offsets are added), or `None` if the sentence does not qualify.
/// `Contains` is not anchored and always returns `None` here.
pub fn anchored_match(span: &Span<'_>, query_lower: &str, mode: MatchMode) -> Option<Range<usize>> {
    if query_lower.is_empty() {
        return None;
    }
    match mode {
        MatchMode::Contains => None,
        MatchMode::StartsWith => {
            let trimmed = span.text.trim_start_matches(is_edge_noise);
            let lead = span.text.len() - trimmed.len();
            let folded = Folded::new(trimmed);
            if !folded.lower.starts_with(query_lower) {
                return None;
            }
            let r = folded.to_original(0..query_lower.len());
            let base = span.start + lead;
            Some(base + r.start..base + r.end)
        }
        MatchMode::EndsWith => {
            let trimmed = span.text.trim_end_matches(is_edge_noise);
            let folded = Folded::new(trimmed);
            if !folded.lower.ends_with(query_lower) {
                return None;
            }
            let len = folded.lower.len();
            let r = folded.to_original(len - query_lower.len()..len);
            Some(span.start + r.start..span.start + r.end)
        }
    }
}

/// Does `field` satisfy `query` under `mode`?
///
/// A blank query never matches.
pub fn matches(field: &str, query: &str, mode: MatchMode) -> bool {
    if query.trim().is_empty() || field.is_empty() {
        return false;
    }
    let q = fold(query);
    match mode {
        MatchMode::Contains => fold(field).contains(&q),
        _ => sentences(field).any(|s| anchored_match(&s, &q, mode).is_some()),
    }
}

/// First matching range in document order.
pub fn find_first(text: &str, query: &str, mode: MatchMode) -> Option<Range<usize>> {
    if query.trim().is_empty() || text.is_empty() {
        return None;
    }
    let q = fold(query);
    match mode {
        MatchMode::Contains => {
            let folded = Folded::new(text);
            let at = folded.lower.find(&q)?;
            Some(folded.to_original(at..at + q.len()))
        }
        _ => sentences(text).find_map(|s| anchored_match(&s, &q, mode)),
    }
}

/// Every matching range, left to right.
///
/// `Contains` occurrences do not overlap each other; anchored ranges come
/// one per qualifying sentence.
pub fn find_all(text: &str, query: &str, mode: MatchMode) -> Vec<Range<usize>> {
    if query.trim().is_empty() || text.is_empty() {
        return Vec::new();
    }
    let q = fold(query);
    match mode {
        MatchMode::Contains => {
            let folded = Folded::new(text);
            let mut ranges = Vec::new();
            let mut pos = 0;
            while let Some(i) = folded.lower[pos..].find(&q) {
                let at = pos + i;
                ranges.push(folded.to_original(at..at + q.len()));
                pos = at + q.len();
            }
            ranges
        }
        _ => sentences(text)
            .filter_map(|s| anchored_match(&s, &q, mode))
            .collect(),
    }
}

/// Evaluate a query against the record attributes selected by `scope`.
///
/// `All` matches if any of content, file name, author or title matches.
pub fn record_matches(
    doc: &DocumentRecord,
    query: &str,
    mode: MatchMode,
    scope: SearchField,
) -> bool {
    let content = || doc.content().is_some_and(|t| matches(t, query, mode));
    let file_name = || matches(&doc.file_name, query, mode);
    let author = || doc.author.as_deref().is_some_and(|a| matches(a, query, mode));
    let title = || doc.title.as_deref().is_some_and(|t| matches(t, query, mode));

    match scope {
        SearchField::All => content() || file_name() || author() || title(),
        SearchField::Content => content(),
        SearchField::FileName => file_name(),
        SearchField::Author => author(),
    }
}

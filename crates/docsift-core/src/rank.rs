//! Fuzzy relevance ranking.
//!
//! Ranking only reorders: [`rank`] always returns a permutation of its
//! input. Each field is scored with approximate substring matching
//! (edit distance of the query against the best-matching substring of the
//! field), weighted per field, and the weighted sum orders the candidates.
//!
//! # Algorithm
//!
//! 1. Fold query and fields to lowercase.
//! 2. Per field, `similarity = 1 - distance / query_len`; for multi-word
//!    queries the mean per-word similarity is used when it is higher.
//! 3. A field is a hit when `1 - similarity <= threshold`.
//! 4. `score = Σ weight × similarity (hit fields) / Σ weight`.
//! 5. Hits sort by score descending, stable on ties; records without any
//!    hit follow in their original order.
//! 6. If nothing hits at all, the original order is returned unchanged.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::matcher::fold;
use crate::models::DocumentRecord;
use crate::segment::words;

/// Fields longer than this are scored on their leading chars only.
pub const MAX_SCORED_CHARS: usize = 100_000;

/// Default tolerance: a field hits with up to 40% of the query mistyped.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.4;

/// Relative importance of each field in the relevance score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldWeights {
    #[serde(default = "default_content_weight")]
    pub content: f64,
    #[serde(default = "default_file_name_weight")]
    pub file_name: f64,
    #[serde(default = "default_title_weight")]
    pub title: f64,
    #[serde(default = "default_author_weight")]
    pub author: f64,
}

fn default_content_weight() -> f64 {
    0.6
}
fn default_file_name_weight() -> f64 {
    0.2
}
fn default_title_weight() -> f64 {
    0.15
}
fn default_author_weight() -> f64 {
    0.05
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self {
            content: default_content_weight(),
            file_name: default_file_name_weight(),
            title: default_title_weight(),
            author: default_author_weight(),
        }
    }
}

impl FieldWeights {
    pub fn total(&self) -> f64 {
        self.content + self.file_name + self.title + self.author
    }
}

/// Smallest edit distance between `pattern` and any substring of `text`.
///
/// Semi-global Levenshtein: starting and ending anywhere in `text` is free.
pub fn substring_distance(pattern: &[char], text: &[char]) -> usize {
    if pattern.is_empty() {
        return 0;
    }
    if text.is_empty() {
        return pattern.len();
    }

    // prev[j]: distance of pattern[..i] ending at text[..j]
    let mut prev: Vec<usize> = vec![0; text.len() + 1];
    let mut curr: Vec<usize> = vec![0; text.len() + 1];
    for (i, pc) in pattern.iter().enumerate() {
        curr[0] = i + 1;
        for (j, tc) in text.iter().enumerate() {
            let cost = if pc == tc { 0 } else { 1 };
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev.into_iter().min().unwrap_or(pattern.len())
}

fn chars_capped(text: &str) -> Vec<char> {
    text.chars().take(MAX_SCORED_CHARS).collect()
}

fn similarity(pattern: &[char], text: &[char]) -> f64 {
    if pattern.is_empty() {
        return 0.0;
    }
    let d = substring_distance(pattern, text).min(pattern.len());
    1.0 - d as f64 / pattern.len() as f64
}

/// Fuzzy similarity of an already-folded query against a raw field, in `[0, 1]`.
pub fn field_similarity(field: &str, query_lower: &str) -> f64 {
    let text = chars_capped(&fold(field));
    let whole: Vec<char> = query_lower.chars().collect();
    let mut best = similarity(&whole, &text);

    let terms: Vec<Vec<char>> = words(query_lower).map(|w| w.text.chars().collect()).collect();
    if terms.len() > 1 {
        let mean = terms.iter().map(|t| similarity(t, &text)).sum::<f64>() / terms.len() as f64;
        best = best.max(mean);
    }
    best
}

/// Weighted relevance of a record, or `None` if no field is a hit.
pub fn score_record(
    doc: &DocumentRecord,
    query_lower: &str,
    weights: &FieldWeights,
    threshold: f64,
) -> Option<f64> {
    let total = weights.total();
    if total <= 0.0 {
        return None;
    }

    let fields = [
        (doc.content(), weights.content),
        (Some(doc.file_name.as_str()), weights.file_name),
        (doc.title.as_deref(), weights.title),
        (doc.author.as_deref(), weights.author),
    ];

    let mut sum = 0.0;
    let mut hit = false;
    for (value, weight) in fields {
        let Some(value) = value.filter(|v| !v.is_empty()) else {
            continue;
        };
        let sim = field_similarity(value, query_lower);
        if 1.0 - sim <= threshold {
            hit = true;
            sum += weight * sim;
        }
    }
    hit.then_some(sum / total)
}

/// Reorder `candidates` by fuzzy relevance to `query`.
///
/// Never adds or drops records.
pub fn rank(
    candidates: Vec<DocumentRecord>,
    query: &str,
    weights: &FieldWeights,
    threshold: f64,
) -> Vec<DocumentRecord> {
    let query_lower = fold(query.trim());
    if candidates.len() < 2 || query_lower.is_empty() {
        return candidates;
    }

    let scores: Vec<Option<f64>> = candidates
        .iter()
        .map(|d| score_record(d, &query_lower, weights, threshold))
        .collect();

    let mut hits: Vec<(usize, f64)> = scores
        .iter()
        .enumerate()
        .filter_map(|(i, s)| s.map(|s| (i, s)))
        .collect();

    if hits.is_empty() {
        debug!(
            candidates = candidates.len(),
            "fuzzy ranking found no hits; keeping filter order"
        );
        return candidates;
    }

    hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let order = hits
        .iter()
        .map(|(i, _)| *i)
        .chain(scores.iter().enumerate().filter(|(_, s)| s.is_none()).map(|(i, _)| i));

    let mut slots: Vec<Option<DocumentRecord>> = candidates.into_iter().map(Some).collect();
    order.filter_map(|i| slots[i].take()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, name: &str, content: Option<&str>) -> DocumentRecord {
        let mut d = DocumentRecord::new(name, 1, "text/plain");
        d.id = id.to_string();
        d.text_content = content.map(str::to_string);
        d
    }

    fn ids(docs: &[DocumentRecord]) -> Vec<&str> {
        docs.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn test_substring_distance() {
        let c = |s: &str| s.chars().collect::<Vec<_>>();
        assert_eq!(substring_distance(&c("pay"), &c("xx payment")), 0);
        assert_eq!(substring_distance(&c("paymnet"), &c("the payment is due")), 2);
        assert_eq!(substring_distance(&c("abc"), &c("")), 3);
        assert_eq!(substring_distance(&c(""), &c("abc")), 0);
    }

    #[test]
    fn test_field_similarity_range() {
        assert_eq!(field_similarity("Payment due", "payment"), 1.0);
        let s = field_similarity("zzzz", "payment");
        assert!((0.0..=1.0).contains(&s));
        assert!(s < 0.5);
    }

    #[test]
    fn test_multi_word_uses_per_word_mean() {
        let s = field_similarity("the business was paid quickly", "paid business");
        assert_eq!(s, 1.0);
    }

    #[test]
    fn test_rank_is_permutation() {
        let input = vec![
            doc("a", "notes.txt", Some("nothing relevant")),
            doc("b", "payment.pdf", Some("payment overdue")),
            doc("c", "misc.doc", None),
            doc("d", "pay.txt", Some("pay slip")),
        ];
        let out = rank(input.clone(), "payment", &FieldWeights::default(), 0.4);
        assert_eq!(out.len(), input.len());
        let mut a = ids(&input);
        let mut b = ids(&out);
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }

    #[test]
    fn test_better_match_ranks_first() {
        let input = vec![
            doc("weak", "other.txt", Some("a paymnt was made")),
            doc("strong", "payment.txt", Some("payment received")),
        ];
        let out = rank(input, "payment", &FieldWeights::default(), 0.4);
        assert_eq!(ids(&out), vec!["strong", "weak"]);
    }

    #[test]
    fn test_non_hits_keep_order_after_hits() {
        let input = vec![
            doc("x", "aaa.txt", Some("qqqq")),
            doc("hit", "invoice.pdf", Some("invoice")),
            doc("y", "bbb.txt", Some("wwww")),
        ];
        let out = rank(input, "invoice", &FieldWeights::default(), 0.4);
        assert_eq!(ids(&out), vec!["hit", "x", "y"]);
    }

    #[test]
    fn test_zero_hits_falls_back_to_input_order() {
        let input = vec![
            doc("first", "aaa.txt", Some("qqqq")),
            doc("second", "bbb.txt", Some("wwww")),
            doc("third", "ccc.txt", None),
        ];
        let out = rank(input, "invoice", &FieldWeights::default(), 0.0);
        assert_eq!(ids(&out), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_ties_are_stable() {
        let input = vec![
            doc("one", "report.txt", Some("report")),
            doc("two", "report.txt", Some("report")),
        ];
        let out = rank(input, "report", &FieldWeights::default(), 0.4);
        assert_eq!(ids(&out), vec!["one", "two"]);
    }

    #[test]
    fn test_content_weight_dominates() {
        let input = vec![
            doc("name", "budget.xlsx", Some("unrelated words")),
            doc("body", "file.txt", Some("the budget for next year")),
        ];
        let out = rank(input, "budget", &FieldWeights::default(), 0.4);
        assert_eq!(ids(&out), vec!["body", "name"]);
    }
}

//! Match location and snippet extraction.
//!
//! [`locate`] finds the first qualifying match (the same one
//! [`matcher::matches`](crate::matcher::matches) reports) and builds a
//! bounded context window around it.

use std::ops::Range;

use crate::highlight::{highlight_window, Highlighted, ELLIPSIS};
use crate::matcher::find_first;
use crate::models::MatchMode;

/// Context characters kept on each side of a match.
pub const DEFAULT_SNIPPET_RADIUS: usize = 220;

/// Where a query matched inside a text, plus the rendered snippet.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchInfo {
    /// Byte range of the match in the full text.
    pub range: Range<usize>,
    /// Character offset of the match start.
    pub offset: usize,
    /// `offset / char length * 100`, in `[0, 100)`.
    pub position: f64,
    /// Plain-text window with ellipsis markers.
    pub snippet: String,
    /// Window with the match wrapped in a highlight marker.
    pub highlighted_snippet: Highlighted,
}

/// Byte index of the `n`-th char, or `text.len()` past the end.
fn byte_at_char(text: &str, n: usize) -> usize {
    text.char_indices()
        .nth(n)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Locate the first match of `query` in `text` and cut a snippet window of
/// `radius` chars on each side, clamped to the text.
///
/// Returns `None` exactly when the match predicate is false.
pub fn locate(text: &str, query: &str, mode: MatchMode, radius: usize) -> Option<MatchInfo> {
    let range = find_first(text, query, mode)?;

    let total_chars = text.chars().count();
    let offset = text[..range.start].chars().count();
    let match_chars = text[range.clone()].chars().count();
    let position = if total_chars == 0 {
        0.0
    } else {
        offset as f64 / total_chars as f64 * 100.0
    };

    let window_start = byte_at_char(text, offset.saturating_sub(radius));
    let window_end = byte_at_char(text, (offset + match_chars + radius).min(total_chars));
    let window = window_start..window_end;

    let mut snippet = String::with_capacity(window_end - window_start + 2 * ELLIPSIS.len());
    if window.start > 0 {
        snippet.push_str(ELLIPSIS);
    }
    snippet.push_str(&text[window.clone()]);
    if window.end < text.len() {
        snippet.push_str(ELLIPSIS);
    }

    let highlighted_snippet = highlight_window(text, window, range.clone());

    Some(MatchInfo {
        range,
        offset,
        position,
        snippet,
        highlighted_snippet,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::{HIGHLIGHT_CLOSE, HIGHLIGHT_OPEN};
    use crate::matcher::matches;

    #[test]
    fn test_short_text_no_ellipsis() {
        let info = locate("Payment due. Thank you.", "thank", MatchMode::Contains, 220).unwrap();
        assert_eq!(info.offset, 13);
        assert_eq!(info.snippet, "Payment due. Thank you.");
        assert_eq!(
            info.highlighted_snippet.as_str(),
            format!("Payment due. {}Thank{} you.", HIGHLIGHT_OPEN, HIGHLIGHT_CLOSE)
        );
    }

    #[test]
    fn test_window_is_clamped_with_ellipsis() {
        let text = format!("{}needle{}", "a".repeat(500), "b".repeat(500));
        let info = locate(&text, "needle", MatchMode::Contains, 220).unwrap();
        assert_eq!(info.offset, 500);
        let expected = format!("...{}needle{}...", "a".repeat(220), "b".repeat(220));
        assert_eq!(info.snippet, expected);
        assert!((info.position - 500.0 / 1006.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_radius_counts_chars_not_bytes() {
        let text = format!("{}Ziel", "ü".repeat(10));
        let info = locate(&text, "ziel", MatchMode::Contains, 3).unwrap();
        assert_eq!(info.offset, 10);
        assert_eq!(info.snippet, "...üüüZiel");
    }

    #[test]
    fn test_anchored_locate_picks_first_qualifying_sentence() {
        let text = "The end is near. End of story. end";
        let info = locate(text, "end", MatchMode::StartsWith, 220).unwrap();
        assert_eq!(&text[info.range.clone()], "End");
        assert_eq!(info.offset, 17);
    }

    #[test]
    fn test_ends_with_offset() {
        let text = "Thank you. Goodbye.";
        let info = locate(text, "Thank you", MatchMode::EndsWith, 220).unwrap();
        assert_eq!(info.range, 0..9);
        assert_eq!(info.position, 0.0);
    }

    #[test]
    fn test_none_iff_no_match() {
        let text = "Hello world. Goodbye now.";
        for q in ["hello", "world", "now", "goodbye", "missing"] {
            for mode in [MatchMode::Contains, MatchMode::StartsWith, MatchMode::EndsWith] {
                assert_eq!(locate(text, q, mode, 10).is_some(), matches(text, q, mode));
            }
        }
    }
}

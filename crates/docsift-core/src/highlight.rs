//! HTML highlight rendering.
//!
//! Matched ranges are wrapped in [`HIGHLIGHT_OPEN`] / [`HIGHLIGHT_CLOSE`].
//! Everything else is HTML-escaped, so a file name such as
//! `<img src=x onerror=...>.pdf` renders as text rather than markup.
//!
//! Renderers take raw text and return [`Highlighted`] markup. Markup is a
//! distinct type, so it cannot be passed back in as text without an
//! explicit `as_str()`; highlighting is therefore always a single pass over
//! the raw field.

use std::fmt;
use std::ops::Range;

use serde::Serialize;

use crate::matcher::find_all;
use crate::models::MatchMode;

pub const HIGHLIGHT_OPEN: &str = r#"<mark class="search-highlight">"#;
pub const HIGHLIGHT_CLOSE: &str = "</mark>";
/// Marker for a snippet window that does not reach the edge of the text.
pub const ELLIPSIS: &str = "...";

/// HTML markup produced by the renderers in this module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Highlighted(String);

impl Highlighted {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Highlighted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Highlighted> for String {
    fn from(h: Highlighted) -> Self {
        h.0
    }
}

/// Escape the five HTML-significant characters.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    push_escaped(&mut out, text);
    out
}

fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

fn is_valid(text: &str, r: &Range<usize>) -> bool {
    r.start < r.end
        && r.end <= text.len()
        && text.is_char_boundary(r.start)
        && text.is_char_boundary(r.end)
}

/// Wrap `ranges` of `text` in highlight markers.
///
/// Ranges are sorted by start offset; a range that starts inside one
/// already emitted is skipped, so the output never nests markers.
pub fn wrap_ranges(text: &str, mut ranges: Vec<Range<usize>>) -> Highlighted {
    ranges.sort_by_key(|r| (r.start, r.end));

    let mut out = String::with_capacity(text.len() + ranges.len() * 40);
    let mut cursor = 0;
    for r in ranges {
        if r.start < cursor || !is_valid(text, &r) {
            continue;
        }
        push_escaped(&mut out, &text[cursor..r.start]);
        out.push_str(HIGHLIGHT_OPEN);
        push_escaped(&mut out, &text[r.clone()]);
        out.push_str(HIGHLIGHT_CLOSE);
        cursor = r.end;
    }
    push_escaped(&mut out, &text[cursor..]);
    Highlighted(out)
}

/// Highlight exactly one range.
pub fn highlight_range(text: &str, range: Range<usize>) -> Highlighted {
    wrap_ranges(text, vec![range])
}

/// Highlight every match of `query` in `text`.
///
/// An empty field or blank query yields the escaped field with no markers.
pub fn highlight_all(text: &str, query: &str, mode: MatchMode) -> Highlighted {
    if text.is_empty() || query.trim().is_empty() {
        return Highlighted(escape_html(text));
    }
    wrap_ranges(text, find_all(text, query, mode))
}

/// Render the `window` of `text` with `hit` highlighted.
///
/// [`ELLIPSIS`] is added on each side where the window stops short of the
/// text boundary. `hit` is in offsets of the full text.
pub fn highlight_window(text: &str, window: Range<usize>, hit: Range<usize>) -> Highlighted {
    let slice = &text[window.clone()];
    let local = hit.start.saturating_sub(window.start)..hit.end.saturating_sub(window.start);
    let inner = highlight_range(slice, local);

    let mut out = String::with_capacity(inner.0.len() + 2 * ELLIPSIS.len());
    if window.start > 0 {
        out.push_str(ELLIPSIS);
    }
    out.push_str(&inner.0);
    if window.end < text.len() {
        out.push_str(ELLIPSIS);
    }
    Highlighted(out)
}

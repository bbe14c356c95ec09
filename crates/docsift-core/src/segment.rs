//! Sentence and word segmentation with byte offsets.
//!
//! Both iterators are lazy and borrow the source text. They are `Clone`,
//! so a caller can restart a scan from the beginning without re-reading
//! the text.
//!
//! # Sentence boundaries
//!
//! A sentence ends after a run of one or more terminal marks (`.`, `!`,
//! `?`) that is followed by whitespace or the end of the text. Spans never
//! include the whitespace around them, so `span.text` is exactly
//! `&text[span.start..span.end]`. Text after the last boundary becomes the
//! final span, and text with no boundary at all is a single span.
//!
//! ```rust
//! use docsift_core::segment::sentences;
//!
//! let spans: Vec<_> = sentences("Payment due. Thank you!").map(|s| s.text).collect();
//! assert_eq!(spans, vec!["Payment due.", "Thank you!"]);
//! ```

/// A slice of a text field together with its `[start, end)` byte offsets.
///
/// Offsets always fall on UTF-8 char boundaries of the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

/// A sentence produced by [`sentences`].
pub type SentenceSpan<'a> = Span<'a>;

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Iterator over the sentences of a text. See [`sentences`].
#[derive(Debug, Clone)]
pub struct Sentences<'a> {
    text: &'a str,
    pos: usize,
}

/// Split `text` into sentence spans.
///
/// Empty and whitespace-only text yields no spans.
pub fn sentences(text: &str) -> Sentences<'_> {
    Sentences { text, pos: 0 }
}

impl<'a> Sentences<'a> {
    /// Byte index just past the terminal run that closes the sentence
    /// starting at `from`, or the end of the text.
    fn boundary_after(&self, from: usize) -> usize {
        let mut run_end: Option<usize> = None;
        for (i, c) in self.text[from..].char_indices() {
            if is_terminal(c) {
                run_end = Some(from + i + c.len_utf8());
            } else if let Some(end) = run_end {
                if c.is_whitespace() {
                    return end;
                }
                run_end = None;
            }
        }
        self.text.len()
    }
}

impl<'a> Iterator for Sentences<'a> {
    type Item = SentenceSpan<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.text[self.pos..];
        let start = self.pos + (rest.len() - rest.trim_start().len());
        if start >= self.text.len() {
            self.pos = self.text.len();
            return None;
        }

        let end = self.boundary_after(start);
        self.pos = end;

        let sentence = self.text[start..end].trim_end();
        Some(Span {
            text: sentence,
            start,
            end: start + sentence.len(),
        })
    }
}

/// Iterator over alphanumeric runs of a text. See [`words`].
#[derive(Debug, Clone)]
pub struct Words<'a> {
    text: &'a str,
    pos: usize,
}

/// Split `text` into maximal runs of Unicode letters and digits.
///
/// Whitespace and punctuation act as delimiters and are never returned.
pub fn words(text: &str) -> Words<'_> {
    Words { text, pos: 0 }
}

impl<'a> Iterator for Words<'a> {
    type Item = Span<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.text[self.pos..];
        let (offset, _) = rest.char_indices().find(|(_, c)| c.is_alphanumeric())?;
        let start = self.pos + offset;
        let end = self.text[start..]
            .char_indices()
            .find(|(_, c)| !c.is_alphanumeric())
            .map(|(i, _)| start + i)
            .unwrap_or(self.text.len());
        self.pos = end;
        Some(Span {
            text: &self.text[start..end],
            start,
            end,
        })
    }
}

/// True if `text` contains at least one letter or digit.
pub fn has_word(text: &str) -> bool {
    words(text).next().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(text: &str) -> Vec<&str> {
        sentences(text).map(|s| s.text).collect()
    }

    #[test]
    fn test_basic_sentences() {
        assert_eq!(
            texts("Hello world. How are you? Fine!"),
            vec!["Hello world.", "How are you?", "Fine!"]
        );
    }

    #[test]
    fn test_offsets_slice_source() {
        let text = "  First one.   Second one!  ";
        for span in sentences(text) {
            assert_eq!(&text[span.start..span.end], span.text);
        }
        let spans: Vec<_> = sentences(text).collect();
        assert_eq!(spans[0].start, 2);
        assert_eq!(spans[1].text, "Second one!");
    }

    #[test]
    fn test_no_boundary_is_single_span() {
        assert_eq!(texts("no punctuation here"), vec!["no punctuation here"]);
    }

    #[test]
    fn test_trailing_fragment_kept() {
        assert_eq!(texts("Done. and then"), vec!["Done.", "and then"]);
    }

    #[test]
    fn test_punctuation_runs_and_inner_dots() {
        assert_eq!(
            texts("Really?! Pi is 3.14 today... ok"),
            vec!["Really?!", "Pi is 3.14 today...", "ok"]
        );
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert!(texts("").is_empty());
        assert!(texts("   \n\t ").is_empty());
    }

    #[test]
    fn test_restartable() {
        let iter = sentences("One. Two. Three.");
        let first: Vec<_> = iter.clone().collect();
        let second: Vec<_> = iter.collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_multibyte_sentences() {
        let text = "Größe zählt. Ünïcode wörks!";
        let spans: Vec<_> = sentences(text).collect();
        assert_eq!(spans.len(), 2);
        assert_eq!(&text[spans[1].start..spans[1].end], "Ünïcode wörks!");
    }

    #[test]
    fn test_words() {
        let text = "invoice_2023.pdf, résumé  v2";
        let ws: Vec<_> = words(text).map(|w| w.text).collect();
        assert_eq!(ws, vec!["invoice", "2023", "pdf", "résumé", "v2"]);
        for w in words(text) {
            assert_eq!(&text[w.start..w.end], w.text);
        }
    }

    #[test]
    fn test_has_word() {
        assert!(has_word("...a"));
        assert!(has_word("42"));
        assert!(!has_word("?!. ,;"));
        assert!(!has_word(""));
    }
}

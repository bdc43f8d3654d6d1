//! Text splitting helpers for word alignment.

use std::ops::Range;

/// Byte ranges of every whitespace-delimited word in `text`.
///
/// Whitespace follows `char::is_whitespace`, so non-breaking spaces separate
/// words the same way a browser's `\s` does.
pub fn word_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;

    for (idx, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if let Some(begin) = start.take() {
                spans.push(begin..idx);
            }
        } else if start.is_none() {
            start = Some(idx);
        }
    }

    if let Some(begin) = start {
        spans.push(begin..text.len());
    }

    spans
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

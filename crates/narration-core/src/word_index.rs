//! Read-only, ordered view over the words of one sanitized document.
//!
//! A `WordIndex` is built once per story HTML and shared (`Arc`) between the
//! view, the narration controller and the highlight renderer. It is never
//! mutated; a changed document gets a new index.

use crate::markup::SanitizedTree;
use crate::segmenter::{Segmentation, WordToken, segment};
use sha2::{Digest, Sha256};
use std::slice::Iter;

#[derive(Debug, Clone, Default)]
pub struct WordIndex {
    tree: SanitizedTree,
    tokens: Vec<WordToken>,
    full_text: String,
    /// Byte offset of every token inside `full_text`.
    offsets: Vec<usize>,
    fingerprint: String,
}

impl WordIndex {
    pub fn from_html(raw_html: &str) -> Self {
        Self::build(segment(raw_html), fingerprint(raw_html))
    }

    pub fn build(segmentation: Segmentation, fingerprint: String) -> Self {
        let Segmentation { tree, tokens } = segmentation;
        let mut full_text = String::new();
        let mut offsets = Vec::with_capacity(tokens.len());
        for token in &tokens {
            if !full_text.is_empty() {
                full_text.push(' ');
            }
            offsets.push(full_text.len());
            full_text.push_str(&token.text);
        }
        Self {
            tree,
            tokens,
            full_text,
            offsets,
            fingerprint,
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&WordToken> {
        self.tokens.get(index)
    }

    pub fn iter(&self) -> Iter<'_, WordToken> {
        self.tokens.iter()
    }

    pub fn tokens(&self) -> &[WordToken] {
        &self.tokens
    }

    pub fn tree(&self) -> &SanitizedTree {
        &self.tree
    }

    /// Space-joined text of every token; what a whole-document utterance says.
    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    /// Document text from word `index` to the end, for substring resume.
    pub fn text_from(&self, index: usize) -> Option<&str> {
        self.offsets
            .get(index)
            .map(|offset| &self.full_text[*offset..])
    }

    /// SHA-256 of the raw HTML this index was built from.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Resolve the index attribute value of a clicked word unit.
    pub fn resolve_click(&self, attribute_value: &str) -> Option<usize> {
        attribute_value
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|index| *index < self.tokens.len())
    }
}

impl<'a> IntoIterator for &'a WordIndex {
    type Item = &'a WordToken;
    type IntoIter = Iter<'a, WordToken>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub fn fingerprint(raw_html: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_html.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_text_joins_tokens_with_single_spaces() {
        let index = WordIndex::from_html("<p>The  cat</p>\n<p>sat.</p>");
        assert_eq!(index.full_text(), "The cat sat.");
        assert_eq!(index.text_from(1), Some("cat sat."));
        assert_eq!(index.text_from(2), Some("sat."));
        assert_eq!(index.text_from(3), None);
    }

    #[test]
    fn lookup_by_index() {
        let index = WordIndex::from_html("<p>Hello <b>world</b></p>");
        assert_eq!(index.len(), 2);
        assert_eq!(index.get(1).map(|t| t.text.as_str()), Some("world"));
        assert!(index.get(2).is_none());
        let texts: Vec<&str> = index.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["Hello", "world"]);
    }

    #[test]
    fn resolves_only_valid_click_targets() {
        let index = WordIndex::from_html("<p>One two</p>");
        assert_eq!(index.resolve_click("1"), Some(1));
        assert_eq!(index.resolve_click(" 0 "), Some(0));
        assert_eq!(index.resolve_click("2"), None);
        assert_eq!(index.resolve_click("-1"), None);
        assert_eq!(index.resolve_click("abc"), None);
    }

    #[test]
    fn fingerprint_tracks_source_html() {
        let a = WordIndex::from_html("<p>One</p>");
        let b = WordIndex::from_html("<p>One</p>");
        let c = WordIndex::from_html("<p>Two</p>");
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn empty_document_has_empty_text() {
        let index = WordIndex::from_html("");
        assert!(index.is_empty());
        assert_eq!(index.full_text(), "");
        assert_eq!(index.text_from(0), None);
    }
}

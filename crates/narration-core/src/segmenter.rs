//! Splits sanitized story content into indexed, speakable words.

use crate::markup::{SafeNode, SanitizedTree};
use crate::sanitizer::sanitize;
use crate::text_utils::word_spans;
use serde::Serialize;
use std::ops::Range;
use tracing::debug;

/// One indexed word of a segmented document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordToken {
    /// 0-based position in reading order.
    pub index: usize,
    pub text: String,
    /// Child-index path from the tree root to the text node holding the word.
    pub path: Vec<usize>,
    /// Byte range of the word inside that text node.
    pub span: Range<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segmentation {
    pub tree: SanitizedTree,
    pub tokens: Vec<WordToken>,
}

/// Sanitize `raw_html` and number every whitespace-delimited word in
/// document order. Never fails; malformed input yields a best-effort tree.
pub fn segment(raw_html: &str) -> Segmentation {
    let tree = sanitize(raw_html);
    let mut tokens = Vec::new();
    let mut path = Vec::new();
    for (idx, node) in tree.nodes.iter().enumerate() {
        path.push(idx);
        collect_tokens(node, &mut path, &mut tokens);
        path.pop();
    }
    debug!(words = tokens.len(), "Segmented story into words");
    Segmentation { tree, tokens }
}

fn collect_tokens(node: &SafeNode, path: &mut Vec<usize>, tokens: &mut Vec<WordToken>) {
    match node {
        SafeNode::Text { text } => {
            for span in word_spans(text) {
                tokens.push(WordToken {
                    index: tokens.len(),
                    text: text[span.clone()].to_string(),
                    path: path.clone(),
                    span,
                });
            }
        }
        SafeNode::Element(element) => {
            for (idx, child) in element.children.iter().enumerate() {
                path.push(idx);
                collect_tokens(child, path, tokens);
                path.pop();
            }
        }
    }
}

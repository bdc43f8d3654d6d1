//! Renders the sanitized story with every word wrapped in a clickable unit.
//!
//! Output is a pure function of the word index, the active word and the
//! style, so re-rendering on every state change is always safe.

use crate::config::AppConfig;
use crate::markup::{
    SafeNode, escape_attr, escape_text, write_close_tag, write_open_tag,
};
use crate::segmenter::WordToken;
use crate::word_index::WordIndex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightStyle {
    pub word_class: String,
    pub active_class: String,
    /// Attribute carrying the word index, read back on click.
    pub index_attribute: String,
}

impl Default for HighlightStyle {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl HighlightStyle {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            word_class: config.word_class.clone(),
            active_class: config.active_class.clone(),
            index_attribute: config.index_attribute.clone(),
        }
    }
}

/// Serialize the document with each word as
/// `<span class="word" data-word-index="N">word</span>`.
///
/// Inter-word whitespace and all surviving markup are kept exactly. The word
/// at `active` additionally gets the active class and `aria-current`.
pub fn render(index: &WordIndex, active: Option<usize>, style: &HighlightStyle) -> String {
    let mut renderer = Renderer {
        tokens: index.tokens(),
        cursor: 0,
        active,
        style,
        path: Vec::new(),
        out: String::with_capacity(index.full_text().len() * 4),
    };
    for (idx, node) in index.tree().nodes.iter().enumerate() {
        renderer.path.push(idx);
        renderer.node(node);
        renderer.path.pop();
    }
    renderer.out
}

struct Renderer<'a> {
    tokens: &'a [WordToken],
    cursor: usize,
    active: Option<usize>,
    style: &'a HighlightStyle,
    path: Vec<usize>,
    out: String,
}

impl Renderer<'_> {
    fn node(&mut self, node: &SafeNode) {
        match node {
            SafeNode::Text { text } => self.text(text),
            SafeNode::Element(element) => {
                write_open_tag(&element.tag, &element.attrs, &mut self.out);
                if element.is_void() {
                    return;
                }
                for (idx, child) in element.children.iter().enumerate() {
                    self.path.push(idx);
                    self.node(child);
                    self.path.pop();
                }
                write_close_tag(&element.tag, &mut self.out);
            }
        }
    }

    fn text(&mut self, text: &str) {
        let tokens = self.tokens;
        let mut written = 0;
        while let Some(token) = tokens.get(self.cursor) {
            if token.path != self.path {
                break;
            }
            escape_text(&text[written..token.span.start], &mut self.out);
            self.word(token, &text[token.span.clone()]);
            written = token.span.end;
            self.cursor += 1;
        }
        escape_text(&text[written..], &mut self.out);
    }

    fn word(&mut self, token: &WordToken, word: &str) {
        let is_active = self.active == Some(token.index);
        self.out.push_str("<span class=\"");
        escape_attr(&self.style.word_class, &mut self.out);
        if is_active {
            self.out.push(' ');
            escape_attr(&self.style.active_class, &mut self.out);
        }
        self.out.push_str("\" ");
        escape_attr(&self.style.index_attribute, &mut self.out);
        self.out.push_str("=\"");
        self.out.push_str(&token.index.to_string());
        self.out.push('"');
        if is_active {
            self.out.push_str(" aria-current=\"true\"");
        }
        self.out.push('>');
        escape_text(word, &mut self.out);
        self.out.push_str("</span>");
    }
}

//! Sanitized document tree and its HTML serialization.
//!
//! Every node in a [`SanitizedTree`] has already passed the allowlist in
//! `sanitizer`, so serializing it only needs escaping, never filtering.

use serde::Serialize;

/// Elements that never carry children and are written without a closing tag.
pub const VOID_TAGS: [&str; 3] = ["br", "hr", "img"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SanitizedTree {
    pub nodes: Vec<SafeNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SafeNode {
    Element(SafeElement),
    Text { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SafeElement {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<SafeNode>,
}

impl SafeElement {
    pub fn is_void(&self) -> bool {
        VOID_TAGS.contains(&self.tag.as_str())
    }
}

impl SanitizedTree {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Serialize the tree back to HTML that is safe to render as-is.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            write_node(node, &mut out);
        }
        out
    }

    /// Concatenated text of every text node, like the DOM's `textContent`.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            collect_text(node, &mut out);
        }
        out
    }

    /// Look up a node by its child-index path from the root.
    pub fn node_at(&self, path: &[usize]) -> Option<&SafeNode> {
        let (first, rest) = path.split_first()?;
        let mut node = self.nodes.get(*first)?;
        for idx in rest {
            node = match node {
                SafeNode::Element(element) => element.children.get(*idx)?,
                SafeNode::Text { .. } => return None,
            };
        }
        Some(node)
    }
}

fn write_node(node: &SafeNode, out: &mut String) {
    match node {
        SafeNode::Text { text } => escape_text(text, out),
        SafeNode::Element(element) => {
            write_open_tag(&element.tag, &element.attrs, out);
            if element.is_void() {
                return;
            }
            for child in &element.children {
                write_node(child, out);
            }
            write_close_tag(&element.tag, out);
        }
    }
}

fn collect_text(node: &SafeNode, out: &mut String) {
    match node {
        SafeNode::Text { text } => out.push_str(text),
        SafeNode::Element(element) => {
            for child in &element.children {
                collect_text(child, out);
            }
        }
    }
}

pub(crate) fn write_open_tag(tag: &str, attrs: &[(String, String)], out: &mut String) {
    out.push('<');
    out.push_str(tag);
    for (name, value) in attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_attr(value, out);
        out.push('"');
    }
    out.push('>');
}

pub(crate) fn write_close_tag(tag: &str, out: &mut String) {
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

pub(crate) fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

pub(crate) fn escape_attr(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

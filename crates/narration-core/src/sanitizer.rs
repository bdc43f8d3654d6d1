//! HTML sanitization for author-supplied story content.
//!
//! Parsing goes through `scraper` (html5ever underneath), which never fails:
//! malformed markup is repaired the way a browser would repair it. The parsed
//! fragment is then copied into a [`SanitizedTree`] through an allowlist:
//!
//! - dangerous elements (`script`, `style`, `iframe`, forms, ...) are dropped
//!   together with their content;
//! - unknown but harmless elements are unwrapped, keeping their children;
//! - only allowlisted attributes survive, and URL attributes must use a safe
//!   scheme (or be relative).

use crate::markup::{SafeElement, SafeNode, SanitizedTree};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node};
use tracing::{debug, trace};
use unicode_normalization::UnicodeNormalization;

const MAX_DEPTH: usize = 128;

const ALLOWED_TAGS: [&str; 46] = [
    "a", "abbr", "b", "blockquote", "br", "caption", "cite", "code", "del", "dfn", "div", "em",
    "figcaption", "figure", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "i", "img", "ins", "kbd",
    "li", "mark", "ol", "p", "pre", "q", "s", "small", "span", "strong", "sub", "sup", "table",
    "tbody", "td", "tfoot", "th", "thead", "tr", "u", "ul",
];

const DROPPED_TAGS: [&str; 24] = [
    "applet", "audio", "base", "button", "canvas", "embed", "form", "frame", "frameset", "head",
    "iframe", "input", "link", "math", "meta", "noscript", "object", "script", "select", "style",
    "svg", "template", "textarea", "title",
];

const SAFE_URL_SCHEMES: [&str; 3] = ["http", "https", "mailto"];

static RE_URL_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-zA-Z][a-zA-Z0-9+.\-]*):").unwrap());

/// Parse `raw_html` tolerantly and keep only safe structure and text.
pub fn sanitize(raw_html: &str) -> SanitizedTree {
    let fragment = Html::parse_fragment(raw_html);
    let mut pass = SanitizePass::default();
    let mut nodes = Vec::new();
    pass.copy_children(fragment.root_element(), &mut nodes, 0);
    debug!(
        input_bytes = raw_html.len(),
        top_level_nodes = nodes.len(),
        dropped_elements = pass.dropped_elements,
        unwrapped_elements = pass.unwrapped_elements,
        dropped_attributes = pass.dropped_attributes,
        "Sanitized story HTML"
    );
    SanitizedTree { nodes }
}

#[derive(Default)]
struct SanitizePass {
    dropped_elements: usize,
    unwrapped_elements: usize,
    dropped_attributes: usize,
}

impl SanitizePass {
    fn copy_children(&mut self, parent: ElementRef<'_>, out: &mut Vec<SafeNode>, depth: usize) {
        for child in parent.children() {
            match child.value() {
                Node::Text(text) => push_text(out, text),
                Node::Element(element) => {
                    let Some(child_ref) = ElementRef::wrap(child) else {
                        continue;
                    };
                    let tag = element.name().to_ascii_lowercase();
                    if DROPPED_TAGS.contains(&tag.as_str()) {
                        trace!(%tag, "Dropping element with content");
                        self.dropped_elements += 1;
                        continue;
                    }
                    if depth >= MAX_DEPTH {
                        self.unwrapped_elements += 1;
                        flatten_text(child_ref, out);
                        continue;
                    }
                    if !ALLOWED_TAGS.contains(&tag.as_str()) {
                        trace!(%tag, "Unwrapping unknown element");
                        self.unwrapped_elements += 1;
                        self.copy_children(child_ref, out, depth + 1);
                        continue;
                    }

                    let attrs = self.copy_attributes(&tag, element.attrs());
                    let mut copied = SafeElement {
                        tag,
                        attrs,
                        children: Vec::new(),
                    };
                    if !copied.is_void() {
                        self.copy_children(child_ref, &mut copied.children, depth + 1);
                    }
                    out.push(SafeNode::Element(copied));
                }
                // Comments, doctypes and processing instructions never render.
                _ => {}
            }
        }
    }

    fn copy_attributes<'a>(
        &mut self,
        tag: &str,
        attrs: impl Iterator<Item = (&'a str, &'a str)>,
    ) -> Vec<(String, String)> {
        let mut kept = Vec::new();
        for (name, value) in attrs {
            let name = name.to_ascii_lowercase();
            if !is_allowed_attribute(tag, &name) {
                self.dropped_attributes += 1;
                continue;
            }
            if is_url_attribute(&name) {
                match safe_url(value) {
                    Some(url) => kept.push((name, url)),
                    None => {
                        debug!(%tag, attribute = %name, "Dropping attribute with unsafe URL");
                        self.dropped_attributes += 1;
                    }
                }
                continue;
            }
            kept.push((name, value.to_string()));
        }
        kept
    }
}

fn push_text(out: &mut Vec<SafeNode>, text: &str) {
    let normalized: String = text.nfc().collect();
    if let Some(SafeNode::Text { text: last }) = out.last_mut() {
        last.push_str(&normalized);
        return;
    }
    out.push(SafeNode::Text { text: normalized });
}

/// Keep only the text below `element`, iteratively, for pathologically deep
/// input. Text anywhere under a dropped element is still discarded.
fn flatten_text(element: ElementRef<'_>, out: &mut Vec<SafeNode>) {
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let inside_dropped = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| DROPPED_TAGS.contains(&el.name().to_ascii_lowercase().as_str()))
        });
        if !inside_dropped {
            push_text(out, text);
        }
    }
}

fn is_allowed_attribute(tag: &str, name: &str) -> bool {
    if matches!(name, "class" | "title" | "lang" | "dir") {
        return true;
    }
    matches!(
        (tag, name),
        ("a", "href")
            | ("img", "src" | "alt" | "width" | "height")
            | ("td" | "th", "colspan" | "rowspan")
            | ("ol", "start")
            | ("blockquote" | "q", "cite")
    )
}

fn is_url_attribute(name: &str) -> bool {
    matches!(name, "href" | "src" | "cite")
}

/// Accept relative URLs and absolute URLs with an allowlisted scheme.
///
/// Whitespace and control characters are removed before the scheme check so
/// `java\tscript:` is caught the same way a browser would interpret it.
fn safe_url(value: &str) -> Option<String> {
    let compact: String = value
        .chars()
        .filter(|ch| !ch.is_whitespace() && !ch.is_control())
        .collect();
    if compact.is_empty() {
        return None;
    }
    match RE_URL_SCHEME.captures(&compact) {
        Some(caps) => {
            let scheme = caps[1].to_ascii_lowercase();
            SAFE_URL_SCHEMES
                .contains(&scheme.as_str())
                .then(|| value.trim().to_string())
        }
        None => Some(value.trim().to_string()),
    }
}

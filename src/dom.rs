//! Single-element selector handle over a parsed HTML document.
//!
//! Only the one call pattern the pages need is supported: bind the first
//! element matching a CSS selector, then read or replace its text.

use kuchiki::NodeRef;
use kuchiki::traits::*;

/// Handle bound to the first element matching a selector, or to nothing.
#[derive(Debug, Clone)]
pub struct Selection {
    node: Option<NodeRef>,
}

impl Selection {
    /// Bind the first match of `selector` under `root`. A selector that does
    /// not parse binds nothing, same as one that matches nothing.
    pub fn first(root: &NodeRef, selector: &str) -> Self {
        let node = root
            .select_first(selector)
            .ok()
            .map(|data| data.as_node().clone());
        Self { node }
    }

    #[allow(dead_code)]
    pub fn is_bound(&self) -> bool {
        self.node.is_some()
    }

    pub fn node(&self) -> Option<&NodeRef> {
        self.node.as_ref()
    }

    /// Current text content, or `None` when nothing matched.
    pub fn text(&self) -> Option<String> {
        self.node.as_ref().map(NodeRef::text_contents)
    }

    #[allow(dead_code)]
    /// Replace the element's children with a single text node. No-op when
    /// nothing matched.
    pub fn set_text(&self, text: &str) {
        let Some(node) = &self.node else {
            return;
        };
        let existing: Vec<_> = node.children().collect();
        for child in existing {
            child.detach();
        }
        node.append(NodeRef::new_text(text));
    }
}

/// Parse a full HTML document.
pub fn parse_document(html: &str) -> NodeRef {
    kuchiki::parse_html().one(html)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> NodeRef {
        parse_document(
            "<html><body><p class=\"score\">42</p><p class=\"score\">7</p><span id=\"empty\"></span></body></html>",
        )
    }

    #[test]
    fn reads_first_match_only() {
        let document = doc();
        assert_eq!(Selection::first(&document, ".score").text().as_deref(), Some("42"));
    }

    #[test]
    fn unmatched_selector_reads_none() {
        let document = doc();
        let selection = Selection::first(&document, "#missing");
        assert!(!selection.is_bound());
        assert_eq!(selection.text(), None);
    }

    #[test]
    fn invalid_selector_binds_nothing() {
        let document = doc();
        assert_eq!(Selection::first(&document, "p[").text(), None);
    }

    #[test]
    fn set_text_replaces_content() {
        let document = doc();
        Selection::first(&document, "#empty").set_text("filled <b>");
        assert_eq!(
            Selection::first(&document, "#empty").text().as_deref(),
            Some("filled <b>")
        );
        assert!(document.to_string().contains("filled &lt;b&gt;"));
    }

    #[test]
    fn set_text_on_unmatched_is_noop() {
        let document = doc();
        let before = document.to_string();
        Selection::first(&document, "#missing").set_text("ignored");
        assert_eq!(document.to_string(), before);
    }
}

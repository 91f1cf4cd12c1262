//! Page capability set consumed by the harness
//!
//! The harness never talks to a browser engine directly. It sees a [`Page`]:
//! navigate, wait for the network to go quiet, find one element, click or
//! type into it, evaluate a predicate, screenshot, and stream console output
//! into a [`ConsoleSink`].

use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use zkcheck_core::Severity;

use crate::error::Result;

/// DOM attribute used to pin a resolved element for later actions
pub const ELEMENT_REF_ATTRIBUTE: &str = "data-zkcheck-ref";

/// Receiver for console messages emitted by the page
///
/// Called from the engine's event-dispatch thread, one message at a time.
pub trait ConsoleSink: Send + Sync {
    fn on_console(&self, severity: Severity, text: String);
}

/// Ancestor the matched element must be replaced by
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AncestorMatch {
    /// CSS predicate for the ancestor
    pub selector: String,
    /// Only the immediate parent qualifies
    pub direct: bool,
}

/// Engine-level element query
///
/// Candidates are `css` matches in document order, optionally filtered by a
/// case-insensitive text substring, optionally replaced by an ancestor. The
/// first candidate that survives wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElementQuery {
    pub css: String,
    pub text: Option<String>,
    pub ancestor: Option<AncestorMatch>,
}

impl ElementQuery {
    pub fn css(css: impl Into<String>) -> Self {
        Self {
            css: css.into(),
            text: None,
            ancestor: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_ancestor(mut self, selector: impl Into<String>, direct: bool) -> Self {
        self.ancestor = Some(AncestorMatch {
            selector: selector.into(),
            direct,
        });
        self
    }

    /// JavaScript expression that resolves the query in the page
    ///
    /// Evaluates to the element's ref string, tagging it with
    /// [`ELEMENT_REF_ATTRIBUTE`] on first resolution, or `null` when nothing
    /// matches. The query is embedded as JSON, never spliced as raw text.
    pub fn to_script(&self) -> String {
        let query = serde_json::to_string(self).unwrap_or_else(|_| "null".to_string());
        format!(
            r#"(() => {{
  const q = {query};
  const norm = (s) => (s || '').replace(/\s+/g, ' ').trim().toLowerCase();
  for (const el of document.querySelectorAll(q.css)) {{
    if (q.text !== null && !norm(el.innerText || el.textContent).includes(norm(q.text))) continue;
    let target = el;
    if (q.ancestor !== null) {{
      const parent = el.parentElement;
      if (q.ancestor.direct) {{
        target = parent && parent.matches(q.ancestor.selector) ? parent : null;
      }} else {{
        target = parent ? parent.closest(q.ancestor.selector) : null;
      }}
      if (!target) continue;
    }}
    if (!target.hasAttribute('{attr}')) {{
      window.__zkcheckRefs = (window.__zkcheckRefs || 0) + 1;
      target.setAttribute('{attr}', String(window.__zkcheckRefs));
    }}
    return target.getAttribute('{attr}');
  }}
  return null;
}})()"#,
            query = query,
            attr = ELEMENT_REF_ATTRIBUTE,
        )
    }
}

/// Opaque reference to an element resolved on the current page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    reference: String,
}

impl ElementHandle {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
        }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// CSS selector that finds exactly this element again
    pub fn css(&self) -> String {
        format!("[{}=\"{}\"]", ELEMENT_REF_ATTRIBUTE, self.reference)
    }
}

/// One open browser page
#[async_trait]
pub trait Page: Send + Sync {
    /// Load `url` and wait for the navigation to commit
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Wait until no new network requests start; `false` on timeout
    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<bool>;

    /// First element matching `query` in document order
    async fn find_first(&self, query: &ElementQuery) -> Result<Option<ElementHandle>>;

    async fn click(&self, element: &ElementHandle) -> Result<()>;

    /// Replace the element's value by typing `value`
    async fn fill(&self, element: &ElementHandle, value: &str) -> Result<()>;

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    /// Full-page PNG written to `path`; returns bytes written
    async fn screenshot(&self, path: &Path) -> Result<u64>;

    /// Forward every console message to `sink` for the page's lifetime
    fn subscribe_console(&self, sink: Arc<dyn ConsoleSink>) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder() {
        let query = ElementQuery::css("label input[type=\"checkbox\"]").with_ancestor("label", false);
        assert_eq!(query.css, "label input[type=\"checkbox\"]");
        assert!(query.text.is_none());
        assert_eq!(
            query.ancestor,
            Some(AncestorMatch {
                selector: "label".to_string(),
                direct: false
            })
        );
    }

    #[test]
    fn test_script_embeds_query_as_json() {
        let query = ElementQuery::css("button").with_text("Sent the \"BTC\"");
        let script = query.to_script();
        assert!(script.contains(r#""css":"button""#));
        assert!(script.contains(r#""text":"Sent the \"BTC\"""#));
        assert!(script.contains(r#""ancestor":null"#));
        assert!(script.contains(ELEMENT_REF_ATTRIBUTE));
    }

    #[test]
    fn test_script_any_depth_ancestor() {
        let script = ElementQuery::css("label input[type=\"checkbox\"]")
            .with_ancestor("label", false)
            .to_script();
        assert!(script.contains(r#""ancestor":{"selector":"label","direct":false}"#));
        assert!(script.contains("parent.closest(q.ancestor.selector)"));
    }

    #[test]
    fn test_script_direct_parent_ancestor() {
        let script = ElementQuery::css("input[type=\"checkbox\"]")
            .with_ancestor("div", true)
            .to_script();
        assert!(script.contains(r#""ancestor":{"selector":"div","direct":true}"#));
        assert!(script.contains("parent.matches(q.ancestor.selector)"));
    }

    #[test]
    fn test_script_text_match_is_normalized() {
        let script = ElementQuery::css("button").with_text("Mint").to_script();
        assert!(script.contains(r#""text":"Mint""#));
        assert!(script.contains(".replace(/\\s+/g, ' ').trim().toLowerCase()"));
        assert!(script.contains("return null;"));
    }

    #[test]
    fn test_handle_css() {
        let handle = ElementHandle::new("7");
        assert_eq!(handle.reference(), "7");
        assert_eq!(handle.css(), "[data-zkcheck-ref=\"7\"]");
    }
}

//! Element resolution from declarative selectors
//!
//! A [`SelectorSpec`] compiles to an engine [`ElementQuery`]. Resolution
//! returns zero or one element: when several match, the first in document
//! order wins, because UI variants often render duplicate controls.
//! Only a malformed selector is an error; absence is an ordinary outcome.

use tracing::{debug, warn};
use zkcheck_browser::{ElementHandle, ElementQuery, Page};
use zkcheck_core::{Action, Result, SelectorSpec, StructuralRelation};

/// Containers a toggle clicks instead of the native input
const TOGGLE_CONTAINER: &str = "label, div";

/// Compile a selector into an engine query
pub fn compile(spec: &SelectorSpec) -> Result<ElementQuery> {
    spec.validate()?;

    let query = match spec {
        SelectorSpec::Text { value, tag } => ElementQuery::css(tag.as_str()).with_text(value.as_str()),
        SelectorSpec::TypedInput { input_type } => {
            ElementQuery::css(format!("input[type=\"{}\"]", input_type))
        }
        SelectorSpec::LabeledCheckbox => {
            ElementQuery::css("label input[type=\"checkbox\"]").with_ancestor("label", false)
        }
        SelectorSpec::Structural { relation } => {
            let relation = StructuralRelation::parse(relation)?;
            ElementQuery::css(relation.descendant).with_ancestor(relation.container, relation.direct)
        }
    };

    Ok(query)
}

/// Compile a selector for a specific action
///
/// Toggles never click the native input: overlay-styled checkboxes intercept
/// the pointer. Queries without an ancestor get the nearest label or div.
pub fn compile_for(spec: &SelectorSpec, action: Action) -> Result<ElementQuery> {
    let query = compile(spec)?;
    if action == Action::Toggle && query.ancestor.is_none() {
        return Ok(query.with_ancestor(TOGGLE_CONTAINER, false));
    }
    Ok(query)
}

/// Resolves selectors against one page
pub struct ElementResolver<'a> {
    page: &'a dyn Page,
}

impl<'a> ElementResolver<'a> {
    pub fn new(page: &'a dyn Page) -> Self {
        Self { page }
    }

    /// First element matching `spec`, if any
    pub async fn resolve(&self, spec: &SelectorSpec) -> Result<Option<ElementHandle>> {
        self.resolve_for(spec, Action::Click).await
    }

    /// First element matching `spec` compiled for `action`
    ///
    /// Engine query failures (detached frame, evaluation error) are logged and
    /// reported as no match.
    pub async fn resolve_for(
        &self,
        spec: &SelectorSpec,
        action: Action,
    ) -> Result<Option<ElementHandle>> {
        let query = compile_for(spec, action)?;

        match self.page.find_first(&query).await {
            Ok(found) => {
                debug!(
                    "Selector {} -> {}",
                    spec,
                    found.as_ref().map(|h| h.reference()).unwrap_or("no match")
                );
                Ok(found)
            }
            Err(e) => {
                warn!("Query for {} failed, treating as absent: {}", spec, e);
                Ok(None)
            }
        }
    }

    /// Try a fallback chain in order; returns the index of the selector that resolved
    pub async fn resolve_chain(
        &self,
        chain: &[SelectorSpec],
        action: Action,
    ) -> Result<Option<(usize, ElementHandle)>> {
        for (idx, spec) in chain.iter().enumerate() {
            if let Some(handle) = self.resolve_for(spec, action).await? {
                return Ok(Some((idx, handle)));
            }
        }
        Ok(None)
    }
}

//! Core data model for a harness run
//!
//! Every type here is a plain value: workflow definitions are built once
//! (usually from config) and results are appended once and never mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::{HarnessError, Result};

// ============================================================================
// Console events
// ============================================================================

/// Severity of a captured console message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Log,
    Info,
    Warn,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Log => write!(f, "log"),
            Severity::Info => write!(f, "info"),
            Severity::Warn => write!(f, "warn"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// One console message captured from the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Monotonic index assigned at append time
    pub sequence: u64,
    pub severity: Severity,
    pub text: String,
    /// Wall-clock capture time
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.text)
    }
}

// ============================================================================
// Selectors
// ============================================================================

fn default_text_tag() -> String {
    "button".to_string()
}

/// Declarative description of how to find one interactive element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SelectorSpec {
    /// Element of `tag` whose visible text contains `value` (case-insensitive)
    Text {
        value: String,
        #[serde(default = "default_text_tag")]
        tag: String,
    },
    /// `<input type="...">`
    TypedInput { input_type: String },
    /// A `<label>` wrapping a checkbox input
    LabeledCheckbox,
    /// `container > descendant` (direct child) or `container >> descendant`
    /// (any depth). Resolves the descendant, then ascends to the container.
    Structural { relation: String },
}

impl SelectorSpec {
    /// Button containing the given text
    pub fn text(value: impl Into<String>) -> Self {
        SelectorSpec::Text {
            value: value.into(),
            tag: default_text_tag(),
        }
    }

    pub fn typed_input(input_type: impl Into<String>) -> Self {
        SelectorSpec::TypedInput {
            input_type: input_type.into(),
        }
    }

    pub fn labeled_checkbox() -> Self {
        SelectorSpec::LabeledCheckbox
    }

    pub fn structural(relation: impl Into<String>) -> Self {
        SelectorSpec::Structural {
            relation: relation.into(),
        }
    }

    /// Check the selector is well-formed without touching a page
    pub fn validate(&self) -> Result<()> {
        match self {
            SelectorSpec::Text { value, tag } => {
                if value.trim().is_empty() {
                    return Err(HarnessError::InvalidSelector(
                        "text selector with empty value".to_string(),
                    ));
                }
                if tag.trim().is_empty() {
                    return Err(HarnessError::InvalidSelector(format!(
                        "text selector '{}' with empty tag",
                        value
                    )));
                }
                Ok(())
            }
            SelectorSpec::TypedInput { input_type } => {
                let valid = !input_type.is_empty()
                    && input_type
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '-');
                if valid {
                    Ok(())
                } else {
                    Err(HarnessError::InvalidSelector(format!(
                        "invalid input type '{}'",
                        input_type
                    )))
                }
            }
            SelectorSpec::LabeledCheckbox => Ok(()),
            SelectorSpec::Structural { relation } => {
                StructuralRelation::parse(relation).map(|_| ())
            }
        }
    }
}

impl fmt::Display for SelectorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectorSpec::Text { value, tag } => write!(f, "{}:has-text(\"{}\")", tag, value),
            SelectorSpec::TypedInput { input_type } => {
                write!(f, "input[type=\"{}\"]", input_type)
            }
            SelectorSpec::LabeledCheckbox => write!(f, "label:has(input[type=\"checkbox\"])"),
            SelectorSpec::Structural { relation } => write!(f, "structural({})", relation),
        }
    }
}

/// Parsed form of a structural relation string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralRelation {
    /// CSS predicate the ancestor must match
    pub container: String,
    /// CSS selector for the element located first
    pub descendant: String,
    /// Container must be the immediate parent
    pub direct: bool,
}

impl StructuralRelation {
    /// Parse `container > descendant` or `container >> descendant`.
    ///
    /// Splits on the last combinator outside brackets and quotes, so
    /// `form > div > input` means "an `input` whose parent matches `form > div`".
    pub fn parse(relation: &str) -> Result<Self> {
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        let mut split: Option<usize> = None;

        for (idx, c) in relation.char_indices() {
            match (quote, c) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '"') | (None, '\'') => quote = Some(c),
                (None, '[') | (None, '(') => depth += 1,
                (None, ']') | (None, ')') => depth = depth.saturating_sub(1),
                (None, '>') if depth == 0 => split = Some(idx),
                _ => {}
            }
        }

        let malformed = || {
            HarnessError::InvalidSelector(format!(
                "structural relation '{}' must look like 'container > child' or 'container >> descendant'",
                relation
            ))
        };

        let idx = split.ok_or_else(malformed)?;
        let direct = !relation[..idx].ends_with('>');
        let container_end = if direct { idx } else { idx - 1 };

        let container = relation[..container_end].trim();
        let descendant = relation[idx + 1..].trim();
        if container.is_empty() || descendant.is_empty() || container.ends_with('>') {
            return Err(malformed());
        }

        Ok(Self {
            container: container.to_string(),
            descendant: descendant.to_string(),
            direct,
        })
    }
}

// ============================================================================
// Steps
// ============================================================================

/// UI action a step performs on its resolved element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Click,
    Fill,
    /// Click the label or container that owns a checkbox
    Toggle,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Click => write!(f, "click"),
            Action::Fill => write!(f, "fill"),
            Action::Toggle => write!(f, "toggle"),
        }
    }
}

fn default_settle_time_ms() -> u64 {
    500
}

/// One declarative UI action in the workflow under test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    /// Fallback chain, tried in order until one resolves
    pub selectors: Vec<SelectorSpec>,
    pub action: Action,
    /// Value for `fill`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    /// Pause after the action before the next step starts
    #[serde(default = "default_settle_time_ms")]
    pub settle_time_ms: u64,
    /// A missing element is an error rather than a skip
    #[serde(default)]
    pub required: bool,
    /// Screenshot name captured once the step settles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<String>,
}

impl Step {
    fn new(name: impl Into<String>, selector: SelectorSpec, action: Action) -> Self {
        Self {
            name: name.into(),
            selectors: vec![selector],
            action,
            payload: None,
            settle_time_ms: default_settle_time_ms(),
            required: false,
            checkpoint: None,
        }
    }

    pub fn click(name: impl Into<String>, selector: SelectorSpec) -> Self {
        Self::new(name, selector, Action::Click)
    }

    pub fn fill(name: impl Into<String>, selector: SelectorSpec, payload: impl Into<String>) -> Self {
        let mut step = Self::new(name, selector, Action::Fill);
        step.payload = Some(payload.into());
        step
    }

    pub fn toggle(name: impl Into<String>, selector: SelectorSpec) -> Self {
        Self::new(name, selector, Action::Toggle)
    }

    /// Append a fallback selector
    pub fn or(mut self, selector: SelectorSpec) -> Self {
        self.selectors.push(selector);
        self
    }

    pub fn settle_ms(mut self, ms: u64) -> Self {
        self.settle_time_ms = ms;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn checkpoint(mut self, name: impl Into<String>) -> Self {
        self.checkpoint = Some(name.into());
        self
    }

    /// Check the step definition is executable
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(HarnessError::InvalidStep("step with empty name".to_string()));
        }
        if self.selectors.is_empty() {
            return Err(HarnessError::InvalidStep(format!(
                "step '{}' has no selectors",
                self.name
            )));
        }
        if self.action == Action::Fill && self.payload.is_none() {
            return Err(HarnessError::InvalidStep(format!(
                "fill step '{}' has no payload",
                self.name
            )));
        }
        for selector in &self.selectors {
            selector.validate()?;
        }
        Ok(())
    }
}

/// How the post-action settle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettleOutcome {
    /// Fixed delay fully elapsed
    Elapsed,
    /// Polling predicate became true
    Satisfied,
    /// Predicate never held within the settle time
    TimedOut,
}

/// Terminal state of one executed step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Skipped,
    Failed,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Completed => write!(f, "completed"),
            StepStatus::Skipped => write!(f, "skipped"),
            StepStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of executing one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub step: Step,
    pub matched: bool,
    pub action_taken: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Index into `step.selectors` of the selector that resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_selector: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settle: Option<SettleOutcome>,
}

impl StepResult {
    /// Optional element absent
    pub fn skipped(step: &Step) -> Self {
        Self {
            step: step.clone(),
            matched: false,
            action_taken: false,
            error: None,
            matched_selector: None,
            settle: None,
        }
    }

    pub fn failed(step: &Step, matched_selector: Option<usize>, error: impl Into<String>) -> Self {
        Self {
            step: step.clone(),
            matched: matched_selector.is_some(),
            action_taken: false,
            error: Some(error.into()),
            matched_selector,
            settle: None,
        }
    }

    pub fn completed(step: &Step, matched_selector: usize, settle: SettleOutcome) -> Self {
        Self {
            step: step.clone(),
            matched: true,
            action_taken: true,
            error: None,
            matched_selector: Some(matched_selector),
            settle: Some(settle),
        }
    }

    pub fn status(&self) -> StepStatus {
        if self.error.is_some() {
            StepStatus::Failed
        } else if self.action_taken {
            StepStatus::Completed
        } else {
            StepStatus::Skipped
        }
    }
}

// ============================================================================
// Resource probing
// ============================================================================

/// A static asset to fetch directly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCheck {
    /// Display name; the last URL segment when empty
    #[serde(default)]
    pub name: String,
    /// Absolute URL or a path relative to the base URL
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_content_type: Option<String>,
}

impl ResourceCheck {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            url: url.into(),
            expected_content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.expected_content_type = Some(content_type.into());
        self
    }

    pub fn display_name(&self) -> &str {
        if !self.name.is_empty() {
            return &self.name;
        }
        self.url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.url)
    }
}

/// Outcome of fetching one static asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceResult {
    pub name: String,
    pub url: String,
    /// HTTP status, 0 when no response arrived
    pub status: u16,
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResourceResult {
    /// Result for a response that arrived
    pub fn from_response(
        check: &ResourceCheck,
        url: impl Into<String>,
        status: u16,
        content_length: Option<u64>,
        content_type: Option<String>,
    ) -> Self {
        Self {
            name: check.display_name().to_string(),
            url: url.into(),
            status,
            content_length,
            content_type,
            ok: status == 200,
            error: None,
        }
    }

    /// Result for a request that never got a response
    pub fn unreachable(check: &ResourceCheck, url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: check.display_name().to_string(),
            url: url.into(),
            status: 0,
            content_length: None,
            content_type: None,
            ok: false,
            error: Some(error.into()),
        }
    }

    /// Whether the served content type starts with `expected` (ignoring case)
    pub fn content_type_matches(&self, expected: &str) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().starts_with(&expected.to_ascii_lowercase()))
            .unwrap_or(false)
    }
}

// ============================================================================
// Keyword matching and verdict
// ============================================================================

/// Case-insensitive set of substrings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct KeywordSet {
    keywords: BTreeSet<String>,
}

impl KeywordSet {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// Whether `text` contains any keyword, ignoring case
    pub fn matches(&self, text: &str) -> bool {
        let haystack = text.to_lowercase();
        self.keywords.iter().any(|k| haystack.contains(k.as_str()))
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for KeywordSet {
    fn from(keywords: Vec<String>) -> Self {
        Self::new(keywords)
    }
}

impl From<KeywordSet> for Vec<String> {
    fn from(set: KeywordSet) -> Self {
        set.keywords.into_iter().collect()
    }
}

/// Named keyword set projected as one report section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordView {
    pub name: String,
    pub keywords: KeywordSet,
}

impl KeywordView {
    pub fn new<I, S>(name: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.into(),
            keywords: KeywordSet::new(keywords),
        }
    }
}

/// Final pass/fail summary of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub resource_ok: bool,
    pub signal_present: bool,
    /// Correlated events plus the trailing raw window, in sequence order
    pub evidence: Vec<LogEvent>,
    pub overall_ok: bool,
}

impl Verdict {
    pub fn new(resource_ok: bool, signal_present: bool, evidence: Vec<LogEvent>) -> Self {
        Self {
            resource_ok,
            signal_present,
            evidence,
            overall_ok: resource_ok && signal_present,
        }
    }
}

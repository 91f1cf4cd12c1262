//! In-memory [`Page`] for driving the harness without a browser
//!
//! Controls are registered up front with the selector that should find them.
//! A query resolves to the first registered control whose compiled query is
//! equal, which stands in for "first in document order".

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use zkcheck_browser::{ConsoleSink, ElementHandle, ElementQuery, Page};
use zkcheck_core::{Action, HarnessError, Result, SelectorSpec, Severity};

use crate::resolver::compile_for;

const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

/// Something recorded by [`FakePage`] when the harness acts on it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeAction {
    Click(ElementHandle),
    Fill(ElementHandle, String),
}

/// A control the fake page can resolve
#[derive(Debug, Clone)]
pub struct FakeControl {
    spec: SelectorSpec,
    action: Action,
    failure: Option<String>,
    emits: Vec<(Severity, String)>,
}

impl FakeControl {
    /// Control found by `spec` compiled for a click
    pub fn new(spec: SelectorSpec) -> Self {
        Self {
            spec,
            action: Action::Click,
            failure: None,
            emits: Vec::new(),
        }
    }

    /// Match the query `spec` compiles to for `action` instead
    pub fn for_action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    /// Acting on the control fails with `reason`
    pub fn fails_with(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(reason.into());
        self
    }

    /// Console line the page logs when the control is clicked or filled
    pub fn emits(mut self, severity: Severity, text: impl Into<String>) -> Self {
        self.emits.push((severity, text.into()));
        self
    }
}

#[derive(Default)]
struct State {
    controls: Vec<(Option<ElementQuery>, FakeControl)>,
    sink: Option<Arc<dyn ConsoleSink>>,
    actions: Vec<FakeAction>,
    screenshots: Vec<PathBuf>,
    evaluations: Vec<String>,
    navigations: Vec<String>,
    scripted: VecDeque<Value>,
    default_evaluation: Option<Value>,
    on_navigate: Vec<(Severity, String)>,
}

/// Scriptable page double
#[derive(Default)]
pub struct FakePage {
    state: Mutex<State>,
    fail_queries: bool,
    fail_screenshots: bool,
    fail_navigation: bool,
    network_busy: bool,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `find_first` returns an engine error
    pub fn failing_queries(mut self) -> Self {
        self.fail_queries = true;
        self
    }

    pub fn failing_screenshots(mut self) -> Self {
        self.fail_screenshots = true;
        self
    }

    /// `navigate` fails as if the server refused the connection
    pub fn failing_navigation(mut self) -> Self {
        self.fail_navigation = true;
        self
    }

    /// The network never goes idle
    pub fn busy_network(mut self) -> Self {
        self.network_busy = true;
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Register a control; returns the handle resolution will yield for it
    pub fn add_control(&self, control: FakeControl) -> ElementHandle {
        let query = compile_for(&control.spec, control.action).ok();
        let mut state = self.state();
        state.controls.push((query, control));
        ElementHandle::new(state.controls.len().to_string())
    }

    /// Console line logged by the page once navigation completes
    pub fn on_navigate(&self, severity: Severity, text: impl Into<String>) {
        self.state().on_navigate.push((severity, text.into()));
    }

    /// Deliver a console message to the subscribed sink, if any
    pub fn emit(&self, severity: Severity, text: impl Into<String>) {
        let sink = self.state().sink.clone();
        if let Some(sink) = sink {
            sink.on_console(severity, text.into());
        }
    }

    /// Queue results for upcoming `evaluate` calls
    pub fn script_evaluations(&self, values: impl IntoIterator<Item = Value>) {
        self.state().scripted.extend(values);
    }

    /// Result of `evaluate` once the queue is empty; `true` unless set
    pub fn set_default_evaluation(&self, value: Value) {
        self.state().default_evaluation = Some(value);
    }

    pub fn actions(&self) -> Vec<FakeAction> {
        self.state().actions.clone()
    }

    pub fn screenshots(&self) -> Vec<PathBuf> {
        self.state().screenshots.clone()
    }

    pub fn evaluations(&self) -> Vec<String> {
        self.state().evaluations.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state().navigations.clone()
    }

    fn control(&self, element: &ElementHandle) -> Result<FakeControl> {
        let index: usize = element
            .reference()
            .parse()
            .map_err(|_| HarnessError::ElementQuery(format!("stale ref {}", element.reference())))?;
        self.state()
            .controls
            .get(index.wrapping_sub(1))
            .map(|(_, control)| control.clone())
            .ok_or_else(|| HarnessError::ElementQuery(format!("stale ref {}", element.reference())))
    }

    fn act(&self, element: &ElementHandle, action: FakeAction, name: &str) -> Result<()> {
        let control = self.control(element)?;
        if let Some(reason) = control.failure {
            return Err(HarnessError::ActionFailed {
                action: name.to_string(),
                reason,
            });
        }

        self.state().actions.push(action);
        for (severity, text) in control.emits {
            self.emit(severity, text);
        }
        Ok(())
    }
}

#[async_trait]
impl Page for FakePage {
    async fn navigate(&self, url: &str) -> Result<()> {
        if self.fail_navigation {
            return Err(HarnessError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_CONNECTION_REFUSED".to_string(),
            });
        }

        let lines = {
            let mut state = self.state();
            state.navigations.push(url.to_string());
            state.on_navigate.clone()
        };
        for (severity, text) in lines {
            self.emit(severity, text);
        }
        Ok(())
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<bool> {
        if self.network_busy {
            tokio::time::sleep(timeout).await;
            return Ok(false);
        }
        Ok(true)
    }

    async fn find_first(&self, query: &ElementQuery) -> Result<Option<ElementHandle>> {
        if self.fail_queries {
            return Err(HarnessError::ElementQuery("execution context was destroyed".into()));
        }

        let position = self
            .state()
            .controls
            .iter()
            .position(|(compiled, _)| compiled.as_ref() == Some(query));
        Ok(position.map(|idx| ElementHandle::new((idx + 1).to_string())))
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        self.act(element, FakeAction::Click(element.clone()), "click")
    }

    async fn fill(&self, element: &ElementHandle, value: &str) -> Result<()> {
        self.act(
            element,
            FakeAction::Fill(element.clone(), value.to_string()),
            "fill",
        )
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        let mut state = self.state();
        state.evaluations.push(script.to_string());
        let value = match state.scripted.pop_front() {
            Some(value) => value,
            None => state.default_evaluation.clone().unwrap_or_else(|| json!(true)),
        };
        Ok(value)
    }

    async fn screenshot(&self, path: &Path) -> Result<u64> {
        if self.fail_screenshots {
            return Err(HarnessError::Screenshot("target closed".into()));
        }

        tokio::fs::write(path, FAKE_PNG).await?;
        self.state().screenshots.push(path.to_path_buf());
        Ok(FAKE_PNG.len() as u64)
    }

    fn subscribe_console(&self, sink: Arc<dyn ConsoleSink>) -> Result<()> {
        self.state().sink = Some(sink);
        Ok(())
    }
}

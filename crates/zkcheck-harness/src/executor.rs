//! Single-step execution
//!
//! A step never aborts the run. An absent optional control is a skip, an
//! absent required control or a failed action is an error result, and both
//! leave the page to the next step.

use std::time::Duration;
use tracing::{info, warn};
use zkcheck_core::{Action, Step, StepResult};

use crate::resolver::ElementResolver;
use crate::session::Session;
use crate::wait::{FixedDelay, WaitPolicy};

/// Executes one step against a session
pub struct StepExecutor {
    wait: Box<dyn WaitPolicy>,
}

impl StepExecutor {
    pub fn new(wait: Box<dyn WaitPolicy>) -> Self {
        Self { wait }
    }

    pub fn wait_policy(&self) -> &dyn WaitPolicy {
        self.wait.as_ref()
    }

    /// Resolve, act, settle, then take the step's checkpoint if it has one
    ///
    /// The checkpoint is captured whatever the outcome, so every run leaves
    /// the same set of screenshot files behind.
    pub async fn execute(&self, step: &Step, session: &Session) -> StepResult {
        let result = self.perform(step, session).await;

        if let Some(name) = &step.checkpoint {
            session.checkpoint(name).await;
        }

        result
    }

    async fn perform(&self, step: &Step, session: &Session) -> StepResult {
        if let Err(e) = step.validate() {
            warn!("Step '{}' is invalid: {}", step.name, e);
            return StepResult::failed(step, None, e.to_string());
        }

        let page = session.page();
        let resolver = ElementResolver::new(page);

        let (matched, element) = match resolver.resolve_chain(&step.selectors, step.action).await {
            Ok(Some(found)) => found,
            Ok(None) if step.required => {
                let tried: Vec<String> = step.selectors.iter().map(|s| s.to_string()).collect();
                warn!("Required step '{}' found no element", step.name);
                return StepResult::failed(
                    step,
                    None,
                    format!("required element not found (tried {})", tried.join(", ")),
                );
            }
            Ok(None) => {
                info!("Step '{}' skipped: element not present", step.name);
                return StepResult::skipped(step);
            }
            Err(e) => {
                warn!("Step '{}' selector error: {}", step.name, e);
                return StepResult::failed(step, None, e.to_string());
            }
        };

        let action = match step.action {
            Action::Click | Action::Toggle => page.click(&element).await,
            Action::Fill => {
                let payload = step.payload.as_deref().unwrap_or_default();
                page.fill(&element, payload).await
            }
        };

        if let Err(e) = action {
            warn!("Step '{}' {} failed: {}", step.name, step.action, e);
            return StepResult::failed(step, Some(matched), e.to_string());
        }

        let settle = self
            .wait
            .settle(page, Duration::from_millis(step.settle_time_ms))
            .await;

        info!(
            "Step '{}' {} done (selector #{}, settle {:?})",
            step.name, step.action, matched, settle
        );
        StepResult::completed(step, matched, settle)
    }
}

impl Default for StepExecutor {
    fn default() -> Self {
        Self::new(Box::new(FixedDelay))
    }
}

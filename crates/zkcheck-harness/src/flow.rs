//! Best-effort sequential workflow driver
//!
//! Every step is attempted, in declared order, whatever happened to the ones
//! before it: a later control may still be reachable through another UI path,
//! and its console output is evidence either way.

use tracing::{info, warn};
use zkcheck_core::{Step, StepResult, StepStatus};

use crate::executor::StepExecutor;
use crate::session::Session;

/// Runs a workflow step by step
pub struct FlowDriver {
    executor: StepExecutor,
}

impl FlowDriver {
    pub fn new(executor: StepExecutor) -> Self {
        Self { executor }
    }

    /// Execute all steps in order; one result per step
    pub async fn run(&self, steps: &[Step], session: &Session) -> Vec<StepResult> {
        let mut results = Vec::with_capacity(steps.len());

        for (idx, step) in steps.iter().enumerate() {
            info!(
                "Executing step {} of {}: {} ({})",
                idx + 1,
                steps.len(),
                step.name,
                step.action
            );

            let result = self.executor.execute(step, session).await;

            match result.status() {
                StepStatus::Completed | StepStatus::Skipped => {
                    info!("Step {} {}", idx + 1, result.status())
                }
                StepStatus::Failed => warn!(
                    "Step {} failed (continuing): {}",
                    idx + 1,
                    result.error.as_deref().unwrap_or("unknown error")
                ),
            }

            results.push(result);
        }

        results
    }
}

impl Default for FlowDriver {
    fn default() -> Self {
        Self::new(StepExecutor::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeAction, FakeControl, FakePage};
    use std::sync::Arc;
    use zkcheck_core::SelectorSpec;

    #[tokio::test]
    async fn test_empty_flow() {
        let page = Arc::new(FakePage::new());
        let session = Session::open(page).unwrap();
        let results = FlowDriver::default().run(&[], &session).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_every_step_attempted() {
        let page = Arc::new(FakePage::new());
        let mint = page.add_control(FakeControl::new(SelectorSpec::text("Mint")));
        page.add_control(FakeControl::new(SelectorSpec::text("Continue")).fails_with("detached"));

        let steps = vec![
            Step::click("generate", SelectorSpec::text("Generate")).settle_ms(0),
            Step::click("continue", SelectorSpec::text("Continue")).settle_ms(0),
            Step::click("sent", SelectorSpec::text("Sent the BTC")).settle_ms(0).required(),
            Step::click("mint", SelectorSpec::text("Mint")).settle_ms(0),
        ];

        let session = Session::open(page.clone()).unwrap();
        let results = FlowDriver::default().run(&steps, &session).await;

        assert_eq!(results.len(), steps.len());
        let statuses: Vec<_> = results.iter().map(|r| r.status()).collect();
        assert_eq!(
            statuses,
            vec![
                StepStatus::Skipped,
                StepStatus::Failed,
                StepStatus::Failed,
                StepStatus::Completed
            ]
        );
        assert_eq!(page.actions().last(), Some(&FakeAction::Click(mint)));
    }

    #[tokio::test]
    async fn test_results_follow_declared_order() {
        let page = Arc::new(FakePage::new());
        let steps: Vec<Step> = ["a", "b", "c"]
            .iter()
            .map(|name| Step::click(*name, SelectorSpec::text(*name)).settle_ms(0))
            .collect();

        let session = Session::open(page).unwrap();
        let results = FlowDriver::default().run(&steps, &session).await;
        let names: Vec<_> = results.iter().map(|r| r.step.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}

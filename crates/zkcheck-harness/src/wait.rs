//! Post-action settle policies
//!
//! The deposit form never signals "done": address generation and proving run
//! asynchronously after a click. A step therefore settles for a bounded time
//! before the next one starts. A fixed delay is the default and the main
//! source of flakiness: too short and the next step races the app, too long
//! and the run crawls. Polling a page predicate is the upgrade path.
//!
//! Every policy is bounded by the step's settle time and never fails; a
//! predicate that never holds yields [`SettleOutcome::TimedOut`].

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;
use zkcheck_browser::Page;
use zkcheck_core::{SettleOutcome, WaitConfig};

/// Strategy for waiting after a step's action
#[async_trait]
pub trait WaitPolicy: Send + Sync {
    /// Wait at most `budget` for the page to settle
    async fn settle(&self, page: &dyn Page, budget: Duration) -> SettleOutcome;

    fn name(&self) -> &'static str;
}

/// Sleep for the whole budget
#[derive(Debug, Clone, Default)]
pub struct FixedDelay;

#[async_trait]
impl WaitPolicy for FixedDelay {
    async fn settle(&self, _page: &dyn Page, budget: Duration) -> SettleOutcome {
        sleep(budget).await;
        SettleOutcome::Elapsed
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Evaluate a JavaScript predicate until it is truthy
#[derive(Debug, Clone)]
pub struct PollUntil {
    predicate: String,
    interval: Duration,
}

impl PollUntil {
    pub fn new(predicate: impl Into<String>, interval: Duration) -> Self {
        Self {
            predicate: predicate.into(),
            interval: interval.max(Duration::from_millis(10)),
        }
    }
}

#[async_trait]
impl WaitPolicy for PollUntil {
    async fn settle(&self, page: &dyn Page, budget: Duration) -> SettleOutcome {
        let deadline = Instant::now() + budget;

        loop {
            match page.evaluate(&self.predicate).await {
                Ok(value) if is_truthy(&value) => return SettleOutcome::Satisfied,
                Ok(_) => {}
                Err(e) => debug!("Settle predicate failed, retrying: {}", e),
            }

            let now = Instant::now();
            if now >= deadline {
                return SettleOutcome::TimedOut;
            }
            sleep(self.interval.min(deadline - now)).await;
        }
    }

    fn name(&self) -> &'static str {
        "poll"
    }
}

/// Fixed minimum delay, then polling for the remaining budget
#[derive(Debug, Clone)]
pub struct Hybrid {
    min_delay: Duration,
    poll: PollUntil,
}

impl Hybrid {
    pub fn new(min_delay: Duration, poll: PollUntil) -> Self {
        Self { min_delay, poll }
    }
}

#[async_trait]
impl WaitPolicy for Hybrid {
    async fn settle(&self, page: &dyn Page, budget: Duration) -> SettleOutcome {
        let delay = self.min_delay.min(budget);
        sleep(delay).await;
        self.poll.settle(page, budget - delay).await
    }

    fn name(&self) -> &'static str {
        "hybrid"
    }
}

/// Build the configured policy
pub fn wait_policy(config: &WaitConfig) -> Box<dyn WaitPolicy> {
    match config {
        WaitConfig::Fixed => Box::new(FixedDelay),
        WaitConfig::Poll {
            predicate,
            interval_ms,
        } => Box::new(PollUntil::new(
            predicate.clone(),
            Duration::from_millis(*interval_ms),
        )),
        WaitConfig::Hybrid {
            min_delay_ms,
            predicate,
            interval_ms,
        } => Box::new(Hybrid::new(
            Duration::from_millis(*min_delay_ms),
            PollUntil::new(predicate.clone(), Duration::from_millis(*interval_ms)),
        )),
    }
}

/// JavaScript truthiness of an evaluation result
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePage;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!("complete")));
        assert!(is_truthy(&json!([])));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&Value::Null));
    }

    #[tokio::test]
    async fn test_fixed_delay_elapses() {
        let page = FakePage::new();
        let started = std::time::Instant::now();
        let outcome = FixedDelay.settle(&page, Duration::from_millis(20)).await;
        assert_eq!(outcome, SettleOutcome::Elapsed);
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_poll_satisfied_after_false_results() {
        let page = FakePage::new();
        page.script_evaluations([json!(false), json!(false), json!(true)]);

        let policy = PollUntil::new("window.done", Duration::from_millis(10));
        let outcome = policy.settle(&page, Duration::from_secs(2)).await;
        assert_eq!(outcome, SettleOutcome::Satisfied);
        assert_eq!(page.evaluations().len(), 3);
    }

    #[tokio::test]
    async fn test_poll_times_out() {
        let page = FakePage::new();
        page.set_default_evaluation(json!(false));

        let policy = PollUntil::new("window.done", Duration::from_millis(10));
        let outcome = policy.settle(&page, Duration::from_millis(50)).await;
        assert_eq!(outcome, SettleOutcome::TimedOut);
        assert!(page.evaluations().len() >= 2);
    }

    #[tokio::test]
    async fn test_hybrid_waits_minimum_then_polls() {
        let page = FakePage::new();
        let started = std::time::Instant::now();

        let policy = Hybrid::new(
            Duration::from_millis(30),
            PollUntil::new("true", Duration::from_millis(10)),
        );
        let outcome = policy.settle(&page, Duration::from_secs(1)).await;
        assert_eq!(outcome, SettleOutcome::Satisfied);
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_policy_from_config() {
        assert_eq!(wait_policy(&WaitConfig::Fixed).name(), "fixed");
        assert_eq!(
            wait_policy(&WaitConfig::Poll {
                predicate: "true".into(),
                interval_ms: 100
            })
            .name(),
            "poll"
        );
        assert_eq!(
            wait_policy(&WaitConfig::Hybrid {
                min_delay_ms: 100,
                predicate: "true".into(),
                interval_ms: 100
            })
            .name(),
            "hybrid"
        );
    }
}

//! # zkcheck-harness
//!
//! Step execution and verification engine for the bridge deposit flow.
//!
//! A run has two independent halves. The [`ResourceProbe`] fetches the
//! circuit artifacts straight from the server. The [`FlowDriver`] replays the
//! deposit form step by step while a [`LogBuffer`] records every console
//! message. Once the session is finished, the [`KeywordCorrelator`] projects
//! the log onto keyword views and the marker phrase, and the
//! [`VerificationReporter`] turns all of it into a [`Verdict`].
//!
//! ```no_run
//! use zkcheck_core::HarnessConfig;
//! use zkcheck_harness::Harness;
//!
//! # async fn example() -> zkcheck_core::Result<()> {
//! let report = Harness::new(HarnessConfig::default()).run().await?;
//! println!("{}", report.render());
//! # Ok(())
//! # }
//! ```
//!
//! [`Verdict`]: zkcheck_core::Verdict

pub mod console;
pub mod correlate;
pub mod executor;
pub mod flow;
pub mod harness;
pub mod probe;
pub mod report;
pub mod resolver;
pub mod session;
pub mod testing;
pub mod wait;

pub use console::LogBuffer;
pub use correlate::{correlate, signal_present, CorrelatedView, Correlation, KeywordCorrelator};
pub use executor::StepExecutor;
pub use flow::FlowDriver;
pub use harness::Harness;
pub use probe::ResourceProbe;
pub use report::{Report, VerificationReporter};
pub use resolver::{compile, compile_for, ElementResolver};
pub use session::{FinishedSession, Session};
pub use wait::{wait_policy, FixedDelay, Hybrid, PollUntil, WaitPolicy};

//! # zkcheck-core
//!
//! Shared types for the zkcheck deposit-flow harness.
//!
//! zkcheck drives the bridge deposit form in a headless browser and decides,
//! from the outside, whether the client-side prover actually ran:
//!
//! - circuit artifacts are fetched directly and must answer 200
//! - the workflow is replayed as declarative [`Step`]s, best effort
//! - console output is buffered as [`LogEvent`]s and matched against keywords
//! - a marker phrase in the console is the only hard success signal
//!
//! This crate holds the data model, the unified [`HarnessError`], the TOML
//! [`HarnessConfig`] and the built-in deposit [`workflow`].

pub mod config;
mod error;
pub mod fail_open;
mod types;
pub mod workflow;

pub use config::{BrowserConfig, HarnessConfig, WaitConfig};
pub use error::{HarnessError, Result};
pub use types::*;

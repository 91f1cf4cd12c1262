//! Browser error types - re-exports the unified HarnessError from zkcheck-core
//!
//! Browser operations map engine failures onto these variants:
//! - BrowserLaunch / Navigation - fatal, the run cannot observe anything
//! - Browser / ElementQuery / ActionFailed / Screenshot - recorded, the run continues
//!
//! Error messages should name the URL, selector or file involved.

pub use zkcheck_core::{HarnessError, Result};

pub type BrowserError = HarnessError;

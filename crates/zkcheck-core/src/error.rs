//! Unified error types for zkcheck

use thiserror::Error;

/// Unified error type for all harness operations
#[derive(Error, Debug)]
pub enum HarnessError {
    // Infrastructure errors (fatal)
    #[error("Browser launch failed: {0}")]
    BrowserLaunch(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    // Browser engine errors
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Element query failed: {0}")]
    ElementQuery(String),

    #[error("{action} failed: {reason}")]
    ActionFailed { action: String, reason: String },

    #[error("Screenshot failed: {0}")]
    Screenshot(String),

    // Workflow definition errors
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Invalid step: {0}")]
    InvalidStep(String),

    // Resource probe errors
    #[error("Probe failed: {0}")]
    Probe(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl HarnessError {
    /// Whether this error means the harness itself could not run.
    ///
    /// Only a browser that never launched or a page that never loaded abort a
    /// run. Everything else is recorded as evidence and the run continues.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HarnessError::BrowserLaunch(_) | HarnessError::Navigation { .. }
        )
    }
}

/// Result type alias using HarnessError
pub type Result<T> = std::result::Result<T, HarnessError>;

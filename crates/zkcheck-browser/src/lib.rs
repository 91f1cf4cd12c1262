//! Browser engine boundary for zkcheck
//!
//! This crate wraps Chrome DevTools Protocol automation behind the [`Page`]
//! trait so the harness can drive the deposit form without knowing which
//! engine is underneath.
//!
//! # Features
//!
//! - **Browser Management**: Launch Chrome/Chromium or attach to a running instance
//! - **Element Queries**: First-match resolution by CSS, visible text and ancestor relation
//! - **Console Capture**: Every `console.*` call forwarded to a [`ConsoleSink`]
//! - **Checkpoints**: Deterministically named full-page screenshots
//!
//! # Example
//!
//! ```no_run
//! use zkcheck_browser::{BrowserSession, ElementQuery, Page};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = BrowserSession::launch().await?;
//!     session.navigate("http://localhost:3000/bridge").await?;
//!
//!     let query = ElementQuery::css("button").with_text("Generate");
//!     if let Some(button) = session.find_first(&query).await? {
//!         session.click(&button).await?;
//!     }
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Requirements
//!
//! - Chrome or Chromium installed
//! - For connecting to an existing browser: `chrome --remote-debugging-port=9222`

pub mod browser;
pub mod error;
pub mod page;
pub mod screenshot;

// Re-export commonly used types
pub use browser::BrowserSession;
pub use error::{BrowserError, HarnessError, Result};
pub use page::{AncestorMatch, ConsoleSink, ElementHandle, ElementQuery, Page};
pub use screenshot::{Checkpoint, CheckpointCamera};

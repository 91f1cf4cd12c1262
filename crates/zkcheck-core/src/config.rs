//! Configuration management for zkcheck
//!
//! A run is fully described by [`HarnessConfig`]: where the app lives, which
//! circuit artifacts to probe, the workflow steps, how to settle between steps
//! and which console keywords count as evidence. Every field defaults to the
//! bridge deposit flow, so an empty file is a valid config.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::{KeywordView, ResourceCheck, Step};
use crate::workflow;
use crate::{HarnessError, Result};

/// Default config file name
pub const CONFIG_FILE_NAME: &str = "zkcheck.toml";

/// Page predicate used by the polling wait policies
pub const DEFAULT_IDLE_PREDICATE: &str =
    "document.readyState === 'complete' && !document.querySelector('[aria-busy=\"true\"], .animate-spin')";

/// Join `path` onto `base`; absolute http(s) URLs pass through
///
/// Navigation and resource probes both resolve through this, so they always
/// agree on where a relative path points.
pub fn join_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Top-level harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Application origin, e.g. `http://localhost:3000`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Route of the multi-step deposit form
    #[serde(default = "default_route")]
    pub route: String,

    /// Per-request timeout for resource probes
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Console phrase that proves the note was created
    #[serde(default = "default_marker_phrase")]
    pub marker_phrase: String,

    /// Number of trailing raw console events kept as evidence
    #[serde(default = "default_evidence_tail")]
    pub evidence_tail: usize,

    /// Extra wait after the last step for late async work
    #[serde(default = "default_final_settle_ms")]
    pub final_settle_ms: u64,

    /// Screenshot output directory
    #[serde(default = "default_screenshot_dir")]
    pub screenshot_dir: PathBuf,

    /// Screenshot file name prefix
    #[serde(default = "default_screenshot_prefix")]
    pub screenshot_prefix: String,

    /// Browser launch and page-load settings
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Static assets fetched before the workflow runs
    #[serde(default = "workflow::circuit_artifacts")]
    pub resources: Vec<ResourceCheck>,

    /// Workflow steps, executed in order
    #[serde(default = "workflow::deposit_flow")]
    pub steps: Vec<Step>,

    /// Post-action settle policy
    #[serde(default)]
    pub wait: WaitConfig,

    /// Named keyword sets reported as filtered log sections
    #[serde(default = "workflow::default_views")]
    pub views: Vec<KeywordView>,
}

/// Browser launch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Run in headless mode
    #[serde(default = "default_true")]
    pub headless: bool,
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Navigation timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Upper bound on waiting for network idle after navigation
    #[serde(default = "default_network_idle_ms")]
    pub network_idle_timeout_ms: u64,
}

/// Settle policy applied after each step's action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum WaitConfig {
    /// Sleep for the step's settle time
    Fixed,
    /// Poll `predicate` every `interval_ms` until true or the settle time runs out
    Poll {
        #[serde(default = "default_predicate")]
        predicate: String,
        #[serde(default = "default_poll_interval_ms")]
        interval_ms: u64,
    },
    /// Sleep `min_delay_ms`, then poll for the rest of the settle time
    Hybrid {
        #[serde(default = "default_min_delay_ms")]
        min_delay_ms: u64,
        #[serde(default = "default_predicate")]
        predicate: String,
        #[serde(default = "default_poll_interval_ms")]
        interval_ms: u64,
    },
}

// Default value providers
fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_route() -> String {
    "/bridge".to_string()
}

fn default_probe_timeout_ms() -> u64 {
    10_000
}

fn default_marker_phrase() -> String {
    workflow::NOTE_CREATED_MARKER.to_string()
}

fn default_evidence_tail() -> usize {
    30
}

fn default_final_settle_ms() -> u64 {
    2000
}

fn default_screenshot_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_screenshot_prefix() -> String {
    "bridge".to_string()
}

fn default_true() -> bool {
    true
}

fn default_window_width() -> u32 {
    1920
}

fn default_window_height() -> u32 {
    1080
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_network_idle_ms() -> u64 {
    15_000
}

fn default_predicate() -> String {
    DEFAULT_IDLE_PREDICATE.to_string()
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_min_delay_ms() -> u64 {
    300
}

impl HarnessConfig {
    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| HarnessError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load configuration from `path`, or defaults when the file is absent
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write the default configuration to `path`
    pub fn write_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| HarnessError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check every workflow definition is executable
    pub fn validate(&self) -> Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(HarnessError::Config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        for step in &self.steps {
            step.validate()
                .map_err(|e| HarnessError::Config(format!("step '{}': {}", step.name, e)))?;
        }
        if self.marker_phrase.trim().is_empty() {
            return Err(HarnessError::Config("marker_phrase is empty".to_string()));
        }
        Ok(())
    }

    /// Join a path onto the base URL; absolute URLs pass through
    pub fn resolve_url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    /// URL of the deposit form
    pub fn target_url(&self) -> String {
        self.resolve_url(&self.route)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn final_settle(&self) -> Duration {
        Duration::from_millis(self.final_settle_ms)
    }
}

impl BrowserConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn network_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.network_idle_timeout_ms)
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            route: default_route(),
            browser: BrowserConfig::default(),
            resources: workflow::circuit_artifacts(),
            probe_timeout_ms: default_probe_timeout_ms(),
            steps: workflow::deposit_flow(),
            wait: WaitConfig::default(),
            views: workflow::default_views(),
            marker_phrase: default_marker_phrase(),
            evidence_tail: default_evidence_tail(),
            final_settle_ms: default_final_settle_ms(),
            screenshot_dir: default_screenshot_dir(),
            screenshot_prefix: default_screenshot_prefix(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: default_window_width(),
            window_height: default_window_height(),
            user_agent: None,
            timeout_seconds: default_timeout_seconds(),
            network_idle_timeout_ms: default_network_idle_ms(),
        }
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        WaitConfig::Fixed
    }
}

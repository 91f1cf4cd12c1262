//! Browser lifecycle management using Chrome DevTools Protocol

use crate::error::{HarnessError, Result};
use crate::page::{ConsoleSink, ElementHandle, ElementQuery, Page};
use async_trait::async_trait;
use headless_chrome::protocol::cdp::types::Event;
use base64::{engine::general_purpose::STANDARD, Engine};
use headless_chrome::protocol::cdp::Page as Cdp;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use zkcheck_core::{BrowserConfig, Severity};

/// Quiet period with no new resource entries that counts as network idle
const NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);
const NETWORK_IDLE_POLL: Duration = Duration::from_millis(100);

/// Active browser session with Chrome DevTools Protocol
pub struct BrowserSession {
    /// Underlying browser instance (kept alive for tab lifetime)
    #[allow(dead_code)]
    browser: Browser,
    /// Current active tab
    tab: Arc<Tab>,
    /// Configuration
    config: BrowserConfig,
}

impl BrowserSession {
    /// Launch a new browser instance with default settings
    pub async fn launch() -> Result<Self> {
        Self::launch_with_config(BrowserConfig::default()).await
    }

    /// Launch browser with custom configuration
    pub async fn launch_with_config(config: BrowserConfig) -> Result<Self> {
        info!(
            "Launching browser (headless: {}, size: {}x{})",
            config.headless, config.window_width, config.window_height
        );

        let mut launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .window_size(Some((config.window_width, config.window_height)))
            .build()
            .map_err(|e| HarnessError::BrowserLaunch(format!("Invalid launch options: {}", e)))?;

        let user_agent_arg: Option<String> =
            config.user_agent.as_ref().map(|ua| format!("--user-agent={}", ua));
        if let Some(ref ua_arg) = user_agent_arg {
            launch_options.args.push(OsStr::new(ua_arg));
        }

        let browser = Browser::new(launch_options)
            .map_err(|e| HarnessError::BrowserLaunch(e.to_string()))?;

        let tab = browser
            .new_tab()
            .map_err(|e| HarnessError::BrowserLaunch(format!("Failed to create tab: {}", e)))?;
        tab.set_default_timeout(config.navigation_timeout());

        info!("Browser launched successfully");

        Ok(Self {
            browser,
            tab,
            config,
        })
    }

    /// Connect to an already running browser
    ///
    /// # Arguments
    /// * `port` - Chrome DevTools Protocol port (typically 9222)
    pub async fn connect(port: u16, config: BrowserConfig) -> Result<Self> {
        info!("Connecting to existing browser on port {}", port);

        let browser = Browser::connect(format!("http://127.0.0.1:{}", port))
            .map_err(|e| HarnessError::BrowserLaunch(format!("Failed to connect: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| HarnessError::BrowserLaunch(format!("Failed to create tab: {}", e)))?;
        tab.set_default_timeout(config.navigation_timeout());

        info!("Connected to browser successfully");

        Ok(Self {
            browser,
            tab,
            config,
        })
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    /// Get reference to the active tab
    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }

    /// Close the browser session
    pub async fn close(self) -> Result<()> {
        info!("Closing browser session");
        // Browser process is killed when `browser` drops
        Ok(())
    }

    fn browser_err(context: &str, e: impl std::fmt::Display) -> HarnessError {
        HarnessError::Browser(format!("{}: {}", context, e))
    }
}

#[async_trait]
impl Page for BrowserSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        debug!("Navigating to {}", url);

        let navigation_err = |e: &dyn std::fmt::Display| HarnessError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        };

        self.tab.navigate_to(url).map_err(|e| navigation_err(&e))?;
        self.tab.wait_until_navigated().map_err(|e| navigation_err(&e))?;

        info!("Successfully navigated to {}", url);
        Ok(())
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<bool> {
        let started = Instant::now();
        let mut last_count: Option<u64> = None;
        let mut quiet_since = Instant::now();

        while started.elapsed() < timeout {
            let state = self
                .evaluate("[document.readyState, performance.getEntriesByType('resource').length]")
                .await?;
            let ready = state.get(0).and_then(Value::as_str) == Some("complete");
            let count = state.get(1).and_then(Value::as_u64).unwrap_or(0);

            if last_count != Some(count) || !ready {
                last_count = Some(count);
                quiet_since = Instant::now();
            } else if quiet_since.elapsed() >= NETWORK_IDLE_WINDOW {
                debug!("Network idle after {:?} ({} resources)", started.elapsed(), count);
                return Ok(true);
            }

            tokio::time::sleep(NETWORK_IDLE_POLL).await;
        }

        warn!("Network did not go idle within {:?}", timeout);
        Ok(false)
    }

    async fn find_first(&self, query: &ElementQuery) -> Result<Option<ElementHandle>> {
        let result = self
            .tab
            .evaluate(&query.to_script(), false)
            .map_err(|e| HarnessError::ElementQuery(format!("{}: {}", query.css, e)))?;

        Ok(result
            .value
            .as_ref()
            .and_then(Value::as_str)
            .map(ElementHandle::new))
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        let target = self
            .tab
            .find_element(&element.css())
            .map_err(|e| HarnessError::ElementQuery(format!("{}: {}", element.css(), e)))?;

        target.click().map_err(|e| HarnessError::ActionFailed {
            action: "click".to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    async fn fill(&self, element: &ElementHandle, value: &str) -> Result<()> {
        let target = self
            .tab
            .find_element(&element.css())
            .map_err(|e| HarnessError::ElementQuery(format!("{}: {}", element.css(), e)))?;

        let action_err = |e: &dyn std::fmt::Display| HarnessError::ActionFailed {
            action: "fill".to_string(),
            reason: e.to_string(),
        };

        // Typed input keeps framework-controlled inputs in sync, unlike setting .value
        target.click().map_err(|e| action_err(&e))?;
        target
            .call_js_fn(
                "function() { try { this.select(); } catch (e) { this.value = ''; } }",
                vec![],
                false,
            )
            .map_err(|e| action_err(&e))?;
        self.tab.type_str(value).map_err(|e| action_err(&e))?;
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        debug!("Evaluating JavaScript: {}", script);

        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| Self::browser_err("JavaScript evaluation failed", e))?;

        Ok(result.value.unwrap_or(Value::Null))
    }

    async fn screenshot(&self, path: &Path) -> Result<u64> {
        let capture_err = |e: &dyn std::fmt::Display| {
            HarnessError::Screenshot(format!("CDP capture failed: {}", e))
        };

        let metrics = self
            .tab
            .call_method(Cdp::GetLayoutMetrics(None))
            .map_err(|e| capture_err(&e))?;
        let clip = full_page_clip(&serde_json::to_value(&metrics)?);
        if clip.is_none() {
            warn!("Page reported no content size, capturing the viewport only");
        }

        let encoded = self
            .tab
            .call_method(Cdp::CaptureScreenshot {
                format: Some(Cdp::CaptureScreenshotFormatOption::Png),
                quality: None,
                clip,
                from_surface: Some(true),
                capture_beyond_viewport: Some(true),
                optimize_for_speed: None,
            })
            .map_err(|e| capture_err(&e))?
            .data;
        let data = STANDARD.decode(encoded).map_err(|e| capture_err(&e))?;

        tokio::fs::write(path, &data).await.map_err(|e| {
            HarnessError::Screenshot(format!("Failed to write {}: {}", path.display(), e))
        })?;

        Ok(data.len() as u64)
    }

    fn subscribe_console(&self, sink: Arc<dyn ConsoleSink>) -> Result<()> {
        self.tab
            .enable_runtime()
            .map_err(|e| Self::browser_err("Failed to enable Runtime domain", e))?;

        let listener = move |event: &Event| {
            if let Event::RuntimeConsoleAPICalled(called) = event {
                let kind = serde_json::to_value(&called.params.Type).unwrap_or(Value::Null);
                let severity = severity_from_cdp(kind.as_str().unwrap_or("log"));
                let text = called
                    .params
                    .args
                    .iter()
                    .map(|arg| render_console_arg(arg.value.as_ref(), arg.description.as_deref()))
                    .collect::<Vec<_>>()
                    .join(" ");
                sink.on_console(severity, text);
            }
        };

        self.tab
            .add_event_listener(Arc::new(listener))
            .map_err(|e| Self::browser_err("Failed to subscribe to console", e))?;

        debug!("Subscribed to console events");
        Ok(())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        debug!("BrowserSession dropped, browser will be cleaned up");
    }
}

/// Clip covering the whole scrollable document, from `Page.getLayoutMetrics`
///
/// Prefers the CSS-pixel content size and falls back to the deprecated
/// device-pixel one for older engines.
pub fn full_page_clip(metrics: &Value) -> Option<Cdp::Viewport> {
    let size = metrics
        .get("cssContentSize")
        .or_else(|| metrics.get("contentSize"))?;
    let width = size.get("width").and_then(Value::as_f64)?;
    let height = size.get("height").and_then(Value::as_f64)?;
    if width <= 0.0 || height <= 0.0 {
        return None;
    }

    Some(Cdp::Viewport {
        x: 0.0,
        y: 0.0,
        width: width.ceil(),
        height: height.ceil(),
        scale: 1.0,
    })
}

/// Map a CDP `consoleAPICalled` type onto the harness severities
pub fn severity_from_cdp(kind: &str) -> Severity {
    match kind {
        "error" | "assert" => Severity::Error,
        "warning" => Severity::Warn,
        "info" => Severity::Info,
        _ => Severity::Log,
    }
}

/// Render one console argument the way devtools prints it inline
pub fn render_console_arg(value: Option<&Value>, description: Option<&str>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(v) => v.to_string(),
        None => description.unwrap_or("undefined").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_severity_mapping() {
        assert_eq!(severity_from_cdp("log"), Severity::Log);
        assert_eq!(severity_from_cdp("debug"), Severity::Log);
        assert_eq!(severity_from_cdp("info"), Severity::Info);
        assert_eq!(severity_from_cdp("warning"), Severity::Warn);
        assert_eq!(severity_from_cdp("error"), Severity::Error);
        assert_eq!(severity_from_cdp("assert"), Severity::Error);
    }

    #[test]
    fn test_render_console_arg() {
        assert_eq!(
            render_console_arg(Some(&json!("Poseidon note created")), None),
            "Poseidon note created"
        );
        assert_eq!(render_console_arg(Some(&json!(10000)), None), "10000");
        assert_eq!(
            render_console_arg(Some(&json!({"amount": 1})), None),
            r#"{"amount":1}"#
        );
        assert_eq!(
            render_console_arg(None, Some("Error: proof failed\n    at prove")),
            "Error: proof failed\n    at prove"
        );
        assert_eq!(render_console_arg(None, None), "undefined");
    }

    #[test]
    fn test_full_page_clip_uses_css_content_size() {
        let metrics = json!({
            "contentSize": {"x": 0, "y": 0, "width": 2880, "height": 9000},
            "cssContentSize": {"x": 0, "y": 0, "width": 1440.0, "height": 4499.5}
        });
        let clip = full_page_clip(&metrics).unwrap();
        assert_eq!(clip.x, 0.0);
        assert_eq!(clip.y, 0.0);
        assert_eq!(clip.width, 1440.0);
        assert_eq!(clip.height, 4500.0);
        assert_eq!(clip.scale, 1.0);
    }

    #[test]
    fn test_full_page_clip_falls_back_to_device_size() {
        let metrics = json!({"contentSize": {"x": 0, "y": 0, "width": 1920, "height": 3000}});
        let clip = full_page_clip(&metrics).unwrap();
        assert_eq!(clip.width, 1920.0);
        assert_eq!(clip.height, 3000.0);
    }

    #[test]
    fn test_full_page_clip_missing_or_empty() {
        assert!(full_page_clip(&json!({})).is_none());
        assert!(full_page_clip(&json!({"cssContentSize": {"width": 0, "height": 800}})).is_none());
    }

    const RESOLVER_FIXTURE: &str = r#"<!doctype html>
<html><body>
  <button id="first-continue">Continue</button>
  <button id="second-continue">  continue  </button>
  <label id="confirm-label"><span><input id="wrapped" type="checkbox"></span> I confirm</label>
  <div id="confirm-wrapper"><input id="bare" type="checkbox"></div>
  <section><p><button id="mint">Mint
      Now</button></p></section>
</body></html>"#;

    async fn resolved_id(session: &BrowserSession, query: &ElementQuery) -> Option<String> {
        let handle = session.find_first(query).await.unwrap()?;
        let id = session
            .evaluate(&format!("document.querySelector({:?}).id", handle.css()))
            .await
            .unwrap();
        id.as_str().map(str::to_string)
    }

    // Needs a local Chrome/Chromium. Run with: cargo test -- --ignored
    #[tokio::test]
    #[ignore]
    async fn test_find_first_in_real_page() {
        let dir = tempfile::TempDir::new().unwrap();
        let page = dir.path().join("resolver.html");
        std::fs::write(&page, RESOLVER_FIXTURE).unwrap();

        let session = BrowserSession::launch().await.unwrap();
        session
            .navigate(&format!("file://{}", page.display()))
            .await
            .unwrap();

        let continue_query = ElementQuery::css("button").with_text("CONTINUE");
        assert_eq!(
            resolved_id(&session, &continue_query).await.as_deref(),
            Some("first-continue")
        );
        let first = session.find_first(&continue_query).await.unwrap();
        let repeat = session.find_first(&continue_query).await.unwrap();
        assert_eq!(first, repeat);

        let mint = ElementQuery::css("button").with_text("mint now");
        assert_eq!(resolved_id(&session, &mint).await.as_deref(), Some("mint"));

        let labeled = ElementQuery::css("label input[type=\"checkbox\"]").with_ancestor("label", false);
        assert_eq!(
            resolved_id(&session, &labeled).await.as_deref(),
            Some("confirm-label")
        );

        let wrapped = ElementQuery::css("input[type=\"checkbox\"]").with_ancestor("div", true);
        assert_eq!(
            resolved_id(&session, &wrapped).await.as_deref(),
            Some("confirm-wrapper")
        );

        let direct_label = ElementQuery::css("input[type=\"checkbox\"]").with_ancestor("label", true);
        assert!(session.find_first(&direct_label).await.unwrap().is_none());

        let absent = ElementQuery::css("button").with_text("Sent the BTC");
        assert!(session.find_first(&absent).await.unwrap().is_none());

        session.close().await.unwrap();
    }
}

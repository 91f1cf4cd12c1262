//! Top-level run: probe, drive the deposit form, correlate, report

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use zkcheck_browser::{BrowserSession, CheckpointCamera, Page};
use zkcheck_core::fail_open::fail_open_within;
use zkcheck_core::{HarnessConfig, HarnessError, ResourceResult, Result};

use crate::correlate::KeywordCorrelator;
use crate::executor::StepExecutor;
use crate::flow::FlowDriver;
use crate::probe::ResourceProbe;
use crate::report::{Report, VerificationReporter};
use crate::session::Session;
use crate::wait::wait_policy;

/// Grace period on top of the page's own network-idle timeout
const IDLE_GRACE: Duration = Duration::from_secs(1);

/// Runs one verification against a configured app
pub struct Harness {
    config: HarnessConfig,
    debug_port: Option<u16>,
}

impl Harness {
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            debug_port: None,
        }
    }

    /// Attach to a browser already listening on `port` instead of launching one
    pub fn connect_to(mut self, port: u16) -> Self {
        self.debug_port = Some(port);
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Fetch every configured resource without touching a browser
    pub async fn probe_only(&self) -> Result<Vec<ResourceResult>> {
        info!("Checking {} circuit files", self.config.resources.len());
        let probe = ResourceProbe::new(&self.config.base_url, self.config.probe_timeout())?;
        Ok(probe.check_all(&self.config.resources).await)
    }

    /// Full run against a real browser
    ///
    /// Only a browser that cannot be started or a page that cannot be loaded
    /// end in `Err`; every other failure is part of the returned report.
    pub async fn run(&self) -> Result<Report> {
        let resources = self.probe_only().await?;

        let browser = match self.debug_port {
            Some(port) => BrowserSession::connect(port, self.config.browser.clone()).await?,
            None => BrowserSession::launch_with_config(self.config.browser.clone()).await?,
        };
        let browser = Arc::new(browser);

        let report = self.run_with_page(browser.clone(), resources).await;

        match Arc::try_unwrap(browser) {
            Ok(browser) => {
                if let Err(e) = browser.close().await {
                    warn!("Failed to close browser: {}", e);
                }
            }
            Err(_) => debug!("Browser still referenced, closing on drop"),
        }

        report
    }

    /// Drive the workflow on an already open page
    pub async fn run_with_page(
        &self,
        page: Arc<dyn Page>,
        resources: Vec<ResourceResult>,
    ) -> Result<Report> {
        let config = &self.config;
        let camera = CheckpointCamera::new(
            config.screenshot_dir.clone(),
            config.screenshot_prefix.clone(),
        );
        let session = Session::open(page)?.with_camera(camera);

        let url = config.target_url();
        info!("Navigating to {}", url);
        session.page().navigate(&url).await.map_err(|e| {
            if matches!(e, HarnessError::Navigation { .. }) {
                e
            } else {
                HarnessError::Navigation {
                    url: url.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        let idle_timeout = config.browser.network_idle_timeout();
        match fail_open_within(
            "network idle",
            idle_timeout + IDLE_GRACE,
            session.page().wait_for_network_idle(idle_timeout),
        )
        .await
        {
            Some(true) => debug!("Network idle"),
            Some(false) => warn!("Network still busy after {:?}, continuing", idle_timeout),
            None => {}
        }
        session.checkpoint("initial").await;

        let driver = FlowDriver::new(StepExecutor::new(wait_policy(&config.wait)));
        let steps = driver.run(&config.steps, &session).await;

        info!("Waiting {:?} for late console output", config.final_settle());
        tokio::time::sleep(config.final_settle()).await;
        session.checkpoint("waiting").await;

        let finished = session.finish();
        info!("Captured {} console messages", finished.events().len());

        let correlation = KeywordCorrelator::new(config.views.clone(), config.marker_phrase.as_str())
            .project(finished.events());
        let report = VerificationReporter::new(config.evidence_tail).build(
            resources,
            steps,
            correlation,
            &finished,
        );

        info!(
            "Verdict: resources {}, marker {}, overall {}",
            report.verdict.resource_ok, report.verdict.signal_present, report.verdict.overall_ok
        );
        Ok(report)
    }
}

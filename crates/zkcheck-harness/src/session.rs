//! One browser page plus its console buffer, for exactly one run

use std::sync::{Arc, Mutex};
use zkcheck_browser::{Checkpoint, CheckpointCamera, ConsoleSink, Page};
use zkcheck_core::fail_open::fail_open;
use zkcheck_core::{LogEvent, Result};

use crate::console::LogBuffer;

/// A live harness session
///
/// Owns the page and the console buffer. The buffer is subscribed before
/// anything else happens on the page so no early message is missed.
pub struct Session {
    page: Arc<dyn Page>,
    log: Arc<LogBuffer>,
    camera: Option<CheckpointCamera>,
    checkpoints: Mutex<Vec<Checkpoint>>,
}

impl Session {
    /// Wrap `page` and start capturing its console
    pub fn open(page: Arc<dyn Page>) -> Result<Self> {
        let log = Arc::new(LogBuffer::new());
        let sink: Arc<dyn ConsoleSink> = log.clone();
        page.subscribe_console(sink)?;

        Ok(Self {
            page,
            log,
            camera: None,
            checkpoints: Mutex::new(Vec::new()),
        })
    }

    /// Enable checkpoint screenshots
    pub fn with_camera(mut self, camera: CheckpointCamera) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn page(&self) -> &dyn Page {
        self.page.as_ref()
    }

    pub fn log(&self) -> &LogBuffer {
        &self.log
    }

    /// Snapshot of the console so far
    pub fn drain(&self) -> Vec<LogEvent> {
        self.log.drain()
    }

    /// Capture a named checkpoint; failures are logged and skipped
    pub async fn checkpoint(&self, name: &str) -> Option<Checkpoint> {
        let camera = self.camera.as_ref()?;
        let checkpoint = fail_open(
            &format!("checkpoint '{}'", name),
            camera.capture(self.page.as_ref(), name),
        )
        .await?;

        self.checkpoints
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(checkpoint.clone());
        Some(checkpoint)
    }

    /// End the session: seal the console and keep the final snapshot
    pub fn finish(self) -> FinishedSession {
        let events = self.log.seal();
        let checkpoints = self
            .checkpoints
            .into_inner()
            .unwrap_or_else(|p| p.into_inner());

        FinishedSession {
            events,
            checkpoints,
        }
    }
}

/// Terminal state of a session; the only input the reporter accepts
#[derive(Debug, Clone)]
pub struct FinishedSession {
    events: Vec<LogEvent>,
    checkpoints: Vec<Checkpoint>,
}

impl FinishedSession {
    pub fn events(&self) -> &[LogEvent] {
        &self.events
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    /// Last `n` events, oldest first
    pub fn tail(&self, n: usize) -> &[LogEvent] {
        let start = self.events.len().saturating_sub(n);
        &self.events[start..]
    }
}

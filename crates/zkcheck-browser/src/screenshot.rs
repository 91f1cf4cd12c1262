//! Checkpoint screenshots for visual audit
//!
//! Each checkpoint becomes `<dir>/<prefix>-<n>-<name>.png`, numbered in the
//! order checkpoints are taken, so two runs of the same workflow produce the
//! same file names.

use crate::error::Result;
use crate::page::Page;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

/// A screenshot written to disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Checkpoint {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Names and captures full-page checkpoint screenshots
#[derive(Debug)]
pub struct CheckpointCamera {
    dir: PathBuf,
    prefix: String,
    taken: AtomicUsize,
}

impl CheckpointCamera {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            taken: AtomicUsize::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path the next checkpoint called `name` will be written to
    pub fn next_path(&self, name: &str) -> PathBuf {
        let index = self.taken.load(Ordering::SeqCst) + 1;
        self.path_for(index, name)
    }

    fn path_for(&self, index: usize, name: &str) -> PathBuf {
        let safe: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
            .collect();
        self.dir.join(format!("{}-{}-{}.png", self.prefix, index, safe))
    }

    /// Capture a full-page screenshot of `page`
    ///
    /// The counter advances even when capture fails, so later checkpoint
    /// names do not shift.
    pub async fn capture(&self, page: &dyn Page, name: &str) -> Result<Checkpoint> {
        let index = self.taken.fetch_add(1, Ordering::SeqCst) + 1;
        let path = self.path_for(index, name);

        tokio::fs::create_dir_all(&self.dir).await?;
        let size_bytes = page.screenshot(&path).await?;

        info!("Screenshot saved: {} ({} bytes)", path.display(), size_bytes);

        Ok(Checkpoint {
            name: name.to_string(),
            path,
            size_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_naming() {
        let camera = CheckpointCamera::new("/tmp", "bridge");
        assert_eq!(
            camera.next_path("initial"),
            PathBuf::from("/tmp/bridge-1-initial.png")
        );
        assert_eq!(
            camera.next_path("after deposit"),
            PathBuf::from("/tmp/bridge-1-after-deposit.png")
        );
    }
}

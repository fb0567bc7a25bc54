use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::time::{self, MissedTickBehavior};
use tracing::{info, warn};

pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Resolves once the file at `path` has been replaced.
///
/// Changes younger than `settle` are ignored until the writer is done.
#[derive(Debug, Clone)]
pub struct BinaryWatcher {
    path: PathBuf,
    poll: Duration,
    settle: Duration,
}

impl BinaryWatcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            poll: POLL_INTERVAL,
            settle: POLL_INTERVAL,
        }
    }

    /// Watches the running executable.
    pub fn current_exe() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }

    pub fn with_poll(mut self, poll: Duration, settle: Duration) -> Self {
        self.poll = poll;
        self.settle = settle;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn changed(&self) {
        let initial = modified(&self.path);
        let mut ticker = time::interval(self.poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let Some(current) = modified(&self.path) else {
                continue;
            };
            if Some(current) == initial {
                continue;
            }
            let age = SystemTime::now()
                .duration_since(current)
                .unwrap_or(Duration::ZERO);
            if age < self.settle {
                continue;
            }
            info!(path = %self.path.display(), "executable changed, shutting down");
            return;
        }
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    match std::fs::metadata(path).and_then(|meta| meta.modified()) {
        Ok(mtime) => Some(mtime),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "cannot stat executable");
            None
        }
    }
}

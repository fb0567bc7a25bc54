use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::process::run_bounded;
use crate::error::TranscodeError;

const PERFORMANCE_ARGS: &[&str] = &["-hide_banner", "-nostats", "-loglevel", "error", "-threads", "1"];

/// Outcome of one external transcoding run.
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub error: Option<TranscodeError>,
    /// Diagnostic output of the process, kept on success too.
    pub output: String,
}

/// Executes a single transcoding job. Workers call this once per task.
#[async_trait]
pub trait TranscodeRunner: Send + Sync + 'static {
    async fn run(&self, source: &Path, target: &Path, preset: &str) -> RunOutcome;
}

/// Runs `ffmpeg -i <source> <preset> <target>` with a hard timeout.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    ffmpeg_path: String,
    job_timeout: Duration,
}

impl FfmpegRunner {
    pub fn new(ffmpeg_path: impl Into<String>, job_timeout: Duration) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            job_timeout,
        }
    }

    pub fn command(&self, source: &Path, target: &Path, preset: &str) -> Command {
        let mut cmd = Command::new(&self.ffmpeg_path);
        cmd.args(PERFORMANCE_ARGS)
            .arg("-i")
            .arg(source)
            .args(preset.split_whitespace())
            .arg(target);
        cmd
    }
}

#[async_trait]
impl TranscodeRunner for FfmpegRunner {
    async fn run(&self, source: &Path, target: &Path, preset: &str) -> RunOutcome {
        let cmd = self.command(source, target, preset);
        let finished = run_bounded(cmd, &self.ffmpeg_path, self.job_timeout).await;
        RunOutcome {
            error: finished.error,
            output: finished.stderr,
        }
    }
}

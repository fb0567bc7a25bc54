use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, anyhow};
use filer_core::fsutil;
use filer_core::transcode::{TranscodePipeline, TranscodeResult, TranscodeTask};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::infra::notify::{Notifier, TranscodeCompleted, TranscodeFailed};

/// Body of `POST /api/v1/transcode`, carried through the pipeline as the
/// task context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodeRequest {
    #[serde(default)]
    pub sha1: String,
    #[serde(default)]
    pub format: String,
}

pub type TranscodeJobs = TranscodePipeline<TranscodeRequest>;

/// Where finished files go and who hears about them.
#[derive(Debug, Clone)]
pub struct ResultSink {
    pub dest_dir: PathBuf,
    pub updates: mpsc::Sender<String>,
    pub notifier: Arc<dyn Notifier>,
}

/// A finished output after it has been renamed and linked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub work_path: PathBuf,
    pub dest_path: PathBuf,
    pub sha1: String,
    pub size: i64,
    pub mtime: i64,
}

/// Drains the pipeline until it is closed.
pub async fn run_result_loop(jobs: Arc<TranscodeJobs>, sink: ResultSink) {
    while let Some(result) = jobs.next_result().await {
        handle_result(&sink, result).await;
    }
    info!("transcoding result loop stopped");
}

pub async fn handle_result(sink: &ResultSink, result: TranscodeResult<TranscodeRequest>) {
    let TranscodeResult {
        task,
        error,
        output,
    } = result;
    let original_sha1 = task.context.sha1.clone();

    match error {
        None => match publish(sink, &task).await {
            Ok(published) => {
                let file_name = file_name(&published.dest_path);
                if sink
                    .updates
                    .send(published.dest_path.to_string_lossy().into_owned())
                    .await
                    .is_err()
                {
                    warn!(path = %published.dest_path.display(), "update loop is gone");
                }
                sink.notifier
                    .completed(TranscodeCompleted {
                        original_sha1,
                        sha1: published.sha1,
                        file_name,
                        size: published.size,
                        created_at: published.mtime,
                    })
                    .await;
            }
            Err(err) => {
                warn!(source = %task.source.display(), error = %format!("{err:#}"), "transcoded file not published");
                sink.notifier
                    .failed(TranscodeFailed {
                        original_sha1,
                        message: format!("{err:#}"),
                    })
                    .await;
            }
        },
        Some(err) => {
            warn!(
                source = %task.source.display(),
                target = %task.target.display(),
                preset = %task.preset,
                error = %err,
                output = %output,
                "transcoding failed"
            );
            let message = if output.trim().is_empty() {
                err.to_string()
            } else {
                output
            };
            sink.notifier
                .failed(TranscodeFailed {
                    original_sha1,
                    message,
                })
                .await;
        }
    }

    remove_quietly(&task.target);
}

async fn publish(
    sink: &ResultSink,
    task: &TranscodeTask<TranscodeRequest>,
) -> anyhow::Result<Published> {
    let dest_dir = sink.dest_dir.clone();
    let task = task.clone();
    tokio::task::spawn_blocking(move || publish_blocking(&dest_dir, &task))
        .await
        .map_err(|err| anyhow!("publish task panicked: {err}"))?
}

/// Renames the output to `<original>_<sha1>.mp4` inside the work directory
/// and hard-links it into `dest_dir` under the source's stem.
pub fn publish_blocking(
    dest_dir: &Path,
    task: &TranscodeTask<TranscodeRequest>,
) -> anyhow::Result<Published> {
    let hashed = fsutil::hash_file(&task.target)
        .with_context(|| format!("failed to hash {}", task.target.display()))?;

    let work_dir = task.target.parent().unwrap_or_else(|| Path::new("."));
    let work_path = work_dir.join(format!("{}_{}.mp4", task.context.sha1, hashed.sha1));
    fs::rename(&task.target, &work_path).with_context(|| {
        format!(
            "failed to rename {} to {}",
            task.target.display(),
            work_path.display()
        )
    })?;

    let stem = task
        .source
        .file_stem()
        .ok_or_else(|| anyhow!("source {} has no file name", task.source.display()))?;
    let mut dest_name = stem.to_os_string();
    dest_name.push(".mp4");
    let dest_path = dest_dir.join(dest_name);

    remove_quietly(&dest_path);
    fs::hard_link(&work_path, &dest_path).with_context(|| {
        format!(
            "failed to link {} to {}",
            work_path.display(),
            dest_path.display()
        )
    })?;

    info!(
        source = %task.source.display(),
        dest = %dest_path.display(),
        sha1 = %hashed.sha1,
        size = hashed.bytes_read,
        "transcoded file published"
    );

    Ok(Published {
        work_path,
        dest_path,
        sha1: hashed.sha1,
        size: hashed.stat.size,
        mtime: hashed.stat.mtime,
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn remove_quietly(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!(path = %path.display(), error = %err, "failed to remove file"),
    }
}

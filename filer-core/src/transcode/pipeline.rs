use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_channel::{Receiver, Sender, TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::runner::TranscodeRunner;
use crate::error::{SubmitError, TranscodeError};

/// Default bound of the work queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// One unit of work. `context` is carried through to the result untouched.
#[derive(Debug, Clone)]
pub struct TranscodeTask<C> {
    pub source: PathBuf,
    /// Temporary output inside the work directory.
    pub target: PathBuf,
    pub preset: String,
    pub context: C,
}

#[derive(Debug)]
pub struct TranscodeResult<C> {
    pub task: TranscodeTask<C>,
    pub error: Option<TranscodeError>,
    pub output: String,
}

impl<C> TranscodeResult<C> {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub concurrency: usize,
    pub queue_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 0,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Fixed pool of workers fed from a bounded queue.
///
/// `submit` never waits: a full queue is reported to the caller straight
/// away. Results come back in completion order through `next_result`.
#[derive(Debug)]
pub struct TranscodePipeline<C> {
    tasks: Sender<TranscodeTask<C>>,
    results: Receiver<TranscodeResult<C>>,
    workers: Vec<JoinHandle<()>>,
}

impl<C: Send + 'static> TranscodePipeline<C> {
    /// Spawns `config.concurrency` workers on the current runtime.
    pub fn start(config: PipelineConfig, runner: Arc<dyn TranscodeRunner>) -> Self {
        let capacity = config.queue_capacity.max(1);
        let (tasks, task_rx) = async_channel::bounded(capacity);
        let (result_tx, results) = async_channel::bounded(capacity);

        let workers = (0..config.concurrency)
            .map(|id| {
                tokio::spawn(worker_loop(
                    id,
                    task_rx.clone(),
                    result_tx.clone(),
                    Arc::clone(&runner),
                ))
            })
            .collect();

        if config.concurrency > 0 {
            info!(workers = config.concurrency, capacity, "started transcoding workers");
        } else {
            info!("transcoding disabled");
        }

        Self {
            tasks,
            results,
            workers,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.workers.is_empty()
    }

    pub fn submit(&self, task: TranscodeTask<C>) -> Result<(), SubmitError> {
        if !self.is_enabled() {
            return Err(SubmitError::Disabled);
        }
        self.tasks.try_send(task).map_err(|err| match err {
            TrySendError::Full(_) => SubmitError::QueueFull,
            TrySendError::Closed(_) => SubmitError::Closed,
        })
    }

    /// Waits for the next finished task. `None` once the pipeline is closed
    /// and every worker has exited.
    pub async fn next_result(&self) -> Option<TranscodeResult<C>> {
        self.results.recv().await.ok()
    }

    /// Tasks waiting for a worker.
    pub fn queue_depth(&self) -> usize {
        self.tasks.len()
    }

    pub fn capacity(&self) -> usize {
        self.tasks.capacity().unwrap_or(0)
    }

    /// Stops accepting work; queued tasks still run.
    pub fn close(&self) {
        self.tasks.close();
    }
}

async fn worker_loop<C>(
    id: usize,
    tasks: Receiver<TranscodeTask<C>>,
    results: Sender<TranscodeResult<C>>,
    runner: Arc<dyn TranscodeRunner>,
) {
    debug!(worker = id, "transcoding worker started");

    while let Ok(task) = tasks.recv().await {
        let started = Instant::now();
        let outcome = runner.run(&task.source, &task.target, &task.preset).await;

        match &outcome.error {
            None => {
                let size = tokio::fs::metadata(&task.source)
                    .await
                    .map(|meta| meta.len())
                    .unwrap_or(0);
                info!(
                    worker = id,
                    source = %task.source.display(),
                    size,
                    elapsed = ?started.elapsed(),
                    "transcode finished"
                );
            }
            Some(err) => {
                error!(worker = id, source = %task.source.display(), error = %err, "transcode failed");
            }
        }

        let result = TranscodeResult {
            task,
            error: outcome.error,
            output: outcome.output,
        };
        if results.send(result).await.is_err() {
            break;
        }
    }

    debug!(worker = id, "transcoding worker stopped");
}

use std::{fmt, sync::Arc};

use filer_config::Config;
use filer_core::transcode::{FfProbe, FfmpegRunner, TranscodePipeline, TranscodeRunner};
use filer_core::{Catalog, DeliveryGate, PathTranslator};
use tokio::sync::mpsc;

use crate::infra::reconcile::UPDATE_QUEUE_CAPACITY;
use crate::infra::transcoding::TranscodeJobs;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<Catalog>,
    pub gate: Arc<DeliveryGate>,
    pub transcoder: Arc<TranscodeJobs>,
    pub probe: Arc<FfProbe>,
    /// Feeds the reconcile loop, which owns all catalog writes.
    pub updates: mpsc::Sender<String>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

/// State plus the receiving end of the update queue.
#[derive(Debug)]
pub struct AppParts {
    pub state: AppState,
    pub updates: mpsc::Receiver<String>,
}

impl AppState {
    /// Builds the state with the ffmpeg runner from `config`.
    pub fn build(config: Arc<Config>) -> AppParts {
        let runner = Arc::new(FfmpegRunner::new(
            config.transcoder.ffmpeg_path.clone(),
            config.transcoder.job_timeout,
        ));
        Self::with_runner(config, runner)
    }

    /// Must be called inside a tokio runtime: transcoding workers are spawned
    /// here.
    pub fn with_runner(config: Arc<Config>, runner: Arc<dyn TranscodeRunner>) -> AppParts {
        let catalog = Arc::new(Catalog::new(config.catalog_options()));
        let gate = Arc::new(DeliveryGate::new(config.server.get_file_expire));
        let transcoder = Arc::new(TranscodePipeline::start(
            config.transcoder.pipeline(),
            runner,
        ));
        let probe = Arc::new(FfProbe::new(
            config.transcoder.ffprobe_path.clone(),
            config.transcoder.job_timeout,
        ));
        let (updates, updates_rx) = mpsc::channel(UPDATE_QUEUE_CAPACITY);

        AppParts {
            state: Self {
                config,
                catalog,
                gate,
                transcoder,
                probe,
                updates,
            },
            updates: updates_rx,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn path_translator(&self) -> PathTranslator {
        self.config.path_translator()
    }
}

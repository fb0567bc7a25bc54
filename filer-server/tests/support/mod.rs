#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use axum_test::TestServer;
use filer_config::{
    Config, ConfigMetadata, IndexConfig, LocationConfig, NotifyConfig, ServerConfig,
    TranscoderConfig, UpdateConfig,
};
use filer_core::index::RemoteSource;
use filer_core::storage::{AccessClass, DeviceStatus, StorageDevice};
use filer_core::transcode::{PresetMode, RunOutcome, TranscodeRunner};
use filer_server::infra::notify::{Notifier, TranscodeCompleted, TranscodeFailed};
use filer_server::infra::reconcile::run_reconcile_loop;
use filer_server::infra::transcoding::{ResultSink, run_result_loop};
use filer_server::{AppParts, AppState, create_app};
use tempfile::TempDir;

pub const BASE_URL: &str = "http://files.example.org/get/";
pub const REMOTE_DIR: &str = "ca-ovh";
pub const REMOTE_ID: &str = "ovh-1";

/// Copies the source to the target instead of running ffmpeg.
#[derive(Debug, Default)]
pub struct CopyRunner;

#[async_trait]
impl TranscodeRunner for CopyRunner {
    async fn run(&self, source: &Path, target: &Path, preset: &str) -> RunOutcome {
        match tokio::fs::copy(source, target).await {
            Ok(_) => RunOutcome {
                error: None,
                output: format!("copied with {preset}"),
            },
            Err(err) => RunOutcome {
                error: Some(filer_core::TranscodeError::Spawn {
                    program: "copy".into(),
                    source: err,
                }),
                output: String::new(),
            },
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub completed: Mutex<Vec<TranscodeCompleted>>,
    pub failed: Mutex<Vec<TranscodeFailed>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn completed(&self, event: TranscodeCompleted) {
        self.completed.lock().unwrap().push(event);
    }

    async fn failed(&self, event: TranscodeFailed) {
        self.failed.lock().unwrap().push(event);
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub notifier: Arc<RecordingNotifier>,
    pub tempdir: TempDir,
}

impl TestApp {
    pub fn root(&self) -> &Path {
        self.tempdir.path()
    }

    pub fn media_dir(&self) -> PathBuf {
        self.root().join("media/library")
    }

    pub fn dest_dir(&self) -> PathBuf {
        self.root().join("dest")
    }

    /// Polls until `check` holds or two seconds pass.
    pub async fn eventually<F: Fn(&AppState) -> bool>(&self, check: F) -> bool {
        for _ in 0..200 {
            if check(&self.state) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TestOptions {
    pub transcoding: bool,
}

pub fn test_config(root: &Path, options: TestOptions) -> Config {
    Config {
        server: ServerConfig {
            listen: SocketAddr::from(([127, 0, 0, 1], 0)),
            base_url: BASE_URL.into(),
            get_file_expire: Duration::from_secs(60),
            stop_on_update: false,
        },
        index: IndexConfig {
            dir: root.join("index"),
            reload: Duration::from_secs(3600),
        },
        update: UpdateConfig {
            base_dir: PathBuf::from("/"),
            archive_base: String::new(),
            original_base: String::new(),
        },
        location: LocationConfig {
            access: AccessClass::Local,
            country: "il".into(),
            name: "merkaz".into(),
        },
        remote: vec![RemoteSource {
            dir: REMOTE_DIR.into(),
            device: StorageDevice {
                id: REMOTE_ID.into(),
                status: DeviceStatus::Online,
                access: AccessClass::Internet,
                country: "ca".into(),
                location: "ovh".into(),
            },
        }],
        transcoder: TranscoderConfig {
            concurrency: usize::from(options.transcoding),
            queue_capacity: 4,
            work_dir: Some(root.join("work")),
            dest_dir: Some(root.join("dest")),
            ffmpeg_path: "ffmpeg".into(),
            ffprobe_path: "ffprobe".into(),
            preset_mode: PresetMode::Extension,
            job_timeout: Duration::from_secs(30),
        },
        notify: NotifyConfig {
            url: String::new(),
            station: "st-1".into(),
            user: "ops".into(),
        },
        metadata: ConfigMetadata::default(),
    }
}

/// Writes `files` (name, contents) into the media directory and indexes
/// them through a remote-attributed index file.
pub fn seed_media(root: &Path, files: &[(&str, &[u8], &str)]) -> Result<Vec<PathBuf>> {
    let media = root.join("media/library");
    let index = root.join("index").join(REMOTE_DIR);
    for dir in [&media, &index, &root.join("work"), &root.join("dest")] {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let mut lines = String::new();
    let mut paths = Vec::with_capacity(files.len());
    for (name, contents, hash) in files {
        let path = media.join(name);
        fs::write(&path, contents)?;
        let line = serde_json::to_string(&(
            path.to_string_lossy(),
            hash,
            contents.len() as i64,
            1_600_000_000i64,
        ))?;
        lines.push_str(&line);
        lines.push('\n');
        paths.push(path);
    }
    fs::write(index.join("media.idx"), lines)?;
    Ok(paths)
}

/// Builds state, loads the catalog and starts the background loops.
pub async fn build_test_app(
    files: &[(&str, &[u8], &str)],
    options: TestOptions,
) -> Result<TestApp> {
    let tempdir = tempfile::tempdir().context("failed to create temporary directory")?;
    seed_media(tempdir.path(), files)?;

    let config = Arc::new(test_config(tempdir.path(), options));
    let AppParts { state, updates } = AppState::with_runner(Arc::clone(&config), Arc::new(CopyRunner));
    state.catalog.reload();

    tokio::spawn(run_reconcile_loop(
        Arc::clone(&state.catalog),
        state.path_translator(),
        config.index.reload,
        updates,
    ));

    let notifier = Arc::new(RecordingNotifier::default());
    if options.transcoding {
        tokio::spawn(run_result_loop(
            Arc::clone(&state.transcoder),
            ResultSink {
                dest_dir: tempdir.path().join("dest"),
                updates: state.updates.clone(),
                notifier: Arc::clone(&notifier) as Arc<dyn Notifier>,
            },
        ));
    }

    let server =
        TestServer::new(create_app(state.clone())).map_err(|err| anyhow!(err.to_string()))?;

    Ok(TestApp {
        server,
        state,
        notifier,
        tempdir,
    })
}

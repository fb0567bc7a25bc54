pub mod sources;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use filer_core::index::RemoteSource;
use filer_core::storage::{AccessClass, SiteInfo};
use filer_core::transcode::{PipelineConfig, PresetMode};
use filer_core::{CatalogOptions, PathTranslator};

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub index: IndexConfig,
    pub update: UpdateConfig,
    pub location: LocationConfig,
    pub remote: Vec<RemoteSource>,
    pub transcoder: TranscoderConfig,
    pub notify: NotifyConfig,
    pub metadata: ConfigMetadata,
}

impl Config {
    pub fn catalog_options(&self) -> CatalogOptions {
        CatalogOptions {
            index_dir: self.index.dir.clone(),
            site: self.location.site(),
            remote_sources: self.remote.clone(),
        }
    }

    pub fn path_translator(&self) -> PathTranslator {
        PathTranslator::new(
            self.update.base_dir.clone(),
            self.update.archive_base.clone(),
            self.update.original_base.clone(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    /// Prefix of the download links handed out by `POST /api/v1/get`.
    pub base_url: String,
    /// Lifetime of a download authorization.
    pub get_file_expire: Duration,
    pub stop_on_update: bool,
}

#[derive(Debug, Clone)]
pub struct IndexConfig {
    pub dir: PathBuf,
    pub reload: Duration,
}

#[derive(Debug, Clone)]
pub struct UpdateConfig {
    pub base_dir: PathBuf,
    pub archive_base: String,
    pub original_base: String,
}

#[derive(Debug, Clone)]
pub struct LocationConfig {
    pub access: AccessClass,
    pub country: String,
    pub name: String,
}

impl LocationConfig {
    pub fn site(&self) -> SiteInfo {
        SiteInfo {
            access: self.access,
            country: self.country.clone(),
            location: self.name.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TranscoderConfig {
    pub concurrency: usize,
    pub queue_capacity: usize,
    pub work_dir: Option<PathBuf>,
    pub dest_dir: Option<PathBuf>,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub preset_mode: PresetMode,
    pub job_timeout: Duration,
}

impl TranscoderConfig {
    pub fn is_enabled(&self) -> bool {
        self.concurrency > 0
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            concurrency: self.concurrency,
            queue_capacity: self.queue_capacity,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotifyConfig {
    /// Empty disables notifications.
    pub url: String,
    pub station: String,
    pub user: String,
}

impl NotifyConfig {
    pub fn is_enabled(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}

pub mod error;

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use filer_core::index::RemoteSource;
use filer_core::transcode::DEFAULT_QUEUE_CAPACITY;
use once_cell::sync::Lazy;
use serde::de::{DeserializeOwned, IntoDeserializer};
use tracing::debug;

use self::error::ConfigLoadError;
use crate::models::sources::{EnvConfig, FileConfig};
use crate::models::{
    Config, ConfigMetadata, IndexConfig, LocationConfig, NotifyConfig, ServerConfig,
    TranscoderConfig, UpdateConfig,
};
use crate::validation::{self, ConfigWarnings};

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    let mut locations = vec![
        PathBuf::from("filer.toml"),
        PathBuf::from("config/filer.toml"),
    ];
    if let Some(home) = std::env::var_os("HOME") {
        locations.push(PathBuf::from(home).join(".config/filer_storage.conf"));
    }
    locations.push(PathBuf::from("/etc/filer_storage.conf"));
    locations
});

const DEFAULT_LISTEN: &str = "0.0.0.0:8080";
const DEFAULT_GET_FILE_EXPIRE: Duration = Duration::from_secs(2 * 60 * 60);
const DEFAULT_RELOAD: Duration = Duration::from_secs(10);
const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    /// Loads `.env`, then the config file, then applies process environment
    /// overrides.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(|err| match err {
                dotenvy::Error::Io(_) => Ok(false),
                _ => Err(err),
            })?,
            None => dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                dotenvy::Error::Io(_) => Ok(false),
                _ => Err(err),
            })?,
        };

        let mut load = self.load_with_env(EnvConfig::gather())?;
        load.config.metadata.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    /// Same as [`Self::load`] with explicit environment values and no `.env`
    /// handling.
    pub fn load_with_env(&self, env: EnvConfig) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;
        self.compose_config(file_config, env, config_path)
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let (path, explicit) = match (&self.options.config_path, &env.config_path) {
            (Some(path), _) | (None, Some(path)) => (path.clone(), true),
            (None, None) => match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .find(|candidate| candidate.exists())
            {
                Some(path) => (path.clone(), false),
                None => return Ok((None, None)),
            },
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        debug!(path = %path.display(), explicit, "reading configuration file");
        let contents = fs::read_to_string(&path).map_err(|source| ConfigLoadError::Io {
            path: path.clone(),
            source,
        })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
                path: path.clone(),
                source,
            })?;

        Ok((Some(file_config), Some(path)))
    }

    fn compose_config(
        &self,
        file_config: Option<FileConfig>,
        env: EnvConfig,
        config_path: Option<PathBuf>,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let mut warnings = ConfigWarnings::default();
        if file_config.is_none() {
            warnings.push_with_hint(
                "No filer.toml detected; falling back to environment variables",
                "Create filer.toml or point FILER_CONFIG at a configuration file",
            );
        }

        let FileConfig {
            server: file_server,
            index: file_index,
            update: file_update,
            location: file_location,
            remote: file_remote,
            transcoder: file_transcoder,
            notify: file_notify,
        } = file_config.unwrap_or_default();

        let listen_raw = env
            .listen
            .or(file_server.listen)
            .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let listen = listen_raw
            .parse()
            .map_err(|source| ConfigLoadError::InvalidListen {
                value: listen_raw.clone(),
                source,
            })?;

        let server = ServerConfig {
            listen,
            base_url: env.base_url.or(file_server.base_url).unwrap_or_default(),
            get_file_expire: duration(
                "server.get_file_expire",
                env.get_file_expire.or(file_server.get_file_expire),
                DEFAULT_GET_FILE_EXPIRE,
            )?,
            stop_on_update: env
                .stop_on_update
                .or(file_server.stop_on_update)
                .unwrap_or(false),
        };

        let index = IndexConfig {
            dir: env.index_dir.or(file_index.dir).unwrap_or_default(),
            reload: duration(
                "index.reload",
                env.reload_interval.or(file_index.reload),
                DEFAULT_RELOAD,
            )?,
        };

        let update = UpdateConfig {
            base_dir: env
                .update_base_dir
                .or(file_update.base_dir)
                .unwrap_or_else(|| PathBuf::from("/")),
            archive_base: env.archive_base.or(file_update.archive_base).unwrap_or_default(),
            original_base: env
                .original_base
                .or(file_update.original_base)
                .unwrap_or_default(),
        };

        let location = LocationConfig {
            access: match env.location_access.or(file_location.access) {
                Some(raw) => enum_value("location.access", &raw)?,
                None => filer_core::storage::AccessClass::Local,
            },
            country: env
                .location_country
                .or(file_location.country)
                .unwrap_or_else(|| "unknown".to_string()),
            name: env
                .location_name
                .or(file_location.name)
                .unwrap_or_else(|| "unknown".to_string()),
        };

        let transcoder = TranscoderConfig {
            concurrency: env
                .transcoder_concurrency
                .or(file_transcoder.concurrency)
                .unwrap_or(0),
            queue_capacity: env
                .transcoder_queue_capacity
                .or(file_transcoder.queue_capacity)
                .unwrap_or(DEFAULT_QUEUE_CAPACITY),
            work_dir: env.trans_work.or(file_transcoder.work_dir),
            dest_dir: env.trans_dest.or(file_transcoder.dest_dir),
            ffmpeg_path: env
                .ffmpeg_path
                .or(file_transcoder.ffmpeg_path)
                .unwrap_or_else(|| "ffmpeg".into()),
            ffprobe_path: env
                .ffprobe_path
                .or(file_transcoder.ffprobe_path)
                .unwrap_or_else(|| "ffprobe".into()),
            preset_mode: match env.preset_mode.or(file_transcoder.preset_mode) {
                Some(raw) => enum_value("transcoder.preset_mode", &raw)?,
                None => Default::default(),
            },
            job_timeout: duration(
                "transcoder.job_timeout",
                env.job_timeout.or(file_transcoder.job_timeout),
                DEFAULT_JOB_TIMEOUT,
            )?,
        };

        let notify = NotifyConfig {
            url: env.notify_url.or(file_notify.url).unwrap_or_default(),
            station: env.notify_station.or(file_notify.station).unwrap_or_default(),
            user: env.notify_user.or(file_notify.user).unwrap_or_default(),
        };

        let config = Config {
            server,
            index,
            update,
            location,
            remote: file_remote.unwrap_or_else(RemoteSource::defaults),
            transcoder,
            notify,
            metadata: ConfigMetadata {
                config_path,
                env_file_loaded: false,
            },
        };

        warnings.extend(validation::apply_guard_rails(&config)?);

        Ok(ConfigLoad { config, warnings })
    }
}

fn duration(
    key: &'static str,
    raw: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigLoadError> {
    match raw {
        Some(value) => humantime::parse_duration(value.trim()).map_err(|source| {
            ConfigLoadError::InvalidDuration { key, value, source }
        }),
        None => Ok(default),
    }
}

fn enum_value<T: DeserializeOwned>(key: &'static str, raw: &str) -> Result<T, ConfigLoadError> {
    let normalized = raw.trim().to_ascii_lowercase();
    T::deserialize(normalized.as_str().into_deserializer()).map_err(
        |_: serde::de::value::Error| ConfigLoadError::InvalidValue {
            key,
            value: raw.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use filer_core::storage::AccessClass;
    use filer_core::transcode::PresetMode;

    #[test]
    fn enum_values_are_case_insensitive() {
        let access: AccessClass = enum_value("location.access", " Internet ").unwrap();
        assert_eq!(access, AccessClass::Internet);
        let mode: PresetMode = enum_value("transcoder.preset_mode", "extension").unwrap();
        assert_eq!(mode, PresetMode::Extension);
        assert!(matches!(
            enum_value::<PresetMode>("transcoder.preset_mode", "magic"),
            Err(ConfigLoadError::InvalidValue { .. })
        ));
    }

    #[test]
    fn durations_use_humantime() {
        assert_eq!(
            duration("index.reload", Some("1m 30s".into()), DEFAULT_RELOAD).unwrap(),
            Duration::from_secs(90)
        );
        assert_eq!(
            duration("index.reload", None, DEFAULT_RELOAD).unwrap(),
            DEFAULT_RELOAD
        );
        assert!(duration("index.reload", Some("soon".into()), DEFAULT_RELOAD).is_err());
    }
}

use std::collections::HashMap;
use std::path::PathBuf;

use filer_core::index::RemoteSource;
use serde::{Deserialize, Serialize};

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub index: FileIndexConfig,
    #[serde(default)]
    pub update: FileUpdateConfig,
    #[serde(default)]
    pub location: FileLocationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<Vec<RemoteSource>>,
    #[serde(default)]
    pub transcoder: FileTranscoderConfig,
    #[serde(default)]
    pub notify: FileNotifyConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listen: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get_file_expire: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_on_update: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileIndexConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reload: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileUpdateConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_base: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_base: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileLocationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileTranscoderConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_capacity: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ffmpeg_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ffprobe_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_timeout: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileNotifyConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub listen: Option<String>,
    pub base_url: Option<String>,
    pub get_file_expire: Option<String>,
    pub stop_on_update: Option<bool>,
    pub index_dir: Option<PathBuf>,
    pub reload_interval: Option<String>,
    pub update_base_dir: Option<PathBuf>,
    pub archive_base: Option<String>,
    pub original_base: Option<String>,
    pub location_access: Option<String>,
    pub location_country: Option<String>,
    pub location_name: Option<String>,
    pub transcoder_concurrency: Option<usize>,
    pub transcoder_queue_capacity: Option<usize>,
    pub trans_work: Option<PathBuf>,
    pub trans_dest: Option<PathBuf>,
    pub ffmpeg_path: Option<String>,
    pub ffprobe_path: Option<String>,
    pub preset_mode: Option<String>,
    pub job_timeout: Option<String>,
    pub notify_url: Option<String>,
    pub notify_station: Option<String>,
    pub notify_user: Option<String>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the overrides from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse_bool = |name: &str| lookup(name).and_then(|raw| parse_bool(&raw));
        let parse_usize = |name: &str| lookup(name).and_then(|raw| raw.trim().parse().ok());
        let path = |name: &str| lookup(name).map(PathBuf::from);

        Self {
            config_path: path("FILER_CONFIG"),
            listen: lookup("FILER_LISTEN"),
            base_url: lookup("FILER_BASE_URL"),
            get_file_expire: lookup("FILER_GET_FILE_EXPIRE"),
            stop_on_update: parse_bool("FILER_STOP_ON_UPDATE"),
            index_dir: path("FILER_INDEX_DIR"),
            reload_interval: lookup("FILER_RELOAD_INTERVAL"),
            update_base_dir: path("FILER_UPDATE_BASE_DIR"),
            archive_base: lookup("FILER_ARCHIVE_BASE"),
            original_base: lookup("FILER_ORIGINAL_BASE"),
            location_access: lookup("FILER_LOCATION_ACCESS"),
            location_country: lookup("FILER_LOCATION_COUNTRY"),
            location_name: lookup("FILER_LOCATION_NAME"),
            transcoder_concurrency: parse_usize("FILER_TRANSCODER_CONCURRENCY"),
            transcoder_queue_capacity: parse_usize("FILER_TRANSCODER_QUEUE_CAPACITY"),
            trans_work: path("FILER_TRANS_WORK"),
            trans_dest: path("FILER_TRANS_DEST"),
            ffmpeg_path: lookup("FFMPEG_PATH"),
            ffprobe_path: lookup("FFPROBE_PATH"),
            preset_mode: lookup("FILER_PRESET_MODE"),
            job_timeout: lookup("FILER_TRANSCODE_TIMEOUT"),
            notify_url: lookup("FILER_NOTIFY_URL"),
            notify_station: lookup("FILER_NOTIFY_STATION"),
            notify_user: lookup("FILER_NOTIFY_USER"),
        }
    }

    pub fn from_map(vars: &HashMap<String, String>) -> Self {
        Self::from_lookup(|name| vars.get(name).cloned())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_values_are_parsed() {
        let vars: HashMap<String, String> = [
            ("FILER_LISTEN", "127.0.0.1:9000"),
            ("FILER_STOP_ON_UPDATE", "yes"),
            ("FILER_TRANSCODER_CONCURRENCY", " 4 "),
            ("FILER_TRANS_WORK", "/tmp/work"),
            ("FFMPEG_PATH", "/opt/ffmpeg"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let env = EnvConfig::from_map(&vars);
        assert_eq!(env.listen.as_deref(), Some("127.0.0.1:9000"));
        assert_eq!(env.stop_on_update, Some(true));
        assert_eq!(env.transcoder_concurrency, Some(4));
        assert_eq!(env.trans_work, Some(PathBuf::from("/tmp/work")));
        assert_eq!(env.ffmpeg_path.as_deref(), Some("/opt/ffmpeg"));
        assert!(env.index_dir.is_none());
    }

    #[test]
    fn unparsable_values_are_ignored() {
        let vars: HashMap<String, String> = [
            ("FILER_STOP_ON_UPDATE", "maybe"),
            ("FILER_TRANSCODER_CONCURRENCY", "many"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let env = EnvConfig::from_map(&vars);
        assert_eq!(env.stop_on_update, None);
        assert_eq!(env.transcoder_concurrency, None);
    }

    #[test]
    fn remote_sections_deserialize() {
        let file: FileConfig = toml::from_str(
            r#"
            [[remote]]
            dir = "ca-ovh"
            id = "aa886ee5-5d9b-413a-baae-63079c89575d"
            status = "online"
            access = "internet"
            country = "ca"
            location = "ovh"
            "#,
        )
        .unwrap();
        let remotes = file.remote.unwrap();
        assert_eq!(remotes.len(), 1);
        assert_eq!(remotes[0].dir, "ca-ovh");
        assert_eq!(remotes[0].device.location, "ovh");
    }
}

use std::fmt;

use thiserror::Error;

use crate::models::Config;

/// Settings that are accepted but probably wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.hint {
            Some(hint) => write!(f, "{} ({hint})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push(&mut self, message: impl Into<String>) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint(&mut self, message: impl Into<String>, hint: impl Into<String>) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.items.iter()
    }
}

/// Configurations the server refuses to start with.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigGuardRailError {
    #[error("index.dir is not set")]
    MissingIndexDir,
    #[error("index.reload must be greater than zero")]
    ZeroReloadInterval,
    #[error("transcoder.concurrency is {concurrency} but transcoder.{missing} is not set")]
    TranscoderDirMissing {
        concurrency: usize,
        missing: &'static str,
    },
    #[error("transcoder.queue_capacity must be greater than zero")]
    ZeroQueueCapacity,
}

pub fn apply_guard_rails(config: &Config) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();

    if config.index.dir.as_os_str().is_empty() {
        return Err(ConfigGuardRailError::MissingIndexDir);
    }
    if config.index.reload.is_zero() {
        return Err(ConfigGuardRailError::ZeroReloadInterval);
    }

    let transcoder = &config.transcoder;
    if transcoder.is_enabled() {
        if transcoder.queue_capacity == 0 {
            return Err(ConfigGuardRailError::ZeroQueueCapacity);
        }
        for (missing, dir) in [
            ("work_dir", &transcoder.work_dir),
            ("dest_dir", &transcoder.dest_dir),
        ] {
            if dir.is_none() {
                return Err(ConfigGuardRailError::TranscoderDirMissing {
                    concurrency: transcoder.concurrency,
                    missing,
                });
            }
        }
    }

    if config.server.base_url.trim().is_empty() {
        warnings.push_with_hint(
            "server.base_url is empty; download links will be relative",
            "Set server.base_url or FILER_BASE_URL to the public download prefix",
        );
    }
    if !config.index.dir.exists() {
        warnings.push(format!(
            "index directory {} does not exist yet",
            config.index.dir.display()
        ));
    }

    Ok(warnings)
}

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use super::{AccessClass, DeviceRegistry, DeviceStatus, StorageDevice};

static DISK_DIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{3}$").expect("valid disk pattern"));
static TAPE_DIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(ltfs|lto)-[0-9-]*$").expect("valid tape pattern"));
static DRIVE_ROOT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]:$").expect("valid drive pattern"));

/// Attributes stamped on every device the classifier derives from a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteInfo {
    pub access: AccessClass,
    pub country: String,
    pub location: String,
}

impl Default for SiteInfo {
    fn default() -> Self {
        Self {
            access: AccessClass::Local,
            country: "unknown".to_string(),
            location: "unknown".to_string(),
        }
    }
}

/// Maps a file path to the storage device holding it.
///
/// Classification depends only on the path, so the same path always yields
/// the same device id. Devices are deduplicated through the shared
/// [`DeviceRegistry`].
#[derive(Debug, Clone)]
pub struct StorageClassifier {
    registry: Arc<DeviceRegistry>,
    site: SiteInfo,
}

impl StorageClassifier {
    pub fn new(registry: Arc<DeviceRegistry>, site: SiteInfo) -> Self {
        Self { registry, site }
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Classifies `path`, falling back to the offline `unknown` device.
    pub fn classify(&self, path: &str) -> Arc<StorageDevice> {
        let dirs = directory_segments(path);
        let (id, status) = match classify_segments(&dirs) {
            Some(rule) => rule,
            None => {
                warn!(path, "unknown storage");
                (StorageDevice::UNKNOWN_ID.to_string(), DeviceStatus::Offline)
            }
        };

        self.registry.get_or_insert_with(&id, || StorageDevice {
            id: id.clone(),
            status,
            access: self.site.access,
            country: self.site.country.clone(),
            location: self.site.location.clone(),
        })
    }
}

/// Non-empty directory components of `path`, excluding the file name.
pub fn directory_segments(path: &str) -> Vec<&str> {
    let dir = match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    };
    dir.split('/').filter(|segment| !segment.is_empty()).collect()
}

fn classify_segments(dirs: &[&str]) -> Option<(String, DeviceStatus)> {
    let root = *dirs.first()?;
    let second = dirs.get(1).copied();

    match (root, second) {
        ("mnt", Some(name)) if DISK_DIR.is_match(name) => {
            Some((format!("disk-{name}"), DeviceStatus::Nearline))
        }
        ("mnt", Some(name)) => Some((format!("f1-{name}"), DeviceStatus::Online)),
        ("net", Some("nas")) => {
            let share = dirs.get(2)?;
            Some((format!("nas-{share}"), DeviceStatus::Online))
        }
        ("net", Some("server")) => {
            let letter = match *dirs.get(2)? {
                "b" | "original" => "d:",
                "r" => "h:",
                "buffer" | "nas" => "e:",
                _ => return None,
            };
            Some((format!("server-{letter}"), DeviceStatus::Online))
        }
        ("tape", Some(name)) if TAPE_DIR.is_match(name) => {
            Some((name.to_string(), DeviceStatus::Offline))
        }
        (drive, _) if DRIVE_ROOT.is_match(drive) => {
            Some((format!("server-{drive}"), DeviceStatus::Online))
        }
        _ => None,
    }
}

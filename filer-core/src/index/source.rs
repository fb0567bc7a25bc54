use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;
use walkdir::WalkDir;

use crate::fsutil::unix_mtime;
use crate::record::FileRecord;
use crate::storage::{AccessClass, DeviceStatus, StorageDevice};

/// One index file and the records parsed from it at `mtime`.
#[derive(Debug, Clone)]
pub struct IndexSourceFile {
    pub path: PathBuf,
    pub mtime: i64,
    pub records: Arc<[Arc<FileRecord>]>,
}

/// An index file found on disk, not parsed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredSource {
    pub path: PathBuf,
    pub mtime: i64,
}

/// Index files living in a directory named `dir` describe files stored on
/// `device` rather than on this site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSource {
    pub dir: String,
    #[serde(flatten)]
    pub device: StorageDevice,
}

impl RemoteSource {
    fn internet(dir: &str, id: &str, country: &str, location: &str) -> Self {
        Self::new(dir, id, AccessClass::Internet, country, location)
    }

    fn local(dir: &str, id: &str, country: &str, location: &str) -> Self {
        Self::new(dir, id, AccessClass::Local, country, location)
    }

    fn new(dir: &str, id: &str, access: AccessClass, country: &str, location: &str) -> Self {
        Self {
            dir: dir.to_string(),
            device: StorageDevice {
                id: id.to_string(),
                status: DeviceStatus::Online,
                access,
                country: country.to_string(),
                location: location.to_string(),
            },
        }
    }

    /// Remote sites of the production deployment.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::internet(
                "nl-nforce",
                "0618278a-0602-4d7a-bb95-b1f176774490",
                "nl",
                "nforce",
            ),
            Self::internet("ca-ovh", "aa886ee5-5d9b-413a-baae-63079c89575d", "ca", "ovh"),
            Self::local("ca-uri", "fcae6eb0-6e24-436d-b01f-30ec1a0a4817", "ca", "uri"),
            Self::local("ru-piter", "b569d59c-8b7f-41c6-b37a-1ceaeccc3a8a", "ru", "piter"),
        ]
    }
}

/// Name of the directory directly containing `path`.
pub fn parent_dir_name(path: &Path) -> Option<&str> {
    path.parent()?.file_name()?.to_str()
}

/// Recursively lists index files under `root`, skipping dot files. The result
/// is sorted by path.
pub fn discover_sources(root: &Path) -> Vec<DiscoveredSource> {
    let mut found = Vec::new();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(root = %root.display(), error = %err, "skipping unreadable index entry");
                continue;
            }
        };
        if !entry.file_type().is_file() || entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        match entry.metadata() {
            Ok(meta) => found.push(DiscoveredSource {
                path: entry.into_path(),
                mtime: unix_mtime(&meta),
            }),
            Err(err) => {
                warn!(path = %entry.path().display(), error = %err, "cannot stat index file");
            }
        }
    }

    found.sort_by(|a, b| a.path.cmp(&b.path));
    found
}

use std::sync::Arc;

use serde::Serialize;

use crate::storage::StorageDevice;

/// One file known to the catalog.
///
/// Records are immutable once built and shared behind [`Arc`] between
/// snapshots; an update always produces a new record.
#[derive(Debug, Clone, Serialize)]
pub struct FileRecord {
    pub path: String,
    pub content_hash: String,
    pub size: i64,
    /// Modification time in unix seconds.
    pub mtime: i64,
    /// Absent only between parsing and classification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<Arc<StorageDevice>>,
}

impl FileRecord {
    pub fn new(
        path: impl Into<String>,
        content_hash: impl Into<String>,
        size: i64,
        mtime: i64,
    ) -> Self {
        Self {
            path: path.into(),
            content_hash: content_hash.into(),
            size,
            mtime,
            device: None,
        }
    }

    pub fn with_device(self, device: Arc<StorageDevice>) -> Self {
        Self {
            device: Some(device),
            ..self
        }
    }

    pub fn with_hash(self, content_hash: impl Into<String>) -> Self {
        Self {
            content_hash: content_hash.into(),
            ..self
        }
    }

    /// Field-wise equality of the indexed attributes; the device is derived
    /// data and is ignored.
    pub fn same_entry(&self, other: &FileRecord) -> bool {
        self.size == other.size
            && self.mtime == other.mtime
            && self.content_hash == other.content_hash
            && self.path == other.path
    }

    /// File name component of the path.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device.as_deref().map(|device| device.id.as_str())
    }
}

/// Sum of the sizes of `records`.
pub fn total_size<'a>(records: impl IntoIterator<Item = &'a FileRecord>) -> i64 {
    records.into_iter().map(|record| record.size).sum()
}

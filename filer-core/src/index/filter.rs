use std::sync::Arc;

use tracing::warn;

use crate::record::FileRecord;
use crate::storage::{StorageClassifier, StorageDevice, directory_segments};

const JUNK_NAMES: &[&str] = &["Thumbs.db", ".DS_Store"];

/// Files that are never worth cataloguing: empty files, OS artifacts and
/// shortcut links.
pub fn is_junk(record: &FileRecord) -> bool {
    if record.size == 0 {
        return true;
    }
    let name = record.file_name();
    if JUNK_NAMES.contains(&name) {
        return true;
    }
    name.rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("lnk"))
}

/// Junk exclusion plus device attribution, applied to every record entering
/// the catalog.
#[derive(Debug, Clone)]
pub struct IndexFilter {
    classifier: StorageClassifier,
}

impl IndexFilter {
    pub fn new(classifier: StorageClassifier) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &StorageClassifier {
        &self.classifier
    }

    /// Returns the record with its device attached, or `None` when it should
    /// be dropped. `device` overrides path classification.
    pub fn accept(
        &self,
        record: FileRecord,
        device: Option<&Arc<StorageDevice>>,
    ) -> Option<FileRecord> {
        if is_junk(&record) {
            return None;
        }

        let device = match device {
            Some(device) => Arc::clone(device),
            None => {
                if directory_segments(&record.path).is_empty() {
                    warn!(path = %record.path, hash = %record.content_hash, "path has no directory to classify");
                    return None;
                }
                self.classifier.classify(&record.path)
            }
        };

        Some(record.with_device(device))
    }
}

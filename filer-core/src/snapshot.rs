use std::collections::HashMap;
use std::sync::Arc;

use crate::record::FileRecord;

/// Immutable lookup tables over one generation of the catalog.
///
/// `by_hash` groups records sharing content; `by_path` holds exactly one
/// record per path. Both are always built and replaced together. Mutation
/// happens only on a [`duplicate`](Self::duplicate) that is not yet shared.
#[derive(Debug, Clone, Default)]
pub struct IndexSnapshot {
    by_hash: HashMap<String, Vec<Arc<FileRecord>>>,
    by_path: HashMap<String, Arc<FileRecord>>,
}

impl IndexSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build<I>(records: I) -> Self
    where
        I: IntoIterator<Item = Arc<FileRecord>>,
    {
        let records = records.into_iter();
        let mut snapshot = Self {
            by_hash: HashMap::with_capacity(records.size_hint().0),
            by_path: HashMap::with_capacity(records.size_hint().0),
        };
        for record in records {
            snapshot.insert(record);
        }
        snapshot
    }

    // A path seen twice keeps the last record in both tables.
    fn insert(&mut self, record: Arc<FileRecord>) {
        if self.by_path.contains_key(&record.path) {
            self.remove_path(&record.path);
        }
        self.by_hash
            .entry(record.content_hash.clone())
            .or_default()
            .push(Arc::clone(&record));
        self.by_path.insert(record.path.clone(), record);
    }

    pub fn search(&self, hash: &str) -> Option<&[Arc<FileRecord>]> {
        self.by_hash.get(hash).map(Vec::as_slice)
    }

    pub fn search_path(&self, path: &str) -> Option<&Arc<FileRecord>> {
        self.by_path.get(path)
    }

    /// Every hash group, in no particular order.
    pub fn grouped_by_hash(&self) -> impl Iterator<Item = (&str, &[Arc<FileRecord>])> {
        self.by_hash
            .iter()
            .map(|(hash, group)| (hash.as_str(), group.as_slice()))
    }

    pub fn records(&self) -> impl Iterator<Item = &Arc<FileRecord>> {
        self.by_path.values()
    }

    /// Independent tables sharing the same records.
    pub fn duplicate(&self) -> Self {
        self.clone()
    }

    /// Applies one changed record. Same-hash updates keep the record's place
    /// in its group; a hash change moves it to the new group and drops the
    /// old group once empty.
    pub fn update(&mut self, record: Arc<FileRecord>) {
        let same_hash = self
            .by_path
            .get(&record.path)
            .is_some_and(|existing| existing.content_hash == record.content_hash);

        if !same_hash {
            self.insert(record);
            return;
        }

        if let Some(slot) = self
            .by_hash
            .get_mut(&record.content_hash)
            .and_then(|group| group.iter_mut().find(|r| r.path == record.path))
        {
            *slot = Arc::clone(&record);
        }
        self.by_path.insert(record.path.clone(), record);
    }

    pub fn remove_path(&mut self, path: &str) -> Option<Arc<FileRecord>> {
        let removed = self.by_path.remove(path)?;
        if let Some(group) = self.by_hash.get_mut(&removed.content_hash) {
            group.retain(|record| record.path != path);
            if group.is_empty() {
                self.by_hash.remove(&removed.content_hash);
            }
        }
        Some(removed)
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    pub fn hash_count(&self) -> usize {
        self.by_hash.len()
    }
}

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{CatalogError, Result};
use crate::fsutil::{self, FileStat, HashedFile, now_unix};
use crate::index::{
    DiscoveredSource, IndexFilter, IndexSourceFile, RemoteSource, discover_sources, load_index,
    parent_dir_name,
};
use crate::record::FileRecord;
use crate::snapshot::IndexSnapshot;
use crate::storage::{DeviceRegistry, SiteInfo, StorageClassifier, StorageDevice};

/// Index files touched more recently than this are still being written and
/// do not count as modified yet.
pub const SETTLE_SECS: i64 = 5;

#[derive(Debug, Clone)]
pub struct CatalogOptions {
    pub index_dir: PathBuf,
    pub site: SiteInfo,
    pub remote_sources: Vec<RemoteSource>,
}

impl CatalogOptions {
    pub fn new(index_dir: impl Into<PathBuf>) -> Self {
        Self {
            index_dir: index_dir.into(),
            site: SiteInfo::default(),
            remote_sources: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogState {
    Empty,
    Ready,
}

/// Counters describing one [`Catalog::reload`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReloadSummary {
    pub sources: usize,
    pub parsed: usize,
    pub reused: usize,
    pub failed: usize,
    pub records: usize,
}

#[derive(Debug, Clone)]
pub enum UpdateOutcome {
    /// Size and mtime match the current snapshot.
    Unchanged,
    /// Junk or unclassifiable; nothing was hashed.
    Rejected,
    Applied(Arc<FileRecord>),
}

/// The content-addressable catalog.
///
/// Readers go through [`Catalog::snapshot`] or the search helpers and never
/// take a lock. `reload` and `apply_update` are meant to be driven by a
/// single writer loop; each publishes a complete new snapshot with one
/// atomic swap.
#[derive(Debug)]
pub struct Catalog {
    index_dir: PathBuf,
    snapshot: ArcSwap<IndexSnapshot>,
    sources: Mutex<Arc<Vec<IndexSourceFile>>>,
    filter: IndexFilter,
    remotes: HashMap<String, StorageDevice>,
    loaded: AtomicBool,
    parses: AtomicU64,
}

impl Catalog {
    pub fn new(options: CatalogOptions) -> Self {
        let registry = Arc::new(DeviceRegistry::new());
        Self::with_registry(options, registry)
    }

    pub fn with_registry(options: CatalogOptions, registry: Arc<DeviceRegistry>) -> Self {
        let classifier = StorageClassifier::new(registry, options.site);
        let remotes = options
            .remote_sources
            .into_iter()
            .map(|remote| (remote.dir, remote.device))
            .collect();

        Self {
            index_dir: options.index_dir,
            snapshot: ArcSwap::from_pointee(IndexSnapshot::new()),
            sources: Mutex::new(Arc::new(Vec::new())),
            filter: IndexFilter::new(classifier),
            remotes,
            loaded: AtomicBool::new(false),
            parses: AtomicU64::new(0),
        }
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    pub fn state(&self) -> CatalogState {
        if self.loaded.load(Ordering::Acquire) {
            CatalogState::Ready
        } else {
            CatalogState::Empty
        }
    }

    /// The current snapshot. Holding it keeps that generation alive.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.snapshot.load_full()
    }

    pub fn search(&self, hash: &str) -> Option<Vec<Arc<FileRecord>>> {
        self.snapshot.load().search(hash).map(<[_]>::to_vec)
    }

    pub fn search_path(&self, path: &str) -> Option<Arc<FileRecord>> {
        self.snapshot.load().search_path(path).cloned()
    }

    /// First record of the hash group, the one served for downloads.
    pub fn first_by_hash(&self, hash: &str) -> Option<Arc<FileRecord>> {
        self.snapshot
            .load()
            .search(hash)
            .and_then(|group| group.first().cloned())
    }

    pub fn grouped_by_hash(&self) -> Vec<Vec<Arc<FileRecord>>> {
        self.snapshot
            .load()
            .grouped_by_hash()
            .map(|(_, group)| group.to_vec())
            .collect()
    }

    /// Every device seen so far, sorted by id.
    pub fn devices(&self) -> Vec<StorageDevice> {
        self.filter.classifier().registry().list()
    }

    /// Number of index files parsed since construction.
    pub fn parse_count(&self) -> u64 {
        self.parses.load(Ordering::Relaxed)
    }

    /// Rescans the index directory and publishes a snapshot of the union of
    /// all index files. Files whose mtime did not change reuse their records.
    pub fn reload(&self) -> ReloadSummary {
        let discovered = discover_sources(&self.index_dir);
        let previous = Arc::clone(&self.sources.lock());
        let previous: HashMap<&Path, &IndexSourceFile> = previous
            .iter()
            .map(|source| (source.path.as_path(), source))
            .collect();

        let mut summary = ReloadSummary {
            sources: discovered.len(),
            ..ReloadSummary::default()
        };
        let mut next = Vec::with_capacity(discovered.len());
        let mut all = Vec::new();

        for DiscoveredSource { path, mtime } in discovered {
            let records = match previous.get(path.as_path()) {
                Some(known) if known.mtime == mtime => {
                    summary.reused += 1;
                    Arc::clone(&known.records)
                }
                _ => match self.parse_source(&path) {
                    Ok(records) => {
                        info!(path = %path.display(), records = records.len(), "parsed index file");
                        summary.parsed += 1;
                        records
                    }
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "index file ignored");
                        summary.failed += 1;
                        Arc::from(Vec::new())
                    }
                },
            };
            all.extend(records.iter().cloned());
            next.push(IndexSourceFile {
                path,
                mtime,
                records,
            });
        }

        summary.records = all.len();
        self.snapshot.store(Arc::new(IndexSnapshot::build(all)));
        *self.sources.lock() = Arc::new(next);
        self.loaded.store(true, Ordering::Release);

        debug!(?summary, "catalog reloaded");
        summary
    }

    fn parse_source(&self, path: &Path) -> Result<Arc<[Arc<FileRecord>]>> {
        self.parses.fetch_add(1, Ordering::Relaxed);

        let remote = parent_dir_name(path)
            .and_then(|dir| self.remotes.get(dir))
            .map(|device| self.filter.classifier().registry().get_or_insert(device.clone()));

        let reader = BufReader::new(File::open(path)?);
        let records = load_index(reader, |record| self.filter.accept(record, remote.as_ref()))?;
        Ok(records.into_iter().map(Arc::new).collect())
    }

    /// Cheap check whether a [`reload`](Self::reload) would see anything new.
    pub fn is_modified(&self) -> bool {
        let discovered = discover_sources(&self.index_dir);
        let sources = Arc::clone(&self.sources.lock());
        if discovered.len() != sources.len() {
            return true;
        }

        let known: HashMap<&Path, i64> = sources
            .iter()
            .map(|source| (source.path.as_path(), source.mtime))
            .collect();
        let now = now_unix();

        discovered.iter().any(|source| {
            if now - source.mtime < SETTLE_SECS {
                return false;
            }
            known.get(source.path.as_path()) != Some(&source.mtime)
        })
    }

    /// Re-indexes a single file that may have changed.
    ///
    /// Hashing happens before the snapshot is touched; the patched copy is
    /// published with one swap. A file whose size or mtime moved while it
    /// was being read is reported as [`CatalogError::RaceDetected`].
    pub fn apply_update(&self, path: &Path) -> Result<UpdateOutcome> {
        self.apply_update_with(path, fsutil::hash_file)
    }

    /// [`Self::apply_update`] with the hashing step supplied by the caller.
    pub(crate) fn apply_update_with<H>(&self, path: &Path, hash: H) -> Result<UpdateOutcome>
    where
        H: FnOnce(&Path) -> std::io::Result<HashedFile>,
    {
        let key = path.to_string_lossy().into_owned();
        let before = fsutil::stat(path).map_err(|source| CatalogError::Stat {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(current) = self.search_path(&key)
            && current.size == before.size
            && current.mtime == before.mtime
        {
            return Ok(UpdateOutcome::Unchanged);
        }

        let candidate = FileRecord::new(key, "", before.size, before.mtime);
        let Some(candidate) = self.filter.accept(candidate, None) else {
            debug!(path = %path.display(), "update rejected by filter");
            return Ok(UpdateOutcome::Rejected);
        };

        let hashed = hash(path).map_err(|source| CatalogError::Hash {
            path: path.to_path_buf(),
            source,
        })?;
        if changed_while_hashing(before, &hashed) {
            return Err(CatalogError::RaceDetected {
                path: path.to_path_buf(),
            });
        }

        let record = Arc::new(candidate.with_hash(hashed.sha1));
        self.snapshot.rcu(|current| {
            let mut next = current.duplicate();
            next.update(Arc::clone(&record));
            next
        });
        self.loaded.store(true, Ordering::Release);

        info!(path = %record.path, hash = %record.content_hash, "catalog updated");
        Ok(UpdateOutcome::Applied(record))
    }
}

/// True when the stat taken after the last byte was read differs from the
/// one taken before hashing started.
fn changed_while_hashing(before: FileStat, after: &HashedFile) -> bool {
    before.size != after.stat.size || before.mtime != after.stat.mtime
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_index(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn starts_empty_and_becomes_ready() {
        let dir = tempfile::tempdir().unwrap();
        write_index(dir.path(), "a.idx", "[\"/mnt/001/a.mp4\",\"h1\",100,1000]\n");

        let catalog = Catalog::new(CatalogOptions::new(dir.path()));
        assert_eq!(catalog.state(), CatalogState::Empty);
        assert!(catalog.search("h1").is_none());

        let summary = catalog.reload();
        assert_eq!(catalog.state(), CatalogState::Ready);
        assert_eq!(summary.records, 1);
        assert_eq!(catalog.first_by_hash("h1").unwrap().device_id(), Some("disk-001"));
    }

    #[test]
    fn broken_file_does_not_poison_the_others() {
        let dir = tempfile::tempdir().unwrap();
        write_index(dir.path(), "good.idx", "[\"/mnt/001/a.mp4\",\"h1\",100,1000]\n");
        write_index(
            dir.path(),
            "bad.idx",
            "[\"/mnt/001/b.mp4\",\"h2\",1,1]\n[\"/mnt/001/c.mp4\",\"h3\"\n",
        );

        let catalog = Catalog::new(CatalogOptions::new(dir.path()));
        let summary = catalog.reload();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.parsed, 1);
        assert!(catalog.search("h1").is_some());
        assert!(catalog.search("h2").is_none());
    }

    #[test]
    fn remote_directory_overrides_classification() {
        let dir = tempfile::tempdir().unwrap();
        write_index(dir.path(), "ca-ovh/files.idx", "[\"/a.mp4\",\"h1\",100,1000]\n");

        let mut options = CatalogOptions::new(dir.path());
        options.remote_sources = RemoteSource::defaults();
        let catalog = Catalog::new(options);
        catalog.reload();

        let record = catalog.first_by_hash("h1").unwrap();
        assert_eq!(record.device_id(), Some("aa886ee5-5d9b-413a-baae-63079c89575d"));
        assert_eq!(catalog.devices().len(), 1);
    }

    #[test]
    fn is_modified_tracks_new_files() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::new(CatalogOptions::new(dir.path()));
        assert!(!catalog.is_modified());

        write_index(dir.path(), "a.idx", "[\"/mnt/001/a.mp4\",\"h1\",100,1000]\n");
        assert!(catalog.is_modified());
        catalog.reload();
        assert!(!catalog.is_modified());
    }

    #[test]
    fn apply_update_hashes_new_files() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("mnt/001");
        fs::create_dir_all(&media).unwrap();
        let file = media.join("clip.mp4");
        fs::write(&file, b"abc").unwrap();

        let catalog = Catalog::new(CatalogOptions::new(dir.path().join("idx")));
        let outcome = catalog.apply_update(&file).unwrap();
        let UpdateOutcome::Applied(record) = outcome else {
            panic!("expected applied, got {outcome:?}");
        };
        assert_eq!(record.content_hash, "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(record.size, 3);
        assert_eq!(catalog.state(), CatalogState::Ready);
        assert!(catalog.search(&record.content_hash).is_some());

        assert!(matches!(
            catalog.apply_update(&file).unwrap(),
            UpdateOutcome::Unchanged
        ));
    }

    #[test]
    fn apply_update_rejects_junk_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("mnt/001");
        fs::create_dir_all(&media).unwrap();
        let empty = media.join("empty.mp4");
        fs::write(&empty, b"").unwrap();

        let catalog = Catalog::new(CatalogOptions::new(dir.path().join("idx")));
        assert!(matches!(
            catalog.apply_update(&empty).unwrap(),
            UpdateOutcome::Rejected
        ));
        let err = catalog.apply_update(&media.join("absent.mp4")).unwrap_err();
        assert!(matches!(err, CatalogError::Stat { .. }));
        assert!(catalog.snapshot().is_empty());
    }

    #[test]
    fn write_during_hash_is_a_race() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("mnt/001");
        fs::create_dir_all(&media).unwrap();
        let file = media.join("clip.mp4");
        fs::write(&file, b"abc").unwrap();

        let catalog = Catalog::new(CatalogOptions::new(dir.path().join("idx")));
        catalog.apply_update(&file).unwrap();
        let key = file.to_string_lossy().into_owned();
        let indexed = catalog.search_path(&key).unwrap();

        fs::write(&file, b"abcd").unwrap();
        let err = catalog
            .apply_update_with(&file, |path| {
                let mut handle = fs::OpenOptions::new().append(true).open(path)?;
                std::io::Write::write_all(&mut handle, b"e")?;
                fsutil::hash_file(path)
            })
            .unwrap_err();
        assert!(matches!(err, CatalogError::RaceDetected { .. }));

        let current = catalog.search_path(&key).unwrap();
        assert!(Arc::ptr_eq(&current, &indexed));
        assert_eq!(catalog.snapshot().len(), 1);
    }

    #[test]
    fn race_check_compares_against_the_pre_hash_stat() {
        let before = FileStat { size: 4, mtime: 1000 };
        let hashed = |size, mtime| HashedFile {
            sha1: "h".to_string(),
            bytes_read: 4,
            stat: FileStat { size, mtime },
        };

        assert!(!changed_while_hashing(before, &hashed(4, 1000)));
        assert!(changed_while_hashing(before, &hashed(5, 1000)));
        assert!(changed_while_hashing(before, &hashed(4, 1001)));
    }
}

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, SystemTime};

use filer_core::index::{load_index, save_index};
use filer_core::storage::{DeviceStatus, StorageDevice};
use filer_core::{Catalog, CatalogOptions, FileRecord, IndexSnapshot};
use tempfile::TempDir;

fn write_index(dir: &Path, name: &str, records: &[FileRecord]) -> PathBuf {
    let path = dir.join(name);
    let file = File::create(&path).unwrap();
    save_index(file, records).unwrap();
    path
}

fn set_mtime(path: &Path, secs_ago: u64) {
    let when = SystemTime::now() - Duration::from_secs(secs_ago);
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(when)
        .unwrap();
}

fn entries(snapshot: &IndexSnapshot) -> Vec<(String, String, i64, i64)> {
    let mut entries: Vec<_> = snapshot
        .records()
        .map(|r| (r.path.clone(), r.content_hash.clone(), r.size, r.mtime))
        .collect();
    entries.sort();
    entries
}

fn fixture() -> (TempDir, Catalog) {
    let dir = tempfile::tempdir().unwrap();
    write_index(
        dir.path(),
        "site.idx",
        &[
            FileRecord::new("/mnt/001/a.mp4", "h1", 100, 1000),
            FileRecord::new("/mnt/002/b.mp4", "h1", 50, 1000),
            FileRecord::new("/net/nas/video/c.mp4", "h2", 70, 1000),
        ],
    );
    write_index(
        dir.path(),
        "tape.idx",
        &[FileRecord::new("/tape/lto-0001/d.mp4", "h3", 10, 1000)],
    );
    let catalog = Catalog::new(CatalogOptions::new(dir.path()));
    (dir, catalog)
}

#[test]
fn duplicate_content_forms_one_group() {
    let (_dir, catalog) = fixture();
    catalog.reload();

    let group = catalog.search("h1").unwrap();
    let mut paths: Vec<_> = group.iter().map(|r| r.path.as_str()).collect();
    paths.sort_unstable();
    assert_eq!(paths, vec!["/mnt/001/a.mp4", "/mnt/002/b.mp4"]);
    assert!(catalog.search("missing").is_none());

    let devices: Vec<_> = catalog.devices().iter().map(|d| d.id.clone()).collect();
    assert_eq!(devices, vec!["disk-001", "disk-002", "lto-0001", "nas-video"]);
}

#[test]
fn reload_is_idempotent() {
    let (_dir, catalog) = fixture();
    catalog.reload();
    let first = catalog.snapshot();
    catalog.reload();
    let second = catalog.snapshot();

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(entries(&first), entries(&second));
    assert_eq!(first.hash_count(), second.hash_count());
}

#[test]
fn unchanged_index_files_are_not_reparsed() {
    let (dir, catalog) = fixture();
    catalog.reload();
    assert_eq!(catalog.parse_count(), 2);

    let summary = catalog.reload();
    assert_eq!(catalog.parse_count(), 2);
    assert_eq!(summary.reused, 2);

    let changed = write_index(
        dir.path(),
        "tape.idx",
        &[FileRecord::new("/tape/lto-0001/e.mp4", "h4", 10, 2000)],
    );
    set_mtime(&changed, 60);
    let summary = catalog.reload();
    assert_eq!(catalog.parse_count(), 3);
    assert_eq!((summary.parsed, summary.reused), (1, 1));
    assert!(catalog.search("h3").is_none());
    assert!(catalog.search("h4").is_some());
}

#[test]
fn removed_index_file_drops_its_records() {
    let (dir, catalog) = fixture();
    catalog.reload();
    fs::remove_file(dir.path().join("tape.idx")).unwrap();

    assert!(catalog.is_modified());
    catalog.reload();
    assert!(catalog.search("h3").is_none());
    assert_eq!(catalog.snapshot().len(), 3);
}

#[test]
fn single_directory_paths_stay_searchable() {
    let dir = tempfile::tempdir().unwrap();
    write_index(
        dir.path(),
        "flat.idx",
        &[
            FileRecord::new("/home/a.mp4", "h1", 100, 1000),
            FileRecord::new("c:/b.mp4", "h2", 100, 1000),
            FileRecord::new("/mnt/c.mp4", "h3", 100, 1000),
            FileRecord::new("/d.mp4", "h4", 100, 1000),
        ],
    );
    let catalog = Catalog::new(CatalogOptions::new(dir.path()));
    let summary = catalog.reload();
    assert_eq!(summary.records, 3);

    let home = catalog.first_by_hash("h1").unwrap();
    let device = home.device.as_ref().unwrap();
    assert_eq!(device.id, StorageDevice::UNKNOWN_ID);
    assert_eq!(device.status, DeviceStatus::Offline);

    let drive = catalog.first_by_hash("h2").unwrap();
    let device = drive.device.as_ref().unwrap();
    assert_eq!(device.id, "server-c:");
    assert_eq!(device.status, DeviceStatus::Online);

    assert_eq!(
        catalog.first_by_hash("h3").unwrap().device_id(),
        Some(StorageDevice::UNKNOWN_ID)
    );
    assert!(catalog.search("h4").is_none());
}

#[test]
fn saved_index_loads_back_equal() {
    let (dir, catalog) = fixture();
    catalog.reload();

    let snapshot = catalog.snapshot();
    let records: Vec<FileRecord> = snapshot.records().map(|r| (**r).clone()).collect();
    let path = write_index(dir.path(), "export.out", &records);
    let loaded = load_index(std::io::BufReader::new(File::open(path).unwrap()), Some).unwrap();

    let mut expected: Vec<_> = records
        .iter()
        .map(|r| (r.path.clone(), r.content_hash.clone(), r.size, r.mtime))
        .collect();
    let mut actual: Vec<_> = loaded
        .iter()
        .map(|r| (r.path.clone(), r.content_hash.clone(), r.size, r.mtime))
        .collect();
    expected.sort();
    actual.sort();
    assert_eq!(expected, actual);
}

#[test]
fn readers_never_see_a_torn_snapshot() {
    let (dir, catalog) = fixture();
    catalog.reload();
    let catalog = Arc::new(catalog);
    let stop = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let catalog = Arc::clone(&catalog);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut reads = 0u64;
                loop {
                    let done = stop.load(Ordering::Relaxed);
                    let snapshot = catalog.snapshot();
                    for (hash, group) in snapshot.grouped_by_hash() {
                        assert!(!group.is_empty());
                        for record in group {
                            assert_eq!(record.content_hash, hash);
                            let by_path = snapshot.search_path(&record.path).unwrap();
                            assert!(Arc::ptr_eq(by_path, record));
                        }
                    }
                    assert_eq!(
                        snapshot.len(),
                        snapshot.grouped_by_hash().map(|(_, g)| g.len()).sum::<usize>()
                    );
                    reads += 1;
                    if done {
                        break reads;
                    }
                }
            })
        })
        .collect();

    let index = dir.path().join("tape.idx");
    for round in 0..50u64 {
        let hash = format!("h-round-{}", round % 3);
        write_index(
            dir.path(),
            "tape.idx",
            &[
                FileRecord::new("/tape/lto-0001/d.mp4", &hash, 10, 1000),
                FileRecord::new("/tape/lto-0001/e.mp4", &hash, 20, 1000),
            ],
        );
        set_mtime(&index, 100 + round);
        catalog.reload();
    }

    stop.store(true, Ordering::Relaxed);
    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
}

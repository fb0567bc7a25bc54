//! Stat and content-hash helpers shared by the catalog and the transcoding
//! result handler.

use std::fs::{self, File, Metadata};
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use sha1::{Digest, Sha1};

/// The (size, mtime) pair the catalog uses to decide whether a file changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size: i64,
    pub mtime: i64,
}

impl From<&Metadata> for FileStat {
    fn from(meta: &Metadata) -> Self {
        Self {
            size: i64::try_from(meta.len()).unwrap_or(i64::MAX),
            mtime: unix_mtime(meta),
        }
    }
}

/// A file's SHA-1 together with the stat taken after the last byte was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedFile {
    pub sha1: String,
    pub bytes_read: u64,
    pub stat: FileStat,
}

pub fn stat(path: &Path) -> io::Result<FileStat> {
    fs::metadata(path).map(|meta| FileStat::from(&meta))
}

/// Modification time in unix seconds; times before the epoch are negative.
pub fn unix_mtime(meta: &Metadata) -> i64 {
    match meta.modified() {
        Ok(modified) => system_time_secs(modified),
        Err(_) => 0,
    }
}

pub fn system_time_secs(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_secs() as i64,
        Err(before) => -(before.duration().as_secs() as i64),
    }
}

pub fn now_unix() -> i64 {
    system_time_secs(SystemTime::now())
}

/// Reads `path` to the end and returns its hex SHA-1.
pub fn hash_file(path: &Path) -> io::Result<HashedFile> {
    let mut file = File::open(path)?;
    let mut hasher = Sha1::new();
    let bytes_read = io::copy(&mut file, &mut hasher)?;
    let stat = FileStat::from(&file.metadata()?);

    Ok(HashedFile {
        sha1: hex::encode(hasher.finalize()),
        bytes_read,
        stat,
    })
}

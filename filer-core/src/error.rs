use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures raised while loading index files or applying catalog updates.
///
/// None of these ever escape the reconciliation loop: a failed index file
/// contributes zero records, a failed update leaves the current snapshot in
/// place.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: malformed record: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("line {line}: expected 4 fields, found {found}")]
    WrongArity { line: usize, found: usize },

    #[error("line {line}: field `{field}` has the wrong type")]
    InvalidField { line: usize, field: &'static str },

    #[error("line {line}: longer than {limit} bytes")]
    LongLine { line: usize, limit: usize },

    #[error("cannot stat {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot hash {path}: {source}")]
    Hash {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} changed while it was being hashed")]
    RaceDetected { path: PathBuf },
}

impl CatalogError {
    /// Index parse failures abort one source file; everything else aborts a
    /// single update.
    pub fn is_parse_failure(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. }
                | Self::WrongArity { .. }
                | Self::InvalidField { .. }
                | Self::LongLine { .. }
        )
    }
}

/// Admission-control rejection returned by [`crate::transcode::TranscodePipeline::submit`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    #[error("transcoding queue is full")]
    QueueFull,

    #[error("transcoding is disabled")]
    Disabled,

    #[error("transcoding pipeline is shut down")]
    Closed,
}

/// Failures of the external transcoding and probing processes.
#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error(transparent)]
    Rejected(#[from] SubmitError),

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with status {code}")]
    Exit { program: String, code: i32 },

    #[error("{program} killed after {after:?}")]
    TimedOut { program: String, after: Duration },

    #[error("probe output is not valid: {0}")]
    Probe(#[from] serde_json::Error),

    #[error("no preset for {0}")]
    NoPreset(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

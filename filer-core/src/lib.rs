//! # Filer Core
//!
//! Core library for the filer media server: a content-addressable catalog of
//! media files spread over many storage devices, plus the transcoding and
//! delivery machinery built on top of it.
//!
//! ## Overview
//!
//! - **Storage classification**: [`storage::StorageClassifier`] maps a file
//!   path to the [`storage::StorageDevice`] holding it
//! - **Index files**: [`index::load_index`] and [`index::save_index`] read and
//!   write the flat `["path","sha1",size,mtime]` line format
//! - **Snapshots**: [`IndexSnapshot`] groups records by content hash and
//!   indexes them by path
//! - **Catalog**: [`Catalog`] publishes snapshots with an atomic swap so
//!   readers never lock; it reconciles index files and applies single-file
//!   updates
//! - **Transcoding**: [`transcode::TranscodePipeline`] runs ffmpeg jobs on a
//!   bounded worker pool
//! - **Delivery**: [`DeliveryGate`] hands out time-limited download
//!   authorizations
//!
//! ## Example
//!
//! ```no_run
//! use filer_core::{Catalog, CatalogOptions};
//!
//! let catalog = Catalog::new(CatalogOptions::new("/var/lib/filer/index"));
//! catalog.reload();
//! if let Some(records) = catalog.search("a9993e364706816aba3e25717850c26c9cd0d89d") {
//!     for record in records {
//!         println!("{} on {:?}", record.path, record.device_id());
//!     }
//! }
//! ```

pub mod catalog;
pub mod error;
pub mod fsutil;
pub mod gate;
pub mod index;
pub mod record;
pub mod snapshot;
pub mod storage;
pub mod transcode;
pub mod translate;

pub use catalog::{Catalog, CatalogOptions, CatalogState, ReloadSummary, UpdateOutcome};
pub use error::{CatalogError, Result, SubmitError, TranscodeError};
pub use gate::{DeliveryGate, DeliveryToken};
pub use record::FileRecord;
pub use snapshot::IndexSnapshot;
pub use translate::PathTranslator;

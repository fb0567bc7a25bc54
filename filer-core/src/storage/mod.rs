//! Storage devices: where catalogued files physically live.

mod classifier;
mod device;
mod registry;

pub use classifier::{SiteInfo, StorageClassifier, directory_segments};
pub use device::{AccessClass, DeviceStatus, StorageDevice};
pub use registry::DeviceRegistry;

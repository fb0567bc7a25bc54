use std::sync::Arc;

use dashmap::DashMap;

use super::StorageDevice;

/// Process-wide map of device id to device.
///
/// The first device inserted under an id wins; later inserts with the same id
/// get the existing instance back, so every record classified to that id
/// shares one `Arc`.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: DashMap<String, Arc<StorageDevice>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Arc<StorageDevice>> {
        self.devices.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Returns the registered device for `device.id`, registering `device` if
    /// the id is new.
    pub fn get_or_insert(&self, device: StorageDevice) -> Arc<StorageDevice> {
        if let Some(existing) = self.get(&device.id) {
            return existing;
        }
        let entry = self
            .devices
            .entry(device.id.clone())
            .or_insert_with(|| Arc::new(device));
        Arc::clone(entry.value())
    }

    /// Same as [`Self::get_or_insert`] but only builds the device when the id
    /// is not registered yet.
    pub fn get_or_insert_with(
        &self,
        id: &str,
        build: impl FnOnce() -> StorageDevice,
    ) -> Arc<StorageDevice> {
        if let Some(existing) = self.get(id) {
            return existing;
        }
        let entry = self
            .devices
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(build()));
        Arc::clone(entry.value())
    }

    /// Snapshot of all registered devices ordered by id.
    pub fn list(&self) -> Vec<StorageDevice> {
        let mut devices: Vec<StorageDevice> = self
            .devices
            .iter()
            .map(|entry| entry.value().as_ref().clone())
            .collect();
        devices.sort_by(|a, b| a.id.cmp(&b.id));
        devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reachability of a storage device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Online,
    Nearline,
    Offline,
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Online => "online",
            Self::Nearline => "nearline",
            Self::Offline => "offline",
        })
    }
}

/// How clients reach the files of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessClass {
    Local,
    Internet,
}

/// A place where catalogued files live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageDevice {
    pub id: String,
    pub status: DeviceStatus,
    pub access: AccessClass,
    pub country: String,
    pub location: String,
}

impl StorageDevice {
    pub const UNKNOWN_ID: &'static str = "unknown";

    pub fn unknown(country: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            id: Self::UNKNOWN_ID.to_string(),
            status: DeviceStatus::Offline,
            access: AccessClass::Local,
            country: country.into(),
            location: location.into(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.id == Self::UNKNOWN_ID
    }
}

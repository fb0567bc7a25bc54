//! Configuration library for the filer media server.
//!
//! Settings come from a TOML file, the process environment and an optional
//! `.env` file. Environment values win over the file, the file wins over the
//! built-in defaults. [`ConfigLoader::load`] returns the resolved [`Config`]
//! together with non-fatal [`ConfigWarnings`].

pub mod loader;
pub mod models;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoader, ConfigLoaderOptions, error::ConfigLoadError};
pub use models::{
    Config, ConfigMetadata, IndexConfig, LocationConfig, NotifyConfig, ServerConfig,
    TranscoderConfig, UpdateConfig,
};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};

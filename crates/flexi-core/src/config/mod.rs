//! Configuration module for the dispatcher
//!
//! Loaded once at startup from YAML and threaded into the dispatcher, the
//! queue and the crypto client as an explicit value.

pub mod types;
pub mod loader;

pub use types::*;
pub use loader::*;


use crate::errors::ConfigError;
use std::path::Path;

/// Load a configuration from a YAML file
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<FlexiConfig, ConfigError> {
    ConfigLoader::from_file(path).await
}

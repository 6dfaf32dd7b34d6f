//! Configuration loader for YAML files and environment overrides
//!
//! Values are read from YAML first, then a fixed set of `FLEXI_*`
//! environment variables override them, then the result is validated.

use crate::config::types::FlexiConfig;
use crate::errors::ConfigError;
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;

pub const ENV_QUEUE_NAME: &str = "FLEXI_QUEUE_NAME";
pub const ENV_UPLOADS_DIR: &str = "FLEXI_UPLOADS_DIR";
pub const ENV_CRYPTO_URL: &str = "FLEXI_CRYPTO_URL";
pub const ENV_WORKSPACE_ROOT: &str = "FLEXI_WORKSPACE_ROOT";
pub const ENV_CONCURRENCY: &str = "FLEXI_CONCURRENCY";

/// Configuration loader with environment resolution
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<FlexiConfig, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await.map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_str(content: &str) -> Result<FlexiConfig, ConfigError> {
        let mut config: FlexiConfig = if content.trim().is_empty() {
            FlexiConfig::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?
        };

        Self::apply_environment(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, for running without a config file
    pub fn from_environment() -> Result<FlexiConfig, ConfigError> {
        Self::from_str("")
    }

    fn apply_environment(config: &mut FlexiConfig) -> Result<(), ConfigError> {
        if let Ok(name) = env::var(ENV_QUEUE_NAME) {
            config.queue.name = name;
        }
        if let Ok(dir) = env::var(ENV_UPLOADS_DIR) {
            config.storage.uploads_dir = PathBuf::from(dir);
        }
        if let Ok(url) = env::var(ENV_CRYPTO_URL) {
            config.crypto.base_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(root) = env::var(ENV_WORKSPACE_ROOT) {
            config.workspace.root = Some(PathBuf::from(root));
        }
        if let Ok(value) = env::var(ENV_CONCURRENCY) {
            config.queue.concurrency =
                value.trim().parse().map_err(|e| ConfigError::InvalidValue {
                    key: ENV_CONCURRENCY.to_string(),
                    message: format!("'{}': {}", value, e),
                })?;
        }
        Ok(())
    }
}

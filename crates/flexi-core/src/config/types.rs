//! Configuration type definitions for the dispatcher
//!
//! Every value the dispatcher needs at runtime (queue name, uploads
//! directory, crypto service address, interpreter commands) lives here and is
//! handed to components at construction time. All sections are optional in
//! YAML and fall back to the defaults below.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::errors::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FlexiConfig {
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub crypto: CryptoConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub runtimes: RuntimeCommands,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_queue_name")]
    pub name: String,
    #[serde(default = "default_queue_capacity")]
    pub capacity: usize,
    /// Maximum number of requests handled at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding encrypted code blobs; relative code locations resolve here.
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,
    #[serde(default)]
    pub catalog: Option<PathBuf>,
    #[serde(default = "default_execution_log")]
    pub execution_log: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoConfig {
    #[serde(default = "default_crypto_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkspaceConfig {
    /// Parent directory for per-request workspaces. System temp dir when unset.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

/// Commands used to compile and run each runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeCommands {
    #[serde(default = "default_python")]
    pub python: String,
    #[serde(default = "default_node")]
    pub node: String,
    #[serde(default = "default_javac")]
    pub javac: String,
    #[serde(default = "default_java")]
    pub java: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_queue_name() -> String {
    "function-execution-queue".to_string()
}
fn default_queue_capacity() -> usize { 256 }
fn default_concurrency() -> usize { 4 }
fn default_uploads_dir() -> PathBuf {
    PathBuf::from("uploads")
}
fn default_execution_log() -> PathBuf {
    PathBuf::from("execution_logs.jsonl")
}
fn default_crypto_url() -> String {
    "http://localhost:8081".to_string()
}
fn default_request_timeout_secs() -> u64 { 30 }
fn default_python() -> String {
    "python3".to_string()
}
fn default_node() -> String {
    "node".to_string()
}
fn default_javac() -> String {
    "javac".to_string()
}
fn default_java() -> String {
    "java".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: default_queue_name(),
            capacity: default_queue_capacity(),
            concurrency: default_concurrency(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_dir: default_uploads_dir(),
            catalog: None,
            execution_log: default_execution_log(),
        }
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            base_url: default_crypto_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for RuntimeCommands {
    fn default() -> Self {
        Self {
            python: default_python(),
            node: default_node(),
            javac: default_javac(),
            java: default_java(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl FlexiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue.name.trim().is_empty() {
            return Err(ConfigError::Validation("queue.name must not be empty".to_string()));
        }
        if self.queue.capacity == 0 {
            return Err(ConfigError::Validation("queue.capacity must be at least 1".to_string()));
        }
        if self.queue.concurrency == 0 {
            return Err(ConfigError::Validation(
                "queue.concurrency must be at least 1".to_string(),
            ));
        }
        if !(self.crypto.base_url.starts_with("http://")
            || self.crypto.base_url.starts_with("https://"))
        {
            return Err(ConfigError::Validation(format!(
                "crypto.base_url must be an http(s) URL, got '{}'",
                self.crypto.base_url
            )));
        }
        for (key, command) in [
            ("runtimes.python", &self.runtimes.python),
            ("runtimes.node", &self.runtimes.node),
            ("runtimes.javac", &self.runtimes.javac),
            ("runtimes.java", &self.runtimes.java),
        ] {
            if command.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{} must not be empty", key)));
            }
        }
        Ok(())
    }
}

//! Error types for the execution dispatcher
//!
//! Each failure kind the dispatcher can meet has its own variant so the
//! classification into an execution outcome happens on data rather than on
//! string matching. Expected failures (a compile error, a program exiting
//! non-zero) and unexpected faults (I/O, missing interpreter) live in the same
//! hierarchy but map to different terminal statuses.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DispatchError {
    #[error("Unsupported runtime: {0}")]
    UnsupportedRuntime(String),
    #[error(transparent)]
    Decryption(#[from] DecryptionError),
    #[error(transparent)]
    Executor(#[from] ExecutorError),
    #[error("Workspace error: {0}")]
    Workspace(String),
}

impl From<std::io::Error> for DispatchError {
    fn from(err: std::io::Error) -> Self {
        DispatchError::Workspace(err.to_string())
    }
}

// Errors raised while building or running submitted code
#[derive(Error, Debug, Clone)]
pub enum ExecutorError {
    /// Source could not be prepared or compiled. Classified as FAILED.
    #[error("{0}")]
    BuildFailed(String),
    #[error("Command '{command}' not found: {message}")]
    CommandNotFound { command: String, message: String },
    #[error("Failed to spawn '{command}': {message}")]
    SpawnFailed { command: String, message: String },
    #[error("I/O error during execution: {0}")]
    IoError(String),
}

impl From<std::io::Error> for ExecutorError {
    fn from(err: std::io::Error) -> Self {
        ExecutorError::IoError(err.to_string())
    }
}

/// Raised by the crypto client adapter once every decryption mode failed.
#[derive(Error, Debug, Clone)]
#[error("Decryption failed (tried {tried}): {causes}")]
pub struct DecryptionError {
    pub tried: String,
    pub causes: String,
}

impl DecryptionError {
    pub fn from_attempts(attempts: &[(String, String)]) -> Self {
        let tried = attempts
            .iter()
            .map(|(mode, _)| mode.as_str())
            .collect::<Vec<_>>()
            .join(" then ");
        let causes = attempts
            .iter()
            .map(|(mode, cause)| format!("{}: {}", mode, cause))
            .collect::<Vec<_>>()
            .join(" | ");
        Self { tried, causes }
    }
}

// Transport-level failure from a single crypto service call
#[derive(Error, Debug, Clone)]
pub enum CryptoServiceError {
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("Crypto service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Could not read blob: {0}")]
    Blob(String),
}

impl From<reqwest::Error> for CryptoServiceError {
    fn from(err: reqwest::Error) -> Self {
        CryptoServiceError::Http(err.to_string())
    }
}

impl From<std::io::Error> for CryptoServiceError {
    fn from(err: std::io::Error) -> Self {
        CryptoServiceError::Blob(err.to_string())
    }
}

#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    IoError(String),
    #[error("Store serialization error: {0}")]
    Serialization(String),
    #[error("Catalog error: {0}")]
    Catalog(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Queue '{0}' is closed")]
    Closed(String),
    #[error("Malformed queue message: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {message}")]
    Read { path: String, message: String },
    #[error("Failed to parse YAML config: {0}")]
    Parse(String),
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
    #[error("Validation error: {0}")]
    Validation(String),
}

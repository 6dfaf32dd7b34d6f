//! Client side of the external crypto service.
//!
//! Code reaches storage through two upload paths that leave ciphertext in
//! different encodings: file uploads store raw ciphertext, pasted text stores
//! a base64 string. The adapter cannot tell which one produced a blob, so it
//! tries each [`DecryptMode`] in order and keeps the first success.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::errors::{CryptoServiceError, DecryptionError};

pub mod http;

pub use http::HttpCryptoService;

/// Transport contract of the crypto service.
#[async_trait]
pub trait CryptoService: Send + Sync {
    /// Decrypts a blob holding raw ciphertext bytes.
    async fn decrypt_binary(&self, blob: &Path) -> Result<Vec<u8>, CryptoServiceError>;

    /// Decrypts a blob holding base64-wrapped ciphertext text.
    async fn decrypt_text(&self, blob: &Path) -> Result<Vec<u8>, CryptoServiceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptMode {
    TryBinary,
    TryText,
}

impl DecryptMode {
    pub fn label(&self) -> &'static str {
        match self {
            DecryptMode::TryBinary => "binary",
            DecryptMode::TryText => "text",
        }
    }
}

const DEFAULT_MODES: [DecryptMode; 2] = [DecryptMode::TryBinary, DecryptMode::TryText];

#[derive(Clone)]
pub struct CryptoClient {
    service: Arc<dyn CryptoService>,
    modes: Vec<DecryptMode>,
}

impl CryptoClient {
    pub fn new(service: Arc<dyn CryptoService>) -> Self {
        Self {
            service,
            modes: DEFAULT_MODES.to_vec(),
        }
    }

    pub fn with_modes(mut self, modes: Vec<DecryptMode>) -> Self {
        self.modes = modes;
        self
    }

    pub fn modes(&self) -> &[DecryptMode] {
        &self.modes
    }

    /// Runs a single decryption mode.
    pub async fn decrypt_with(
        &self,
        mode: DecryptMode,
        blob: &Path,
    ) -> Result<Vec<u8>, CryptoServiceError> {
        match mode {
            DecryptMode::TryBinary => self.service.decrypt_binary(blob).await,
            DecryptMode::TryText => self.service.decrypt_text(blob).await,
        }
    }

    /// Decrypts a stored blob, falling back through every configured mode.
    pub async fn decrypt(&self, blob: &Path) -> Result<Vec<u8>, DecryptionError> {
        let mut attempts = Vec::with_capacity(self.modes.len());
        for mode in &self.modes {
            match self.decrypt_with(*mode, blob).await {
                Ok(bytes) => {
                    if !attempts.is_empty() {
                        log::debug!(
                            "Decrypted {} with {} mode after {} failed attempt(s)",
                            blob.display(),
                            mode.label(),
                            attempts.len()
                        );
                    }
                    return Ok(bytes);
                }
                Err(e) => {
                    log::debug!("{} decryption of {} failed: {}", mode.label(), blob.display(), e);
                    attempts.push((mode.label().to_string(), e.to_string()));
                }
            }
        }
        Err(DecryptionError::from_attempts(&attempts))
    }
}

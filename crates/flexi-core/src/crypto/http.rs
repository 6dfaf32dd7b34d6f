use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

use super::CryptoService;
use crate::config::CryptoConfig;
use crate::errors::CryptoServiceError;

const DECRYPT_PATH: &str = "/api/crypto/decrypt";

/// reqwest client for the crypto service's decrypt endpoint.
#[derive(Debug, Clone)]
pub struct HttpCryptoService {
    client: Client,
    base_url: String,
}

impl HttpCryptoService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &CryptoConfig) -> Result<Self, CryptoServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn decrypt_url(&self) -> String {
        format!("{}{}", self.base_url, DECRYPT_PATH)
    }

    async fn read_body(response: Response) -> Result<Vec<u8>, CryptoServiceError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CryptoServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl CryptoService for HttpCryptoService {
    async fn decrypt_binary(&self, blob: &Path) -> Result<Vec<u8>, CryptoServiceError> {
        let ciphertext = fs::read(blob).await?;
        let file_name = blob
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "blob.enc".to_string());

        let form = Form::new().part("file", Part::bytes(ciphertext).file_name(file_name));
        let response = self
            .client
            .post(self.decrypt_url())
            .multipart(form)
            .send()
            .await?;
        Self::read_body(response).await
    }

    async fn decrypt_text(&self, blob: &Path) -> Result<Vec<u8>, CryptoServiceError> {
        let encoded = fs::read_to_string(blob).await?;
        let response = self
            .client
            .post(self.decrypt_url())
            .form(&[("data", encoded.trim())])
            .send()
            .await?;
        Self::read_body(response).await
    }
}

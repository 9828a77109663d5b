//! Asset publishing boundary
//!
//! Rendered receipts are uploaded to durable object storage so the fallback
//! text message can carry a clickable URL even when document delivery
//! fails. The storage mechanism itself is external; this is its interface
//! and HTTP client.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{NotifyError, NotifyResult};

/// A durably stored receipt asset.
#[derive(Debug, Clone)]
pub struct PublishedAsset {
    pub url: String,
}

#[async_trait]
pub trait AssetPublisher: Send + Sync {
    async fn publish(
        &self,
        bytes: &[u8],
        content_type: &str,
        suggested_name: &str,
    ) -> NotifyResult<PublishedAsset>;
}

/// Object-store endpoint configuration.
#[derive(Debug, Clone)]
pub struct AssetStoreConfig {
    pub upload_url: String,
    pub api_key: String,
}

impl AssetStoreConfig {
    pub fn from_env() -> NotifyResult<Self> {
        let upload_url = std::env::var("ASSET_STORE_URL")
            .map_err(|_| NotifyError::Config("ASSET_STORE_URL not set".to_string()))?;
        let api_key = std::env::var("ASSET_STORE_API_KEY").unwrap_or_default();
        Ok(Self {
            upload_url,
            api_key,
        })
    }
}

/// Uploads bytes to the object store and returns the public URL from the
/// store's JSON response.
pub struct HttpAssetPublisher {
    config: AssetStoreConfig,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct UploadResponse {
    url: String,
}

impl HttpAssetPublisher {
    pub fn new(config: AssetStoreConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_env() -> NotifyResult<Self> {
        Ok(Self::new(AssetStoreConfig::from_env()?))
    }
}

#[async_trait]
impl AssetPublisher for HttpAssetPublisher {
    async fn publish(
        &self,
        bytes: &[u8],
        content_type: &str,
        suggested_name: &str,
    ) -> NotifyResult<PublishedAsset> {
        let url = format!(
            "{}/upload?name={}",
            self.config.upload_url.trim_end_matches('/'),
            suggested_name
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| NotifyError::AssetPublish(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::AssetPublish(format!(
                "asset store returned {}",
                response.status()
            )));
        }

        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| NotifyError::AssetPublish(e.to_string()))?;

        Ok(PublishedAsset { url: parsed.url })
    }
}

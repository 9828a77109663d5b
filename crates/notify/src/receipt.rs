//! Receipt generation boundary
//!
//! The actual rendering engine (image/PDF layout) is an external service.
//! This module owns the interface plus the HTTP client for it, and the
//! derivation of verification codes embedded in receipts.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{NotifyError, NotifyResult};
use crate::records::{ServiceRecord, ServiceType};

/// Input to receipt rendering.
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptRequest {
    pub recipient_name: String,
    pub recipient_phone: String,
    pub service_type: ServiceType,
    pub amount_cents: i64,
    pub reference: String,
    pub description: String,
    pub verification_code: String,
}

/// Rendered receipt bytes plus content descriptor.
#[derive(Debug, Clone)]
pub struct ReceiptAsset {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl ReceiptAsset {
    /// File extension matching the content type (pdf or png).
    pub fn extension(&self) -> &'static str {
        if self.content_type == "application/pdf" {
            "pdf"
        } else {
            "png"
        }
    }
}

#[async_trait]
pub trait ReceiptGenerator: Send + Sync {
    async fn generate(&self, request: &ReceiptRequest) -> NotifyResult<ReceiptAsset>;
}

/// Verification code for a record: reuse the one issued at checkout, else
/// derive deterministically from service type and record identity. The
/// derivation is stable, so a retried dispatch re-issues the same code
/// without a write-back.
pub fn verification_code(service: ServiceType, record: &ServiceRecord) -> String {
    if let Some(code) = record
        .verification_code
        .as_deref()
        .filter(|c| !c.trim().is_empty())
    {
        return code.to_string();
    }
    let id = record.id.simple().to_string();
    format!(
        "{}-{}",
        service.reference_prefix(),
        id[..8].to_ascii_uppercase()
    )
}

/// Renderer endpoint configuration.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub base_url: String,
    pub api_key: String,
}

impl RendererConfig {
    pub fn from_env() -> NotifyResult<Self> {
        let base_url = std::env::var("RECEIPT_RENDERER_URL")
            .map_err(|_| NotifyError::Config("RECEIPT_RENDERER_URL not set".to_string()))?;
        let api_key = std::env::var("RECEIPT_RENDERER_API_KEY").unwrap_or_default();
        Ok(Self { base_url, api_key })
    }
}

/// HTTP client for the rendering service. POSTs the request payload and
/// receives the rendered bytes back with a Content-Type header.
pub struct HttpReceiptRenderer {
    config: RendererConfig,
    client: reqwest::Client,
}

impl HttpReceiptRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_env() -> NotifyResult<Self> {
        Ok(Self::new(RendererConfig::from_env()?))
    }
}

#[async_trait]
impl ReceiptGenerator for HttpReceiptRenderer {
    async fn generate(&self, request: &ReceiptRequest) -> NotifyResult<ReceiptAsset> {
        let url = format!("{}/render", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| NotifyError::ReceiptGeneration(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::ReceiptGeneration(format!(
                "renderer returned {}",
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/png")
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| NotifyError::ReceiptGeneration(e.to_string()))?;

        Ok(ReceiptAsset {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

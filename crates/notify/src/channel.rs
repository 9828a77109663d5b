//! Messaging channel boundary
//!
//! Receipts go out over a hosted messaging gateway (document messages with
//! a caption, plain text for the fallback path). A channel-level rejection
//! (`success: false` or a non-2xx status) is ordinary data — it triggers
//! the fallback protocol. Only transport breakage surfaces as `Err`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{NotifyError, NotifyResult};

/// Gateway response for a send attempt.
#[derive(Debug, Clone, Deserialize)]
pub struct SendOutcome {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Document message: rendered receipt plus a summary caption.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentMessage {
    pub to: String,
    pub text: String,
    pub document_url: String,
    pub file_name: String,
}

/// Plain-text message (fallback path).
#[derive(Debug, Clone, Serialize)]
pub struct TextMessage {
    pub to: String,
    pub text: String,
}

#[async_trait]
pub trait MessagingChannel: Send + Sync {
    async fn send_document(&self, message: &DocumentMessage) -> NotifyResult<SendOutcome>;
    async fn send_text(&self, message: &TextMessage) -> NotifyResult<SendOutcome>;
}

/// Messaging gateway configuration.
#[derive(Debug, Clone)]
pub struct MessagingConfig {
    pub base_url: String,
    pub api_key: String,
}

impl MessagingConfig {
    pub fn from_env() -> NotifyResult<Self> {
        let base_url = std::env::var("MESSAGING_API_URL")
            .map_err(|_| NotifyError::Config("MESSAGING_API_URL not set".to_string()))?;
        let api_key = std::env::var("MESSAGING_API_KEY")
            .map_err(|_| NotifyError::Config("MESSAGING_API_KEY not set".to_string()))?;
        Ok(Self { base_url, api_key })
    }
}

/// HTTP client for the messaging gateway.
pub struct HttpMessagingChannel {
    config: MessagingConfig,
    client: reqwest::Client,
}

impl HttpMessagingChannel {
    pub fn new(config: MessagingConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_env() -> NotifyResult<Self> {
        Ok(Self::new(MessagingConfig::from_env()?))
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> NotifyResult<SendOutcome> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // Gateway rejected the send: channel-level failure, not a
            // transport error. The caller decides whether to fall back.
            let detail = response.text().await.unwrap_or_default();
            return Ok(SendOutcome {
                success: false,
                message: Some(format!("gateway returned {status}: {detail}")),
                data: None,
            });
        }

        response
            .json::<SendOutcome>()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))
    }
}

#[async_trait]
impl MessagingChannel for HttpMessagingChannel {
    async fn send_document(&self, message: &DocumentMessage) -> NotifyResult<SendOutcome> {
        self.post("/messages/document", message).await
    }

    async fn send_text(&self, message: &TextMessage) -> NotifyResult<SendOutcome> {
        self.post("/messages/text", message).await
    }
}

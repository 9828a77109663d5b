//! Notification dispatch
//!
//! Turns one confirmed record (or purchaser group) into a delivered
//! receipt. The contract is strict: `dispatch` never returns an error.
//! Every failure — malformed phone, renderer outage, storage outage,
//! channel rejection — becomes a failed [`NotificationResult`], so one
//! recipient can never abort sibling deliveries in the same batch.

use std::sync::Arc;

use serde::Serialize;

use convene_shared::{mask_phone, normalize_phone};

use crate::assets::AssetPublisher;
use crate::channel::{DocumentMessage, MessagingChannel, TextMessage};
use crate::receipt::{verification_code, ReceiptGenerator, ReceiptRequest};
use crate::recorder::{DeliveryRecorder, LogLevel};
use crate::records::{ServiceRecord, ServiceType};

/// Which channel ultimately carried the receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryChannel {
    Document,
    TextFallback,
}

/// Outcome of one dispatch attempt. Ephemeral — persisted only via the
/// delivery log.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResult {
    pub success: bool,
    pub skipped: bool,
    pub channel: Option<DeliveryChannel>,
    pub fallback_used: bool,
    pub asset_generated: bool,
    pub asset_delivered: bool,
    pub recipient_phone: Option<String>,
    pub verification_code: Option<String>,
    pub error: Option<String>,
}

impl NotificationResult {
    fn skipped() -> Self {
        Self {
            success: false,
            skipped: true,
            channel: None,
            fallback_used: false,
            asset_generated: false,
            asset_delivered: false,
            recipient_phone: None,
            verification_code: None,
            error: Some("record not confirmed".to_string()),
        }
    }

    fn failed(error: String) -> Self {
        Self {
            success: false,
            skipped: false,
            channel: None,
            fallback_used: false,
            asset_generated: false,
            asset_delivered: false,
            recipient_phone: None,
            verification_code: None,
            error: Some(error),
        }
    }
}

/// Format an amount in kobo-denominated cents as naira.
fn format_amount(cents: i64) -> String {
    format!("\u{20a6}{}.{:02}", cents / 100, (cents % 100).abs())
}

/// Sends published receipts over the messaging channel with the text
/// fallback protocol, recording every attempt.
pub struct NotificationDispatcher {
    receipts: Arc<dyn ReceiptGenerator>,
    assets: Arc<dyn AssetPublisher>,
    channel: Arc<dyn MessagingChannel>,
    recorder: Arc<dyn DeliveryRecorder>,
}

impl NotificationDispatcher {
    pub fn new(
        receipts: Arc<dyn ReceiptGenerator>,
        assets: Arc<dyn AssetPublisher>,
        channel: Arc<dyn MessagingChannel>,
        recorder: Arc<dyn DeliveryRecorder>,
    ) -> Self {
        Self {
            receipts,
            assets,
            channel,
            recorder,
        }
    }

    /// Deliver a receipt for `record`. `quantity` is the aggregate item
    /// count shown on the receipt (group size for convention groups).
    /// `phone_override` carries the purchaser-group phone when grouping
    /// applied; otherwise the recipient is derived from the record.
    pub async fn dispatch(
        &self,
        service: ServiceType,
        record: &ServiceRecord,
        quantity: u32,
        phone_override: Option<&str>,
    ) -> NotificationResult {
        // Defensive: confirmation happens upstream, but never notify for
        // an unconfirmed record.
        if !record.confirmed {
            tracing::warn!(
                service = %service,
                record_id = %record.id,
                "Skipping dispatch for unconfirmed record"
            );
            return NotificationResult::skipped();
        }

        let raw_phone = phone_override
            .map(str::to_string)
            .or_else(|| record.reference_phone().map(str::to_string))
            .or_else(|| record.purchaser_phone.clone())
            .unwrap_or_default();

        let recipient = match normalize_phone(&raw_phone) {
            Ok(phone) => phone,
            Err(e) => {
                self.record_failure(
                    LogLevel::Warn,
                    "invalid-phone",
                    service,
                    record,
                    &mask_phone(&raw_phone),
                    &e.to_string(),
                    false,
                )
                .await;
                return NotificationResult::failed(e.to_string());
            }
        };
        let masked = mask_phone(&recipient);

        let code = verification_code(service, record);
        let description = if quantity > 1 {
            format!("{} ({} items)", service.label(), quantity)
        } else {
            service.label().to_string()
        };

        // Render the receipt.
        let request = ReceiptRequest {
            recipient_name: record.purchaser_name.clone(),
            recipient_phone: recipient.clone(),
            service_type: service,
            amount_cents: record.amount_cents,
            reference: record.payment_reference.clone(),
            description: description.clone(),
            verification_code: code.clone(),
        };
        let asset = match self.receipts.generate(&request).await {
            Ok(asset) => asset,
            Err(e) => {
                self.record_failure(
                    LogLevel::Error,
                    "receipt-generation",
                    service,
                    record,
                    &masked,
                    &e.to_string(),
                    false,
                )
                .await;
                let mut result = NotificationResult::failed(e.to_string());
                result.recipient_phone = Some(recipient);
                return result;
            }
        };

        // Publish to durable storage.
        let file_name = format!(
            "receipt-{}-{}.{}",
            service.as_str(),
            record.id.simple(),
            asset.extension()
        );
        let published = match self
            .assets
            .publish(&asset.bytes, &asset.content_type, &file_name)
            .await
        {
            Ok(published) => published,
            Err(e) => {
                self.record_failure(
                    LogLevel::Error,
                    "asset-publish",
                    service,
                    record,
                    &masked,
                    &e.to_string(),
                    false,
                )
                .await;
                let mut result = NotificationResult::failed(e.to_string());
                result.asset_generated = true;
                result.recipient_phone = Some(recipient);
                return result;
            }
        };

        let caption = format!(
            "Payment confirmed for your {}.\nAmount: {}\nReference: {}\nVerification code: {}\nPresent this receipt at check-in.",
            description,
            format_amount(record.amount_cents),
            record.payment_reference,
            code
        );

        let mut result = NotificationResult {
            success: false,
            skipped: false,
            channel: None,
            fallback_used: false,
            asset_generated: true,
            asset_delivered: false,
            recipient_phone: Some(recipient.clone()),
            verification_code: Some(code.clone()),
            error: None,
        };

        // Primary path: document message. A transport error counts as a
        // channel failure here and falls through to the text path.
        let document_sent = match self
            .channel
            .send_document(&DocumentMessage {
                to: recipient.clone(),
                text: caption.clone(),
                document_url: published.url.clone(),
                file_name,
            })
            .await
        {
            Ok(outcome) if outcome.success => true,
            Ok(outcome) => {
                tracing::warn!(
                    service = %service,
                    recipient = %masked,
                    detail = outcome.message.as_deref().unwrap_or("unknown"),
                    "Document send rejected, trying text fallback"
                );
                false
            }
            Err(e) => {
                tracing::warn!(
                    service = %service,
                    recipient = %masked,
                    error = %e,
                    "Document send transport error, trying text fallback"
                );
                false
            }
        };

        if document_sent {
            result.success = true;
            result.asset_delivered = true;
            result.channel = Some(DeliveryChannel::Document);
            self.recorder
                .record(
                    LogLevel::Info,
                    "dispatch",
                    "document-delivered",
                    "Receipt document delivered",
                    self.context(service, record, &masked),
                    false,
                )
                .await;
            return result;
        }

        // Fallback path: plain text with the durable URL.
        let fallback_text = format!(
            "We could not deliver your receipt document directly — sorry about that.\nYour payment for {} ({}, ref {}) is confirmed.\nVerification code: {}\nDownload your receipt here: {}",
            description,
            format_amount(record.amount_cents),
            record.payment_reference,
            code,
            published.url
        );

        let fallback_sent = matches!(
            self.channel
                .send_text(&TextMessage {
                    to: recipient.clone(),
                    text: fallback_text,
                })
                .await,
            Ok(outcome) if outcome.success
        );

        if fallback_sent {
            result.success = true;
            result.fallback_used = true;
            result.channel = Some(DeliveryChannel::TextFallback);
            self.recorder
                .record(
                    LogLevel::Warn,
                    "dispatch",
                    "fallback-used",
                    "Receipt delivered via text fallback",
                    self.context(service, record, &masked),
                    false,
                )
                .await;
            return result;
        }

        result.error = Some("document and text fallback sends both failed".to_string());
        self.recorder
            .record(
                LogLevel::Error,
                "dispatch",
                "delivery-failed",
                "Both document and text fallback delivery failed",
                self.context(service, record, &masked),
                true,
            )
            .await;
        result
    }

    fn context(
        &self,
        service: ServiceType,
        record: &ServiceRecord,
        masked_phone: &str,
    ) -> serde_json::Value {
        serde_json::json!({
            "service_type": service.as_str(),
            "reference": record.payment_reference,
            "record_id": record.id,
            "recipient": masked_phone,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn record_failure(
        &self,
        level: LogLevel,
        code: &str,
        service: ServiceType,
        record: &ServiceRecord,
        masked_phone: &str,
        error: &str,
        urgent: bool,
    ) {
        let mut context = self.context(service, record, masked_phone);
        if let Some(map) = context.as_object_mut() {
            map.insert("error".to_string(), serde_json::json!(error));
        }
        self.recorder
            .record(level, "dispatch", code, "Dispatch step failed", context, urgent)
            .await;
    }
}

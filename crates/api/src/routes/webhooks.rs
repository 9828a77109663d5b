//! Payment gateway webhook route
//!
//! The body is read as a raw string and parsed manually: malformed JSON is
//! an infrastructure fault (500), while every business-level outcome —
//! missing reference, unknown reference, failed delivery — returns 200
//! with a descriptive body. Gateway-side retries are reserved for genuine
//! infrastructure faults.

use axum::extract::State;
use axum::Json;
use convene_notify::{ReconciliationSummary, ServiceType};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub data: Option<WebhookData>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
}

fn no_reference_response() -> ReconciliationSummary {
    ReconciliationSummary {
        message: "no payment reference supplied".to_string(),
        success: false,
        service_type: None,
        reference: String::new(),
        record: None,
        notification: None,
        details: None,
        convention: None,
    }
}

pub async fn payment_webhook(
    State(state): State<AppState>,
    body: String,
) -> ApiResult<Json<ReconciliationSummary>> {
    let payload: WebhookPayload =
        serde_json::from_str(&body).map_err(|e| ApiError::MalformedBody(e.to_string()))?;

    let reference = payload
        .data
        .and_then(|d| d.reference)
        .unwrap_or_default();
    let reference = reference.trim();

    if reference.is_empty() {
        tracing::warn!("Webhook delivered without a payment reference");
        return Ok(Json(no_reference_response()));
    }

    tracing::info!(reference = %reference, "Processing payment webhook");
    let summary = state.notify.webhooks.handle(reference).await?;

    log_summary(&summary);
    Ok(Json(summary))
}

fn log_summary(summary: &ReconciliationSummary) {
    let service = summary
        .service_type
        .map(ServiceType::as_str)
        .unwrap_or("none");
    tracing::info!(
        reference = %summary.reference,
        service = service,
        success = summary.success,
        "Webhook processed"
    );
}

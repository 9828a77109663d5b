//! API error handling
//!
//! Business outcomes (not found, notification failed, duplicate) are never
//! errors here — the webhook route returns them as 200 bodies so the
//! gateway does not retry-storm. `ApiError` covers only infrastructure
//! faults, and every variant maps to HTTP 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use convene_notify::NotifyError;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error(transparent)]
    Notify(#[from] NotifyError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Webhook processing failed with infrastructure error");
        let body = Json(serde_json::json!({
            "success": false,
            "message": self.to_string(),
        }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

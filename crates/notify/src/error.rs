//! Error types for the notify crate

use convene_shared::PhoneError;
use thiserror::Error;

pub type NotifyResult<T> = Result<T, NotifyError>;

/// Errors surfaced by the reconciliation and dispatch pipeline.
///
/// Only `Database` and `Config` ever escape to the webhook route (they are
/// infrastructure faults). Everything else is caught inside the dispatcher
/// and converted into a failed `NotificationResult` so one recipient cannot
/// abort sibling deliveries.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    InvalidPhone(#[from] PhoneError),

    #[error("receipt generation failed: {0}")]
    ReceiptGeneration(String),

    #[error("asset publish failed: {0}")]
    AssetPublish(String),

    #[error("messaging transport error: {0}")]
    Transport(String),

    #[error("configuration error: {0}")]
    Config(String),
}

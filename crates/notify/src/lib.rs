// Test code patterns (expected in test files):
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Convene payment reconciliation & notification dispatch
//!
//! Processes payment-gateway callbacks for the event-registration platform:
//!
//! - **Reference resolution**: locate the owning record among six service
//!   types from a possibly-truncated payment reference, confirm it exactly
//!   once
//! - **Purchaser aggregation**: one notification per paying phone number
//!   for bulk purchases (dinner excepted: one receipt per guest)
//! - **Dispatch**: render a receipt, publish it to durable storage, send it
//!   as a document with a text-link fallback
//! - **Outcome recording**: every attempt logged for monitoring

pub mod aggregator;
pub mod assets;
pub mod channel;
pub mod dispatch;
pub mod error;
pub mod receipt;
pub mod recorder;
pub mod records;
pub mod resolver;
pub mod webhooks;

#[cfg(test)]
pub(crate) mod test_support;

pub use aggregator::{group_by_purchaser, PurchaserGroup};
pub use assets::{AssetPublisher, AssetStoreConfig, HttpAssetPublisher, PublishedAsset};
pub use channel::{
    DocumentMessage, HttpMessagingChannel, MessagingChannel, MessagingConfig, SendOutcome,
    TextMessage,
};
pub use dispatch::{DeliveryChannel, NotificationDispatcher, NotificationResult};
pub use error::{NotifyError, NotifyResult};
pub use receipt::{
    HttpReceiptRenderer, ReceiptAsset, ReceiptGenerator, ReceiptRequest, RendererConfig,
};
pub use recorder::{DeliveryRecorder, LogLevel, PgDeliveryRecorder};
pub use records::{ConfirmOutcome, PgRecordStore, RecordStore, ServiceRecord, ServiceType};
pub use resolver::{ReferenceResolver, ResolvedPayment};
pub use webhooks::{ConventionSummary, ReconciliationHandler, ReconciliationSummary};

use std::sync::Arc;

use sqlx::PgPool;

/// Main notification service wiring the real collaborators.
pub struct NotifyService {
    pub webhooks: ReconciliationHandler,
}

impl NotifyService {
    /// Build the service from environment variables (renderer, asset store,
    /// and messaging gateway endpoints).
    pub fn from_env(pool: PgPool) -> NotifyResult<Self> {
        let receipts: Arc<dyn ReceiptGenerator> = Arc::new(HttpReceiptRenderer::from_env()?);
        let assets: Arc<dyn AssetPublisher> = Arc::new(HttpAssetPublisher::from_env()?);
        let channel: Arc<dyn MessagingChannel> = Arc::new(HttpMessagingChannel::from_env()?);
        let recorder: Arc<dyn DeliveryRecorder> =
            Arc::new(PgDeliveryRecorder::new(pool.clone()));

        let stores = ServiceType::RESOLUTION_ORDER
            .into_iter()
            .map(|service| {
                (
                    service,
                    Arc::new(PgRecordStore::new(pool.clone(), service)) as Arc<dyn RecordStore>,
                )
            })
            .collect();

        let resolver = ReferenceResolver::new(stores);
        let dispatcher = NotificationDispatcher::new(receipts, assets, channel, recorder);

        Ok(Self {
            webhooks: ReconciliationHandler::new(resolver, dispatcher),
        })
    }
}

//! Payment webhook reconciliation
//!
//! Orchestrates one reconciliation attempt: resolve the inbound reference,
//! branch per service type (convention groups by purchaser, dinner fans out
//! per guest, everything else is a single dispatch), and assemble the
//! response summary. Dispatcher failures are data; only infrastructure
//! errors (database) propagate out of `handle`.

use serde::Serialize;

use crate::aggregator::group_by_purchaser;
use crate::dispatch::{NotificationDispatcher, NotificationResult};
use crate::records::{ServiceRecord, ServiceType};
use crate::resolver::ReferenceResolver;
use crate::NotifyResult;

/// Aggregate counts for a convention (grouped) reconciliation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConventionSummary {
    pub total_registrations: usize,
    pub unique_phones: usize,
    pub successful_phones: usize,
}

/// Business-level outcome of one webhook delivery. Serialized directly
/// into the HTTP response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationSummary {
    pub message: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_type: Option<ServiceType>,
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<ServiceRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<NotificationResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convention: Option<ConventionSummary>,
}

impl ReconciliationSummary {
    fn not_found(reference: &str) -> Self {
        Self {
            message: "no service record matches this payment reference".to_string(),
            success: false,
            service_type: None,
            reference: reference.to_string(),
            record: None,
            notification: None,
            details: None,
            convention: None,
        }
    }
}

/// Handles verified "payment succeeded" callbacks end to end.
pub struct ReconciliationHandler {
    resolver: ReferenceResolver,
    dispatcher: NotificationDispatcher,
}

impl ReconciliationHandler {
    pub fn new(resolver: ReferenceResolver, dispatcher: NotificationDispatcher) -> Self {
        Self {
            resolver,
            dispatcher,
        }
    }

    /// Run one reconciliation attempt for an inbound reference.
    pub async fn handle(&self, reference: &str) -> NotifyResult<ReconciliationSummary> {
        let Some(resolved) = self.resolver.resolve(reference).await? else {
            return Ok(ReconciliationSummary::not_found(reference));
        };

        let service = resolved.service;

        // Duplicate webhook: the records were confirmed by an earlier
        // delivery, which already dispatched notifications. Acknowledge
        // without re-sending.
        if !resolved.newly_confirmed {
            tracing::info!(
                service = %service,
                reference = %reference,
                "Duplicate webhook delivery, payment already reconciled"
            );
            return Ok(ReconciliationSummary {
                message: "payment already reconciled; notifications were previously dispatched"
                    .to_string(),
                success: true,
                service_type: Some(service),
                reference: reference.to_string(),
                record: resolved.records.into_iter().next(),
                notification: None,
                details: None,
                convention: None,
            });
        }

        match service {
            ServiceType::Convention => self.handle_convention(reference, resolved.records).await,
            ServiceType::Dinner => self.handle_dinner(reference, resolved.records).await,
            _ => self.handle_single(service, reference, resolved.records).await,
        }
    }

    /// Convention: one notification per purchaser group, with the group
    /// size as the aggregate item count.
    async fn handle_convention(
        &self,
        reference: &str,
        records: Vec<ServiceRecord>,
    ) -> NotifyResult<ReconciliationSummary> {
        let total_registrations = records.len();
        let groups = group_by_purchaser(records);
        let unique_phones = groups.len();

        let mut results = Vec::with_capacity(groups.len());
        // Sequential sends: channel rate limits stay respected and logs
        // stay attributable.
        for group in &groups {
            let result = self
                .dispatcher
                .dispatch(
                    ServiceType::Convention,
                    group.primary(),
                    group.records.len() as u32,
                    Some(&group.phone),
                )
                .await;
            results.push(result);
        }

        let successful_phones = results.iter().filter(|r| r.success).count();

        Ok(ReconciliationSummary {
            message: format!(
                "confirmed {total_registrations} convention registration(s) across {unique_phones} purchaser(s)"
            ),
            success: true,
            service_type: Some(ServiceType::Convention),
            reference: reference.to_string(),
            record: None,
            notification: None,
            details: Some(results),
            convention: Some(ConventionSummary {
                total_registrations,
                unique_phones,
                successful_phones,
            }),
        })
    }

    /// Dinner: one receipt per guest record, no grouping. One ticket =
    /// one receipt.
    async fn handle_dinner(
        &self,
        reference: &str,
        records: Vec<ServiceRecord>,
    ) -> NotifyResult<ReconciliationSummary> {
        let mut results = Vec::with_capacity(records.len());
        for record in &records {
            let result = self
                .dispatcher
                .dispatch(ServiceType::Dinner, record, 1, None)
                .await;
            results.push(result);
        }

        let delivered = results.iter().filter(|r| r.success).count();

        Ok(ReconciliationSummary {
            message: format!(
                "confirmed dinner reservation; {delivered} of {} guest receipt(s) delivered",
                results.len()
            ),
            success: true,
            service_type: Some(ServiceType::Dinner),
            reference: reference.to_string(),
            record: None,
            notification: None,
            details: Some(results),
            convention: None,
        })
    }

    /// Default branch: exactly one record, one dispatch.
    async fn handle_single(
        &self,
        service: ServiceType,
        reference: &str,
        records: Vec<ServiceRecord>,
    ) -> NotifyResult<ReconciliationSummary> {
        let Some(record) = records.into_iter().next() else {
            // Resolver contract guarantees at least one record; treat an
            // empty set as not found rather than panicking.
            return Ok(ReconciliationSummary::not_found(reference));
        };

        let quantity = record.quantity();
        let notification = self
            .dispatcher
            .dispatch(service, &record, quantity, None)
            .await;

        Ok(ReconciliationSummary {
            message: format!("confirmed {}", service.label()),
            success: true,
            service_type: Some(service),
            reference: reference.to_string(),
            record: Some(record),
            notification: Some(notification),
            details: None,
            convention: None,
        })
    }
}

//! Reference resolution
//!
//! The gateway echoes back an opaque, possibly truncated payment reference.
//! The resolver probes each service type's record store in a fixed priority
//! order until one of them owns the reference, then confirms the matched
//! record(s) exactly once.

use std::sync::Arc;

use crate::error::NotifyResult;
use crate::records::{RecordStore, ServiceRecord, ServiceType};

/// A resolved and confirmed payment.
#[derive(Debug)]
pub struct ResolvedPayment {
    pub service: ServiceType,
    /// Confirmed record(s). More than one only for bulk-confirm types.
    pub records: Vec<ServiceRecord>,
    /// False when this webhook delivery was a duplicate: every matched
    /// record was already confirmed before this call.
    pub newly_confirmed: bool,
}

/// Probes service types in [`ServiceType::RESOLUTION_ORDER`] until a record
/// store claims the reference. First match wins; service prefixes are
/// assumed not to collide across types.
pub struct ReferenceResolver {
    stores: Vec<(ServiceType, Arc<dyn RecordStore>)>,
}

impl ReferenceResolver {
    /// Build a resolver over an explicit (type, store) list. The list order
    /// is the probe order.
    pub fn new(stores: Vec<(ServiceType, Arc<dyn RecordStore>)>) -> Self {
        Self { stores }
    }

    /// Resolve and confirm a raw reference. `Ok(None)` means no service
    /// type owns it — a valid terminal state, not an error.
    pub async fn resolve(&self, raw_reference: &str) -> NotifyResult<Option<ResolvedPayment>> {
        let reference = raw_reference.trim();
        if reference.is_empty() {
            return Ok(None);
        }

        for (service, store) in &self.stores {
            if service.bulk_confirm() {
                let matched = store.find_many_by_reference_prefix(reference).await?;
                if matched.is_empty() {
                    continue;
                }
                let flipped = store.confirm_many_by_reference_prefix(reference).await?;
                // Re-read so the returned records carry confirmed = true.
                let records = store.find_many_by_reference_prefix(reference).await?;

                tracing::info!(
                    service = %service,
                    reference = %reference,
                    records = records.len(),
                    flipped = flipped,
                    "Payment reference resolved (bulk)"
                );

                return Ok(Some(ResolvedPayment {
                    service: *service,
                    records,
                    newly_confirmed: flipped > 0,
                }));
            }

            let Some(record) = store.find_by_reference_prefix(reference).await? else {
                continue;
            };
            // Confirm by the full stored reference, not the truncated
            // inbound value.
            let Some(outcome) = store.confirm_by_reference(&record.payment_reference).await?
            else {
                continue;
            };

            tracing::info!(
                service = %service,
                reference = %reference,
                newly_confirmed = outcome.newly_confirmed,
                "Payment reference resolved"
            );

            return Ok(Some(ResolvedPayment {
                service: *service,
                records: vec![outcome.record],
                newly_confirmed: outcome.newly_confirmed,
            }));
        }

        tracing::warn!(reference = %reference, "No service record matches payment reference");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{unconfirmed_record, MemoryRecordStore};

    fn resolver_for(
        entries: Vec<(ServiceType, Arc<MemoryRecordStore>)>,
    ) -> ReferenceResolver {
        ReferenceResolver::new(
            entries
                .into_iter()
                .map(|(s, store)| (s, store as Arc<dyn RecordStore>))
                .collect(),
        )
    }

    #[tokio::test]
    async fn truncated_reference_resolves_to_stored_record() {
        let store = Arc::new(MemoryRecordStore::default());
        store.insert(unconfirmed_record("DINNER_1700000000000_08012345678"));

        let resolver = resolver_for(vec![(ServiceType::Dinner, store)]);
        let resolved = resolver
            .resolve("DINNER_1700000000000")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(resolved.service, ServiceType::Dinner);
        assert_eq!(resolved.records.len(), 1);
        assert_eq!(
            resolved.records[0].payment_reference,
            "DINNER_1700000000000_08012345678"
        );
        assert!(resolved.records[0].confirmed);
        assert!(resolved.newly_confirmed);
    }

    #[tokio::test]
    async fn unknown_reference_is_not_found_not_an_error() {
        let store = Arc::new(MemoryRecordStore::default());
        let resolver = resolver_for(vec![(ServiceType::Donation, store)]);

        let resolved = resolver.resolve("DONATION_999").await.unwrap();
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn empty_reference_is_not_found() {
        let resolver = resolver_for(vec![]);
        assert!(resolver.resolve("   ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn second_resolve_is_idempotent_and_flags_duplicate() {
        let store = Arc::new(MemoryRecordStore::default());
        store.insert(unconfirmed_record("BROCH_1700_08011112222"));
        let resolver = resolver_for(vec![(ServiceType::Brochure, store)]);

        let first = resolver.resolve("BROCH_1700").await.unwrap().unwrap();
        assert!(first.newly_confirmed);

        let second = resolver.resolve("BROCH_1700").await.unwrap().unwrap();
        assert!(!second.newly_confirmed);
        assert!(second.records[0].confirmed);
    }

    #[tokio::test]
    async fn first_match_wins_in_probe_order() {
        let dinner = Arc::new(MemoryRecordStore::default());
        dinner.insert(unconfirmed_record("SHARED_1_08011112222"));
        let convention = Arc::new(MemoryRecordStore::default());
        convention.insert(unconfirmed_record("SHARED_1_08033334444"));

        let resolver = resolver_for(vec![
            (ServiceType::Dinner, dinner),
            (ServiceType::Convention, convention.clone()),
        ]);

        let resolved = resolver.resolve("SHARED_1").await.unwrap().unwrap();
        assert_eq!(resolved.service, ServiceType::Dinner);
        // Convention's record was never confirmed.
        assert!(!convention.all().iter().any(|r| r.confirmed));
    }

    #[tokio::test]
    async fn bulk_type_confirms_every_record_sharing_the_prefix() {
        let store = Arc::new(MemoryRecordStore::default());
        store.insert(unconfirmed_record("CONV_1700_08011112222"));
        store.insert(unconfirmed_record("CONV_1700_08011112222"));
        store.insert(unconfirmed_record("CONV_1700_08033334444"));
        // Unrelated reference stays untouched.
        store.insert(unconfirmed_record("CONV_9999_08099990000"));

        let resolver = resolver_for(vec![(ServiceType::Convention, store.clone())]);
        let resolved = resolver.resolve("CONV_1700").await.unwrap().unwrap();

        assert_eq!(resolved.records.len(), 3);
        assert!(resolved.records.iter().all(|r| r.confirmed));
        assert!(resolved.newly_confirmed);

        let untouched = store
            .all()
            .into_iter()
            .find(|r| r.payment_reference == "CONV_9999_08099990000")
            .unwrap();
        assert!(!untouched.confirmed);
    }
}

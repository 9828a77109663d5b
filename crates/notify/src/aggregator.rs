//! Purchaser aggregation
//!
//! A bulk purchase creates several records under one payment reference. To
//! avoid spamming the purchaser, notifications are grouped by the paying
//! phone number: one receipt per purchaser, with an aggregate item count.
//! Dinner is exempt — the orchestration layer sends one receipt per guest
//! record instead of calling this at all.

use crate::records::ServiceRecord;

/// Records attributable to one paying phone number.
#[derive(Debug)]
pub struct PurchaserGroup {
    /// Raw (not yet normalized) phone identity for the group.
    pub phone: String,
    pub records: Vec<ServiceRecord>,
}

impl PurchaserGroup {
    /// Template record for the group's single notification.
    pub fn primary(&self) -> &ServiceRecord {
        &self.records[0]
    }
}

/// Derive the purchaser identity for a record: the phone embedded in the
/// stored reference suffix, falling back to the profile phone.
fn purchaser_identity(record: &ServiceRecord) -> Option<String> {
    record
        .reference_phone()
        .map(str::to_string)
        .or_else(|| record.purchaser_phone.clone())
        .filter(|p| !p.trim().is_empty())
}

/// Group records by derived purchaser identity, preserving first-seen
/// order. Records with no resolvable phone are dropped with a warning;
/// they must not take down the batch.
pub fn group_by_purchaser(records: Vec<ServiceRecord>) -> Vec<PurchaserGroup> {
    let mut groups: Vec<PurchaserGroup> = Vec::new();

    for record in records {
        let Some(phone) = purchaser_identity(&record) else {
            tracing::warn!(
                record_id = %record.id,
                reference = %record.payment_reference,
                "Dropping record with no resolvable purchaser phone"
            );
            continue;
        };

        match groups.iter_mut().find(|g| g.phone == phone) {
            Some(group) => group.records.push(record),
            None => groups.push(PurchaserGroup {
                phone,
                records: vec![record],
            }),
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::unconfirmed_record;

    #[test]
    fn one_phone_means_one_group() {
        let records = vec![
            unconfirmed_record("CONV_1_08011112222"),
            unconfirmed_record("CONV_1_08011112222"),
            unconfirmed_record("CONV_1_08011112222"),
            unconfirmed_record("CONV_1_08011112222"),
        ];

        let groups = group_by_purchaser(records);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].records.len(), 4);
        assert_eq!(groups[0].phone, "08011112222");
    }

    #[test]
    fn two_phones_mean_two_groups() {
        let records = vec![
            unconfirmed_record("CONV_1_08011112222"),
            unconfirmed_record("CONV_1_08033334444"),
            unconfirmed_record("CONV_1_08011112222"),
            unconfirmed_record("CONV_1_08033334444"),
        ];

        let groups = group_by_purchaser(records);
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| g.records.len() == 2));
    }

    #[test]
    fn profile_phone_is_the_fallback_identity() {
        // Truncated reference carries no phone suffix.
        let mut record = unconfirmed_record("CONV_1700000000000");
        record.purchaser_phone = Some("08055556666".to_string());

        let groups = group_by_purchaser(vec![record]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].phone, "08055556666");
    }

    #[test]
    fn unresolvable_phone_is_dropped_without_panicking() {
        let no_phone = unconfirmed_record("CONV_1700000000000");
        let with_phone = unconfirmed_record("CONV_1_08011112222");

        let groups = group_by_purchaser(vec![no_phone, with_phone]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].phone, "08011112222");
    }
}

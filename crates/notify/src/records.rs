//! Service record types and store adapters
//!
//! Six independent service types persist checkout records in their own
//! tables. All of them are normalized here into one canonical
//! [`ServiceRecord`] shape so the rest of the pipeline never has to guess
//! which field means "confirmed" or where the purchaser phone lives.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::NotifyResult;

/// The service types a payment reference can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Convention,
    Dinner,
    Accommodation,
    Brochure,
    Goodwill,
    Donation,
}

impl ServiceType {
    /// Resolution probe order. Dinner first: it has the most complex
    /// fan-out and the most traffic. Convention last.
    pub const RESOLUTION_ORDER: [ServiceType; 6] = [
        ServiceType::Dinner,
        ServiceType::Accommodation,
        ServiceType::Brochure,
        ServiceType::Goodwill,
        ServiceType::Donation,
        ServiceType::Convention,
    ];

    /// Reference prefix used when references are generated at checkout.
    pub fn reference_prefix(self) -> &'static str {
        match self {
            ServiceType::Convention => "CONV",
            ServiceType::Dinner => "DINNER",
            ServiceType::Accommodation => "ACCOM",
            ServiceType::Brochure => "BROCH",
            ServiceType::Goodwill => "GOODWILL",
            ServiceType::Donation => "DONATION",
        }
    }

    /// Backing table for this service's records.
    pub fn table(self) -> &'static str {
        match self {
            ServiceType::Convention => "convention_registrations",
            ServiceType::Dinner => "dinner_reservations",
            ServiceType::Accommodation => "accommodation_bookings",
            ServiceType::Brochure => "brochure_orders",
            ServiceType::Goodwill => "goodwill_messages",
            ServiceType::Donation => "donations",
        }
    }

    /// Human label used in receipts and messages.
    pub fn label(self) -> &'static str {
        match self {
            ServiceType::Convention => "convention registration",
            ServiceType::Dinner => "dinner reservation",
            ServiceType::Accommodation => "accommodation booking",
            ServiceType::Brochure => "brochure order",
            ServiceType::Goodwill => "goodwill message",
            ServiceType::Donation => "donation",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceType::Convention => "convention",
            ServiceType::Dinner => "dinner",
            ServiceType::Accommodation => "accommodation",
            ServiceType::Brochure => "brochure",
            ServiceType::Goodwill => "goodwill",
            ServiceType::Donation => "donation",
        }
    }

    /// Bulk purchases share one reference across several rows for these
    /// types, so confirmation must flip every row with the prefix.
    pub fn bulk_confirm(self) -> bool {
        matches!(self, ServiceType::Convention | ServiceType::Dinner)
    }

    /// Dinner sends one receipt per guest record ("one ticket = one
    /// receipt"), bypassing purchaser grouping.
    pub fn per_guest_receipts(self) -> bool {
        matches!(self, ServiceType::Dinner)
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical record shape shared by all six service tables.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ServiceRecord {
    pub id: Uuid,
    pub payment_reference: String,
    pub confirmed: bool,
    pub amount_cents: i64,
    pub purchaser_name: String,
    pub purchaser_email: Option<String>,
    pub purchaser_phone: Option<String>,
    /// Check-in verification code, if one was issued at checkout.
    pub verification_code: Option<String>,
    /// Service-specific payload: guest name, quantity, dates, message text.
    pub details: serde_json::Value,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub confirmed_at: Option<OffsetDateTime>,
}

impl ServiceRecord {
    /// Phone number embedded in the stored reference suffix
    /// (`<PREFIX>_<epoch_millis>_<phone>`), if present.
    pub fn reference_phone(&self) -> Option<&str> {
        let mut parts = self.payment_reference.splitn(3, '_');
        let _prefix = parts.next()?;
        let _millis = parts.next()?;
        let phone = parts.next()?;
        if phone.len() >= 7 && phone.chars().all(|c| c.is_ascii_digit() || c == '+') {
            Some(phone)
        } else {
            None
        }
    }

    /// Item count for this record (`details.quantity`, defaulting to 1).
    pub fn quantity(&self) -> u32 {
        self.details
            .get("quantity")
            .and_then(|q| q.as_u64())
            .map(|q| q as u32)
            .unwrap_or(1)
    }
}

/// Outcome of a single-record confirmation.
pub struct ConfirmOutcome {
    pub record: ServiceRecord,
    /// True only for the call that flipped the record from unconfirmed to
    /// confirmed. A duplicate webhook sees `false` and must not re-notify.
    pub newly_confirmed: bool,
}

/// Persistence operations for one service type's records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// First record whose stored reference starts with `prefix`.
    async fn find_by_reference_prefix(&self, prefix: &str)
        -> NotifyResult<Option<ServiceRecord>>;

    /// All records whose stored reference starts with `prefix`.
    async fn find_many_by_reference_prefix(&self, prefix: &str)
        -> NotifyResult<Vec<ServiceRecord>>;

    /// Idempotently confirm one record by its full stored reference.
    async fn confirm_by_reference(&self, reference: &str) -> NotifyResult<Option<ConfirmOutcome>>;

    /// Confirm every record sharing the reference prefix. Returns the
    /// number of rows actually flipped (0 when already confirmed).
    async fn confirm_many_by_reference_prefix(&self, prefix: &str) -> NotifyResult<u64>;
}

const RECORD_COLUMNS: &str = "id, payment_reference, confirmed, amount_cents, purchaser_name, \
     purchaser_email, purchaser_phone, verification_code, details, created_at, confirmed_at";

/// Postgres-backed store for one service type.
///
/// Prefix matching uses `starts_with()` rather than `LIKE`: references
/// contain underscores, which are `LIKE` wildcards.
pub struct PgRecordStore {
    pool: PgPool,
    service: ServiceType,
}

impl PgRecordStore {
    pub fn new(pool: PgPool, service: ServiceType) -> Self {
        Self { pool, service }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn find_by_reference_prefix(
        &self,
        prefix: &str,
    ) -> NotifyResult<Option<ServiceRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM {} WHERE starts_with(payment_reference, $1) \
             ORDER BY created_at LIMIT 1",
            self.service.table()
        );
        let record = sqlx::query_as::<_, ServiceRecord>(&sql)
            .bind(prefix)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn find_many_by_reference_prefix(
        &self,
        prefix: &str,
    ) -> NotifyResult<Vec<ServiceRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM {} WHERE starts_with(payment_reference, $1) \
             ORDER BY created_at",
            self.service.table()
        );
        let records = sqlx::query_as::<_, ServiceRecord>(&sql)
            .bind(prefix)
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    async fn confirm_by_reference(
        &self,
        reference: &str,
    ) -> NotifyResult<Option<ConfirmOutcome>> {
        // Conditional update: only one concurrent duplicate webhook can win
        // the flip. The loser falls through to the plain select and reports
        // newly_confirmed = false.
        let sql = format!(
            "UPDATE {} SET confirmed = TRUE, confirmed_at = NOW() \
             WHERE payment_reference = $1 AND NOT confirmed \
             RETURNING {RECORD_COLUMNS}",
            self.service.table()
        );
        let flipped = sqlx::query_as::<_, ServiceRecord>(&sql)
            .bind(reference)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(record) = flipped {
            return Ok(Some(ConfirmOutcome {
                record,
                newly_confirmed: true,
            }));
        }

        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM {} WHERE payment_reference = $1 LIMIT 1",
            self.service.table()
        );
        let existing = sqlx::query_as::<_, ServiceRecord>(&sql)
            .bind(reference)
            .fetch_optional(&self.pool)
            .await?;

        Ok(existing.map(|record| ConfirmOutcome {
            record,
            newly_confirmed: false,
        }))
    }

    async fn confirm_many_by_reference_prefix(&self, prefix: &str) -> NotifyResult<u64> {
        let sql = format!(
            "UPDATE {} SET confirmed = TRUE, confirmed_at = NOW() \
             WHERE starts_with(payment_reference, $1) AND NOT confirmed",
            self.service.table()
        );
        let result = sqlx::query(&sql).bind(prefix).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

//! Delivery outcome recording
//!
//! Every dispatch attempt (success, fallback-used, failure) lands in the
//! append-only `delivery_log` table for monitoring and alerting. Recording
//! is fire-and-forget: a recorder failure is logged and swallowed, never
//! propagated into the dispatch path.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;

/// Severity of a delivery log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[async_trait]
pub trait DeliveryRecorder: Send + Sync {
    /// Record one dispatch attempt. Must never fail upward.
    async fn record(
        &self,
        level: LogLevel,
        category: &str,
        code: &str,
        message: &str,
        context: serde_json::Value,
        urgent: bool,
    );
}

/// Postgres-backed recorder writing to `delivery_log`.
pub struct PgDeliveryRecorder {
    pool: PgPool,
}

impl PgDeliveryRecorder {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeliveryRecorder for PgDeliveryRecorder {
    async fn record(
        &self,
        level: LogLevel,
        category: &str,
        code: &str,
        message: &str,
        context: serde_json::Value,
        urgent: bool,
    ) {
        // Mirror into tracing so operators see attempts without a DB query.
        match level {
            LogLevel::Info => {
                tracing::info!(category = category, code = code, context = %context, "{message}")
            }
            LogLevel::Warn => {
                tracing::warn!(category = category, code = code, context = %context, "{message}")
            }
            LogLevel::Error => {
                tracing::error!(category = category, code = code, urgent = urgent, context = %context, "{message}")
            }
        }

        let result = sqlx::query(
            r#"
            INSERT INTO delivery_log (level, category, code, message, context, urgent)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(level.as_str())
        .bind(category)
        .bind(code)
        .bind(message)
        .bind(&context)
        .bind(urgent)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::error!(
                error = %e,
                category = category,
                code = code,
                "Failed to persist delivery log entry"
            );
        }
    }
}

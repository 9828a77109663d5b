//! In-memory fakes for the pipeline's trait seams, shared across test
//! modules.

#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::assets::{AssetPublisher, PublishedAsset};
use crate::channel::{DocumentMessage, MessagingChannel, SendOutcome, TextMessage};
use crate::error::{NotifyError, NotifyResult};
use crate::receipt::{ReceiptAsset, ReceiptGenerator, ReceiptRequest};
use crate::recorder::{DeliveryRecorder, LogLevel};
use crate::records::{ConfirmOutcome, RecordStore, ServiceRecord};

pub(crate) fn record_with_reference(reference: &str) -> ServiceRecord {
    ServiceRecord {
        id: Uuid::new_v4(),
        payment_reference: reference.to_string(),
        confirmed: false,
        amount_cents: 500_000,
        purchaser_name: "Ada Obi".to_string(),
        purchaser_email: Some("ada@example.com".to_string()),
        purchaser_phone: None,
        verification_code: None,
        details: serde_json::json!({}),
        created_at: OffsetDateTime::now_utc(),
        confirmed_at: None,
    }
}

pub(crate) fn unconfirmed_record(reference: &str) -> ServiceRecord {
    record_with_reference(reference)
}

pub(crate) fn confirmed_record(reference: &str) -> ServiceRecord {
    let mut record = record_with_reference(reference);
    record.confirmed = true;
    record.confirmed_at = Some(OffsetDateTime::now_utc());
    record
}

/// In-memory record store with the same prefix/confirm semantics as the
/// Postgres adapter.
#[derive(Default)]
pub(crate) struct MemoryRecordStore {
    records: Mutex<Vec<ServiceRecord>>,
}

impl MemoryRecordStore {
    pub(crate) fn insert(&self, record: ServiceRecord) {
        self.records.lock().unwrap().push(record);
    }

    pub(crate) fn all(&self) -> Vec<ServiceRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn find_by_reference_prefix(
        &self,
        prefix: &str,
    ) -> NotifyResult<Option<ServiceRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.payment_reference.starts_with(prefix))
            .cloned())
    }

    async fn find_many_by_reference_prefix(
        &self,
        prefix: &str,
    ) -> NotifyResult<Vec<ServiceRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.payment_reference.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn confirm_by_reference(
        &self,
        reference: &str,
    ) -> NotifyResult<Option<ConfirmOutcome>> {
        let mut records = self.records.lock().unwrap();
        let Some(record) = records
            .iter_mut()
            .find(|r| r.payment_reference == reference)
        else {
            return Ok(None);
        };
        let newly_confirmed = !record.confirmed;
        record.confirmed = true;
        if record.confirmed_at.is_none() {
            record.confirmed_at = Some(OffsetDateTime::now_utc());
        }
        Ok(Some(ConfirmOutcome {
            record: record.clone(),
            newly_confirmed,
        }))
    }

    async fn confirm_many_by_reference_prefix(&self, prefix: &str) -> NotifyResult<u64> {
        let mut records = self.records.lock().unwrap();
        let mut flipped = 0;
        for record in records
            .iter_mut()
            .filter(|r| r.payment_reference.starts_with(prefix))
        {
            if !record.confirmed {
                record.confirmed = true;
                record.confirmed_at = Some(OffsetDateTime::now_utc());
                flipped += 1;
            }
        }
        Ok(flipped)
    }
}

/// Receipt generator that counts invocations and captures requests.
#[derive(Default)]
pub(crate) struct CountingReceipts {
    fail: bool,
    count: AtomicUsize,
    requests: Mutex<Vec<ReceiptRequest>>,
}

impl CountingReceipts {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub(crate) fn last_request(&self) -> Option<ReceiptRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ReceiptGenerator for CountingReceipts {
    async fn generate(&self, request: &ReceiptRequest) -> NotifyResult<ReceiptAsset> {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(NotifyError::ReceiptGeneration(
                "renderer unavailable".to_string(),
            ));
        }
        Ok(ReceiptAsset {
            bytes: b"png".to_vec(),
            content_type: "image/png".to_string(),
        })
    }
}

/// Publisher returning stable test URLs.
#[derive(Default)]
pub(crate) struct MemoryPublisher {
    pub(crate) fail: bool,
}

#[async_trait]
impl AssetPublisher for MemoryPublisher {
    async fn publish(
        &self,
        _bytes: &[u8],
        _content_type: &str,
        suggested_name: &str,
    ) -> NotifyResult<PublishedAsset> {
        if self.fail {
            return Err(NotifyError::AssetPublish("store unavailable".to_string()));
        }
        Ok(PublishedAsset {
            url: format!("https://assets.test/{suggested_name}"),
        })
    }
}

/// Messaging channel with scripted per-path outcomes.
pub(crate) struct ScriptedChannel {
    document_success: bool,
    text_success: bool,
    documents: Mutex<Vec<DocumentMessage>>,
    texts: Mutex<Vec<TextMessage>>,
}

impl ScriptedChannel {
    pub(crate) fn new(document_success: bool, text_success: bool) -> Self {
        Self {
            document_success,
            text_success,
            documents: Mutex::new(Vec::new()),
            texts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn document_sends(&self) -> Vec<DocumentMessage> {
        self.documents.lock().unwrap().clone()
    }

    pub(crate) fn text_sends(&self) -> Vec<TextMessage> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingChannel for ScriptedChannel {
    async fn send_document(&self, message: &DocumentMessage) -> NotifyResult<SendOutcome> {
        self.documents.lock().unwrap().push(message.clone());
        Ok(SendOutcome {
            success: self.document_success,
            message: (!self.document_success).then(|| "channel rejected".to_string()),
            data: None,
        })
    }

    async fn send_text(&self, message: &TextMessage) -> NotifyResult<SendOutcome> {
        self.texts.lock().unwrap().push(message.clone());
        Ok(SendOutcome {
            success: self.text_success,
            message: (!self.text_success).then(|| "channel rejected".to_string()),
            data: None,
        })
    }
}

/// Recorder capturing entries in memory.
#[derive(Default)]
pub(crate) struct MemoryRecorder {
    entries: Mutex<Vec<(LogLevel, String, String)>>,
}

impl MemoryRecorder {
    #[allow(dead_code)]
    pub(crate) fn entries(&self) -> Vec<(LogLevel, String, String)> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeliveryRecorder for MemoryRecorder {
    async fn record(
        &self,
        level: LogLevel,
        _category: &str,
        code: &str,
        message: &str,
        _context: serde_json::Value,
        _urgent: bool,
    ) {
        self.entries
            .lock()
            .unwrap()
            .push((level, code.to_string(), message.to_string()));
    }
}

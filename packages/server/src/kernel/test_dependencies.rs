// TestDependencies - mock implementations for testing
//
// Recording mocks that can be injected as ServerDeps for pipeline and
// persistence tests. Each mock counts its calls so ordering properties
// (blob before header before items) can be asserted.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::common::OwnerId;
use crate::domains::receipts::capture::CaptureSource;
use crate::domains::receipts::models::{NewReceipt, Receipt, ReceiptItem};
use crate::domains::receipts::recognition::{LineItem, RecognitionResult};

use super::recognition_client::RecognitionError;
use super::telemetry::TelemetryEvent;
use super::traits::{
    BaseBlobStore, BaseReceiptStore, BaseRecognitionService, BaseTelemetrySink,
};

// =============================================================================
// Mock Recognition Service
// =============================================================================

pub struct MockRecognitionService {
    response: Result<RecognitionResult, RecognitionError>,
    calls: Mutex<u32>,
    /// When set, `analyze` waits for a notification before responding, so
    /// tests can hold the pipeline in `Analyzing`.
    gate: Option<Arc<Notify>>,
}

impl MockRecognitionService {
    pub fn with_result(result: RecognitionResult) -> Self {
        Self {
            response: Ok(result),
            calls: Mutex::new(0),
            gate: None,
        }
    }

    pub fn with_error(error: RecognitionError) -> Self {
        Self {
            response: Err(error),
            calls: Mutex::new(0),
            gate: None,
        }
    }

    pub fn gated(result: RecognitionResult, gate: Arc<Notify>) -> Self {
        Self {
            response: Ok(result),
            calls: Mutex::new(0),
            gate: Some(gate),
        }
    }

    pub fn call_count(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl BaseRecognitionService for MockRecognitionService {
    async fn analyze(
        &self,
        _capture: &CaptureSource,
    ) -> Result<RecognitionResult, RecognitionError> {
        *self.calls.lock().unwrap() += 1;
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.response.clone()
    }
}

// =============================================================================
// Mock Blob Store
// =============================================================================

pub struct MockBlobStore {
    puts: Mutex<Vec<String>>,
    fail: bool,
    /// When set, `put` waits for a notification before storing, so tests can
    /// hold the pipeline in its persistence phase.
    gate: Option<Arc<Notify>>,
}

impl MockBlobStore {
    pub fn new() -> Self {
        Self {
            puts: Mutex::new(Vec::new()),
            fail: false,
            gate: None,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new()
        }
    }

    pub fn put_count(&self) -> usize {
        self.puts.lock().unwrap().len()
    }

    pub fn keys(&self) -> Vec<String> {
        self.puts.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseBlobStore for MockBlobStore {
    async fn put(&self, key: &str, _bytes: &[u8], _content_type: &str) -> Result<()> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail {
            bail!("blob store unavailable");
        }
        self.puts.lock().unwrap().push(key.to_string());
        Ok(())
    }
}

// =============================================================================
// Mock Receipt Store
// =============================================================================

pub struct MockReceiptStore {
    next_id: i64,
    fail_header: bool,
    fail_items: bool,
    header_calls: Mutex<u32>,
    item_calls: Mutex<u32>,
    receipts: Mutex<Vec<Receipt>>,
    items: Mutex<Vec<ReceiptItem>>,
}

impl MockReceiptStore {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            fail_header: false,
            fail_items: false,
            header_calls: Mutex::new(0),
            item_calls: Mutex::new(0),
            receipts: Mutex::new(Vec::new()),
            items: Mutex::new(Vec::new()),
        }
    }

    pub fn with_next_id(mut self, id: i64) -> Self {
        self.next_id = id;
        self
    }

    pub fn failing_header() -> Self {
        Self {
            fail_header: true,
            ..Self::new()
        }
    }

    pub fn failing_items(mut self) -> Self {
        self.fail_items = true;
        self
    }

    /// Seed a receipt, e.g. for export-route tests.
    pub fn with_receipt(self, receipt: Receipt) -> Self {
        self.receipts.lock().unwrap().push(receipt);
        self
    }

    pub fn with_items(self, items: Vec<ReceiptItem>) -> Self {
        self.items.lock().unwrap().extend(items);
        self
    }

    pub fn header_call_count(&self) -> u32 {
        *self.header_calls.lock().unwrap()
    }

    pub fn item_call_count(&self) -> u32 {
        *self.item_calls.lock().unwrap()
    }

    pub fn inserted_item_count(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn inserted_items(&self) -> Vec<ReceiptItem> {
        self.items.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseReceiptStore for MockReceiptStore {
    async fn insert_header(&self, receipt: &NewReceipt) -> Result<Receipt> {
        *self.header_calls.lock().unwrap() += 1;
        if self.fail_header {
            bail!("header insert failed");
        }
        let row = Receipt {
            id: self.next_id + self.receipts.lock().unwrap().len() as i64,
            owner_id: receipt.owner_id.to_string(),
            merchant: receipt.merchant.clone(),
            purchase_date: receipt.purchase_date,
            total: receipt.total,
            currency: receipt.currency.clone(),
            category: receipt.category.clone(),
            image_key: receipt.image_key.clone(),
            created_at: Utc::now(),
        };
        self.receipts.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn insert_items(&self, receipt_id: i64, items: &[LineItem]) -> Result<u64> {
        *self.item_calls.lock().unwrap() += 1;
        if self.fail_items {
            bail!("item insert failed");
        }
        let mut stored = self.items.lock().unwrap();
        for item in items {
            let id = stored.len() as i64 + 1;
            stored.push(ReceiptItem {
                id,
                receipt_id,
                name: item.name.clone(),
                quantity: item.quantity,
                price: item.price,
            });
        }
        Ok(items.len() as u64)
    }

    async fn find_receipt(&self, id: i64, owner: &OwnerId) -> Result<Option<Receipt>> {
        Ok(self
            .receipts
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id && r.owner_id == owner.as_str())
            .cloned())
    }

    async fn list_receipts(&self, owner: &OwnerId) -> Result<Vec<Receipt>> {
        Ok(self
            .receipts
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.owner_id == owner.as_str())
            .cloned()
            .collect())
    }

    async fn list_items(&self, receipt_id: i64) -> Result<Vec<ReceiptItem>> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|item| item.receipt_id == receipt_id)
            .cloned()
            .collect())
    }
}

// =============================================================================
// Telemetry Sinks
// =============================================================================

pub struct RecordingTelemetrySink {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl RecordingTelemetrySink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn event_names(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|e| e.name).collect()
    }
}

#[async_trait]
impl BaseTelemetrySink for RecordingTelemetrySink {
    async fn record(&self, event: TelemetryEvent) -> Result<()> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// Sink whose failures must be silently discarded by the dispatcher.
pub struct FailingTelemetrySink;

#[async_trait]
impl BaseTelemetrySink for FailingTelemetrySink {
    async fn record(&self, _event: TelemetryEvent) -> Result<()> {
        bail!("telemetry backend down")
    }
}

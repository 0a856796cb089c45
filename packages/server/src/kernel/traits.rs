// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic. The ingestion
// pipeline and persistence gateway are domain code that use these traits.
//
// Naming convention: Base* for trait names (e.g., BaseBlobStore)

use anyhow::Result;
use async_trait::async_trait;

use crate::common::OwnerId;
use crate::domains::receipts::capture::CaptureSource;
use crate::domains::receipts::models::{NewReceipt, Receipt, ReceiptItem};
use crate::domains::receipts::recognition::{LineItem, RecognitionResult};
use crate::kernel::recognition_client::RecognitionError;
use crate::kernel::telemetry::TelemetryEvent;

// =============================================================================
// Recognition Service Trait (Infrastructure - remote receipt analysis)
// =============================================================================

#[async_trait]
pub trait BaseRecognitionService: Send + Sync {
    /// Analyze a captured receipt image into structured data.
    ///
    /// Implementations must not retry; a retry is always an explicit
    /// re-submission through the coordinator.
    async fn analyze(&self, capture: &CaptureSource)
        -> Result<RecognitionResult, RecognitionError>;
}

// =============================================================================
// Blob Store Trait (Infrastructure - write-once image storage)
// =============================================================================

#[async_trait]
pub trait BaseBlobStore: Send + Sync {
    /// Store image bytes under the given key. Write-once: an existing key is
    /// an error, never an overwrite.
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<()>;
}

// =============================================================================
// Receipt Store Trait (Infrastructure - relational persistence)
// =============================================================================

#[async_trait]
pub trait BaseReceiptStore: Send + Sync {
    /// Insert the receipt header row; the store assigns the id.
    async fn insert_header(&self, receipt: &NewReceipt) -> Result<Receipt>;

    /// Insert all item rows for a receipt in one batch. Returns rows created.
    async fn insert_items(&self, receipt_id: i64, items: &[LineItem]) -> Result<u64>;

    /// Fetch a receipt by id, scoped to its owner.
    async fn find_receipt(&self, id: i64, owner: &OwnerId) -> Result<Option<Receipt>>;

    /// All receipts for an owner, newest first.
    async fn list_receipts(&self, owner: &OwnerId) -> Result<Vec<Receipt>>;

    /// Fetch the item rows for a receipt, in insertion order.
    async fn list_items(&self, receipt_id: i64) -> Result<Vec<ReceiptItem>>;
}

// =============================================================================
// Telemetry Trait (Infrastructure - fire-and-forget side channel)
// =============================================================================

#[async_trait]
pub trait BaseTelemetrySink: Send + Sync {
    /// Record one telemetry event. Failures are discarded by the dispatcher
    /// and never reach the pipeline.
    async fn record(&self, event: TelemetryEvent) -> Result<()>;
}

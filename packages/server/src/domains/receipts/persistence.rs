//! Persistence gateway.
//!
//! Two-stage persistence with a strict dependency order and no compensation:
//! image blob, then receipt header, then item rows. A receipt row never
//! exists without a stored image reachable by its key; the reverse (orphaned
//! blob after a failed header insert) is accepted and logged.

use anyhow::Error;
use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error as ThisError;

use crate::common::OwnerId;
use crate::kernel::traits::{BaseBlobStore, BaseReceiptStore};

use super::capture::CaptureSource;
use super::models::{NewReceipt, Receipt};
use super::recognition::RecognitionResult;

#[derive(Debug, ThisError)]
pub enum PersistError {
    /// Blob write failed: nothing was persisted.
    #[error("failed to store receipt image: {0}")]
    BlobStore(#[source] Error),

    /// Header insert failed: the blob exists orphaned, nothing else does.
    #[error("failed to save receipt: {0}")]
    HeaderInsert(#[source] Error),

    /// Item insert failed after the header was saved: partial success, the
    /// persisted receipt is carried along.
    #[error("receipt saved but line items were not: {source}")]
    ItemInsert {
        receipt: Receipt,
        #[source]
        source: Error,
    },
}

#[derive(Debug)]
pub struct PersistOutcome {
    pub receipt: Receipt,
    pub items_saved: u64,
}

pub struct PersistenceGateway {
    blob_store: Arc<dyn BaseBlobStore>,
    receipt_store: Arc<dyn BaseReceiptStore>,
}

impl PersistenceGateway {
    pub fn new(
        blob_store: Arc<dyn BaseBlobStore>,
        receipt_store: Arc<dyn BaseReceiptStore>,
    ) -> Self {
        Self {
            blob_store,
            receipt_store,
        }
    }

    /// Persist a recognized receipt: blob, then header, then items.
    ///
    /// The three steps are strictly sequential; each depends on what the
    /// previous one produced (storage key, generated receipt id).
    pub async fn persist(
        &self,
        capture: &CaptureSource,
        result: &RecognitionResult,
        owner: &OwnerId,
    ) -> Result<PersistOutcome, PersistError> {
        let key = storage_key(owner, capture);

        self.blob_store
            .put(&key, &capture.bytes, &capture.mime_type)
            .await
            .map_err(PersistError::BlobStore)?;

        let new_receipt = NewReceipt {
            owner_id: owner.clone(),
            merchant: result.merchant.clone(),
            purchase_date: parse_purchase_date(result.date.as_deref()),
            total: result.total,
            currency: result.currency.clone(),
            category: result.category.clone(),
            image_key: key.clone(),
        };

        let receipt = self
            .receipt_store
            .insert_header(&new_receipt)
            .await
            .map_err(|err| {
                // Accepted leak: the blob stays behind with no header row.
                tracing::warn!(key = %key, error = %err, "header insert failed; stored blob is orphaned");
                PersistError::HeaderInsert(err)
            })?;

        if result.items.is_empty() {
            return Ok(PersistOutcome {
                receipt,
                items_saved: 0,
            });
        }

        match self.receipt_store.insert_items(receipt.id, &result.items).await {
            Ok(items_saved) => Ok(PersistOutcome {
                receipt,
                items_saved,
            }),
            Err(source) => Err(PersistError::ItemInsert { receipt, source }),
        }
    }
}

/// Storage key namespaced by owner and capture instant.
pub fn storage_key(owner: &OwnerId, capture: &CaptureSource) -> String {
    format!(
        "{}/{}.{}",
        owner,
        capture.created_at.timestamp_millis(),
        capture.extension()
    )
}

fn parse_purchase_date(date: Option<&str>) -> Option<NaiveDate> {
    let date = date?;
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            tracing::debug!(date, error = %err, "unparseable purchase date dropped");
            None
        }
    }
}

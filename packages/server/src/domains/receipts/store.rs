//! Postgres-backed receipt store.
//!
//! Thin adapter from the `BaseReceiptStore` boundary onto the sqlx model
//! queries, so the pipeline itself never touches the pool.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::common::OwnerId;
use crate::kernel::traits::BaseReceiptStore;

use super::models::{NewReceipt, Receipt, ReceiptItem};
use super::recognition::LineItem;

pub struct PgReceiptStore {
    pool: PgPool,
}

impl PgReceiptStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseReceiptStore for PgReceiptStore {
    async fn insert_header(&self, receipt: &NewReceipt) -> Result<Receipt> {
        Receipt::create(receipt, &self.pool).await
    }

    async fn insert_items(&self, receipt_id: i64, items: &[LineItem]) -> Result<u64> {
        ReceiptItem::create_batch(receipt_id, items, &self.pool).await
    }

    async fn find_receipt(&self, id: i64, owner: &OwnerId) -> Result<Option<Receipt>> {
        Receipt::find_for_owner(id, owner, &self.pool).await
    }

    async fn list_receipts(&self, owner: &OwnerId) -> Result<Vec<Receipt>> {
        Receipt::find_all_for_owner(owner, &self.pool).await
    }

    async fn list_items(&self, receipt_id: i64) -> Result<Vec<ReceiptItem>> {
        ReceiptItem::find_for_receipt(receipt_id, &self.pool).await
    }
}

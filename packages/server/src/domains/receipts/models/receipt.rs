use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::OwnerId;
use crate::domains::receipts::recognition::LineItem;

/// Persisted receipt header.
///
/// Only ever created after the originating image blob is durably stored under
/// `image_key`; the id is generated by the store at insert time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Receipt {
    pub id: i64,
    pub owner_id: String,
    pub merchant: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub total: Option<f64>,
    pub currency: Option<String>,
    pub category: String,
    pub image_key: String,
    pub created_at: DateTime<Utc>,
}

/// Persisted line item, referencing its receipt by generated id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReceiptItem {
    pub id: i64,
    pub receipt_id: i64,
    pub name: String,
    pub quantity: Option<f64>,
    pub price: Option<f64>,
}

/// Receipt header fields before the store has assigned an id.
#[derive(Debug, Clone)]
pub struct NewReceipt {
    pub owner_id: OwnerId,
    pub merchant: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub total: Option<f64>,
    pub currency: Option<String>,
    pub category: String,
    pub image_key: String,
}

// =============================================================================
// Receipt Queries
// =============================================================================

impl Receipt {
    pub async fn create(receipt: &NewReceipt, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO receipts (owner_id, merchant, purchase_date, total, currency, category, image_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(receipt.owner_id.as_str())
        .bind(&receipt.merchant)
        .bind(receipt.purchase_date)
        .bind(receipt.total)
        .bind(&receipt.currency)
        .bind(&receipt.category)
        .bind(&receipt.image_key)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Find a receipt by id, scoped to its owner.
    pub async fn find_for_owner(id: i64, owner: &OwnerId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM receipts WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner.as_str())
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn find_all_for_owner(owner: &OwnerId, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM receipts WHERE owner_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner.as_str())
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}

// =============================================================================
// ReceiptItem Queries
// =============================================================================

impl ReceiptItem {
    /// Insert all items for a receipt in one batch.
    ///
    /// Returns the number of rows created. Items reference the receipt by its
    /// generated id, so this can only run after the header insert.
    pub async fn create_batch(
        receipt_id: i64,
        items: &[LineItem],
        pool: &PgPool,
    ) -> Result<u64> {
        if items.is_empty() {
            return Ok(0);
        }

        let mut builder = sqlx::QueryBuilder::<sqlx::Postgres>::new(
            "INSERT INTO receipt_items (receipt_id, name, quantity, price) ",
        );
        builder.push_values(items, |mut row, item| {
            row.push_bind(receipt_id)
                .push_bind(&item.name)
                .push_bind(item.quantity)
                .push_bind(item.price);
        });

        let result = builder.build().execute(pool).await?;
        Ok(result.rows_affected())
    }

    pub async fn find_for_receipt(receipt_id: i64, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM receipt_items WHERE receipt_id = $1 ORDER BY id",
        )
        .bind(receipt_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}

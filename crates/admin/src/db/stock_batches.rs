//! Database operations for stock batches.
//!
//! Reads through the repository see a point-in-time view and are fine for
//! previews and reports. Anything that consumes stock goes through
//! [`lock_available_for_item`] and [`decrement`] on a transaction, so the
//! quantities the allocator sees are the quantities that get written.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use service_bay_core::{CurrencyCode, InventoryItemId, Price, StockBatchId};

use super::RepositoryError;
use crate::models::inventory::{ReceiveStockInput, StockBatchRecord};

const BATCH_COLUMNS: &str = "id, item_id, purchase_reference, quantity, quantity_remaining, \
                             unit_price, currency_code, purchase_date, created_at";

/// Internal row type for stock batch queries.
#[derive(Debug, sqlx::FromRow)]
struct StockBatchRow {
    id: i32,
    item_id: i32,
    purchase_reference: Option<String>,
    quantity: Decimal,
    quantity_remaining: Decimal,
    unit_price: Decimal,
    currency_code: String,
    purchase_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl TryFrom<StockBatchRow> for StockBatchRecord {
    type Error = RepositoryError;

    fn try_from(row: StockBatchRow) -> Result<Self, Self::Error> {
        let currency_code = row.currency_code.parse::<CurrencyCode>().map_err(|e| {
            RepositoryError::DataCorruption(format!("stock batch {}: {e}", row.id))
        })?;

        Ok(Self {
            id: StockBatchId::new(row.id),
            item_id: InventoryItemId::new(row.item_id),
            purchase_reference: row.purchase_reference,
            quantity: row.quantity,
            quantity_remaining: row.quantity_remaining,
            unit_price: Price::new(row.unit_price, currency_code),
            purchase_date: row.purchase_date,
            created_at: row.created_at,
        })
    }
}

fn into_records(rows: Vec<StockBatchRow>) -> Result<Vec<StockBatchRecord>, RepositoryError> {
    rows.into_iter().map(TryInto::try_into).collect()
}

/// Repository for stock batch database operations.
pub struct StockBatchRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StockBatchRepository<'a> {
    /// Create a new stock batch repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record purchased stock as a new batch with its full quantity remaining.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidInput` if the quantity is not positive
    /// or the price is negative.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn receive(
        &self,
        input: &ReceiveStockInput,
    ) -> Result<StockBatchRecord, RepositoryError> {
        input.validate().map_err(RepositoryError::InvalidInput)?;

        let row = sqlx::query_as::<_, StockBatchRow>(&format!(
            r"
            INSERT INTO workshop.stock_batch (
                item_id, purchase_reference, quantity, quantity_remaining,
                unit_price, currency_code, purchase_date
            )
            VALUES ($1, $2, $3, $3, $4, $5, $6)
            RETURNING {BATCH_COLUMNS}
            "
        ))
        .bind(input.item_id)
        .bind(&input.purchase_reference)
        .bind(input.quantity)
        .bind(input.unit_price)
        .bind(input.currency_code.code())
        .bind(input.purchase_date)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Get a stock batch by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored currency is unknown.
    pub async fn get(&self, id: StockBatchId) -> Result<Option<StockBatchRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, StockBatchRow>(&format!(
            r"
            SELECT {BATCH_COLUMNS}
            FROM workshop.stock_batch
            WHERE id = $1
            "
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// List every batch of an item, oldest purchase first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored currency is unknown.
    pub async fn list_for_item(
        &self,
        item_id: InventoryItemId,
    ) -> Result<Vec<StockBatchRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, StockBatchRow>(&format!(
            r"
            SELECT {BATCH_COLUMNS}
            FROM workshop.stock_batch
            WHERE item_id = $1
            ORDER BY purchase_date ASC, id ASC
            "
        ))
        .bind(item_id)
        .fetch_all(self.pool)
        .await?;

        into_records(rows)
    }

    /// List batches of an item that still hold stock, oldest purchase first.
    ///
    /// This is an unlocked read, suitable for previews only.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored currency is unknown.
    pub async fn list_available_for_item(
        &self,
        item_id: InventoryItemId,
    ) -> Result<Vec<StockBatchRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, StockBatchRow>(&format!(
            r"
            SELECT {BATCH_COLUMNS}
            FROM workshop.stock_batch
            WHERE item_id = $1 AND quantity_remaining > 0
            ORDER BY purchase_date ASC, id ASC
            "
        ))
        .bind(item_id)
        .fetch_all(self.pool)
        .await?;

        into_records(rows)
    }

    /// Total units of an item remaining across all batches.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn total_available(&self, item_id: InventoryItemId) -> Result<Decimal, RepositoryError> {
        let total = sqlx::query_scalar::<_, Decimal>(
            r"
            SELECT COALESCE(SUM(quantity_remaining), 0)
            FROM workshop.stock_batch
            WHERE item_id = $1
            ",
        )
        .bind(item_id)
        .fetch_one(self.pool)
        .await?;

        Ok(total)
    }
}

/// Lock and return the batches of an item that still hold stock, oldest first.
///
/// Must run inside a transaction. The row locks are held until the
/// transaction ends, so concurrent consumers of the same item queue behind
/// each other instead of drawing on the same units.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
/// Returns `RepositoryError::DataCorruption` if a stored currency is unknown.
pub async fn lock_available_for_item(
    conn: &mut PgConnection,
    item_id: InventoryItemId,
) -> Result<Vec<StockBatchRecord>, RepositoryError> {
    let rows = sqlx::query_as::<_, StockBatchRow>(&format!(
        r"
        SELECT {BATCH_COLUMNS}
        FROM workshop.stock_batch
        WHERE item_id = $1 AND quantity_remaining > 0
        ORDER BY purchase_date ASC, id ASC
        FOR UPDATE
        "
    ))
    .bind(item_id)
    .fetch_all(&mut *conn)
    .await?;

    into_records(rows)
}

/// Deduct `quantity` from a batch's remaining stock.
///
/// The update only applies while the batch still holds at least `quantity`.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the batch no longer holds enough.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn decrement(
    conn: &mut PgConnection,
    batch_id: StockBatchId,
    quantity: Decimal,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE workshop.stock_batch
        SET quantity_remaining = quantity_remaining - $2
        WHERE id = $1 AND quantity_remaining >= $2
        ",
    )
    .bind(batch_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::Conflict(format!(
            "stock batch {batch_id} holds less than {quantity}"
        )));
    }

    Ok(())
}

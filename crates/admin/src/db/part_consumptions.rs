//! Database operations for parts consumed by service records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use service_bay_core::{
    AllocationLine, CurrencyCode, InventoryItemId, PartConsumptionId, Price, ServiceRecordId,
    StockBatchId,
};

use super::RepositoryError;
use crate::models::service_record::PartConsumption;

/// Internal row type for part consumption queries.
#[derive(Debug, sqlx::FromRow)]
struct PartConsumptionRow {
    id: i32,
    service_record_id: i32,
    item_id: i32,
    batch_id: i32,
    quantity: Decimal,
    unit_price: Decimal,
    currency_code: String,
    consumed_at: DateTime<Utc>,
}

impl TryFrom<PartConsumptionRow> for PartConsumption {
    type Error = RepositoryError;

    fn try_from(row: PartConsumptionRow) -> Result<Self, Self::Error> {
        let currency_code = row.currency_code.parse::<CurrencyCode>().map_err(|e| {
            RepositoryError::DataCorruption(format!("part consumption {}: {e}", row.id))
        })?;

        Ok(Self {
            id: PartConsumptionId::new(row.id),
            service_record_id: ServiceRecordId::new(row.service_record_id),
            item_id: InventoryItemId::new(row.item_id),
            batch_id: StockBatchId::new(row.batch_id),
            quantity: row.quantity,
            unit_price: Price::new(row.unit_price, currency_code),
            consumed_at: row.consumed_at,
        })
    }
}

/// Repository for reading recorded part consumption.
pub struct PartConsumptionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PartConsumptionRepository<'a> {
    /// Create a new part consumption repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List parts consumed by a service record, in the order they were recorded.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored currency is unknown.
    pub async fn list_for_service_record(
        &self,
        service_record_id: ServiceRecordId,
    ) -> Result<Vec<PartConsumption>, RepositoryError> {
        let rows = sqlx::query_as::<_, PartConsumptionRow>(
            r"
            SELECT id, service_record_id, item_id, batch_id, quantity,
                   unit_price, currency_code, consumed_at
            FROM workshop.part_consumption
            WHERE service_record_id = $1
            ORDER BY id ASC
            ",
        )
        .bind(service_record_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

/// Record that one allocation line was consumed by a service record.
///
/// Must run in the same transaction as the matching
/// [`decrement`](super::stock_batches::decrement).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert(
    conn: &mut PgConnection,
    service_record_id: ServiceRecordId,
    item_id: InventoryItemId,
    line: &AllocationLine,
) -> Result<PartConsumption, RepositoryError> {
    let row = sqlx::query_as::<_, PartConsumptionRow>(
        r"
        INSERT INTO workshop.part_consumption (
            service_record_id, item_id, batch_id, quantity, unit_price, currency_code
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, service_record_id, item_id, batch_id, quantity,
                  unit_price, currency_code, consumed_at
        ",
    )
    .bind(service_record_id)
    .bind(item_id)
    .bind(line.batch_id)
    .bind(line.quantity_taken)
    .bind(line.unit_price.amount)
    .bind(line.unit_price.currency_code.code())
    .fetch_one(&mut *conn)
    .await?;

    row.try_into()
}

//! Inventory service: stock previews, receiving and parts consumption.
//!
//! Consumption for a service record is all-or-nothing. Every requested item
//! is allocated against a locked snapshot of its batches and written in one
//! transaction:
//! 1. Lock the item's batches that still hold stock (`FOR UPDATE`)
//! 2. Allocate FIFO over the locked snapshot
//! 3. If the caller confirmed a previewed plan, require an exact match
//! 4. Deduct each line from its batch and record the consumption
//!
//! Any failure drops the transaction, which rolls back every earlier write.
//! The steps run against the `ConsumptionTx` seam, implemented for a Postgres
//! transaction.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use service_bay_core::{
    AllocationLine, AllocationPlan, AmountOverflow, InventoryItemId, RequestedQuantity,
    ServiceRecordId, StockBatch, allocate,
};

use crate::db::{RepositoryError, StockBatchRepository, part_consumptions, stock_batches};
use crate::models::inventory::{ReceiveStockInput, StockBatchRecord};
use crate::models::service_record::{ConsumptionReceipt, ItemConsumption, PartRequest};

/// Errors returned by [`InventoryService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Not enough stock of an item to cover the request.
    #[error("insufficient stock for item {item_id}: short by {shortfall}")]
    InsufficientStock {
        /// Item that ran short.
        item_id: InventoryItemId,
        /// Requested quantity minus available quantity.
        shortfall: Decimal,
    },

    /// Stock changed between the preview and the commit.
    #[error("stock for item {item_id} changed since the preview was shown")]
    StalePreview {
        /// Item whose plan changed.
        item_id: InventoryItemId,
        /// Plan derived from the current stock.
        current: AllocationPlan,
    },

    /// The request itself is malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A cost total left the decimal range.
    #[error(transparent)]
    Amount(#[from] AmountOverflow),

    /// Database operation failed.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Service for stock previews, receiving and parts consumption.
pub struct InventoryService {
    pool: PgPool,
}

impl InventoryService {
    /// Create a new inventory service.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Plan drawing `quantity` of an item from current stock without writing anything.
    ///
    /// The plan reflects an unlocked read; [`Self::consume_for_service`]
    /// re-derives it under lock before committing.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InsufficientStock` if stock does not cover the request.
    /// Returns `ServiceError::Repository` if the batches cannot be read.
    #[instrument(skip_all, fields(item_id = %item_id, quantity = %quantity))]
    pub async fn preview(
        &self,
        item_id: InventoryItemId,
        quantity: RequestedQuantity,
    ) -> Result<AllocationPlan, ServiceError> {
        let batches = StockBatchRepository::new(&self.pool)
            .list_available_for_item(item_id)
            .await?;

        let plan = allocate_item(item_id, quantity, &snapshot(&batches))?;
        debug!(lines = plan.len(), "Previewed allocation");
        Ok(plan)
    }

    /// Record purchased stock as a new batch.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the input is invalid or the insert fails.
    #[instrument(skip_all, fields(item_id = %input.item_id))]
    pub async fn receive_stock(
        &self,
        input: &ReceiveStockInput,
    ) -> Result<StockBatchRecord, ServiceError> {
        let batch = StockBatchRepository::new(&self.pool).receive(input).await?;

        info!(
            batch_id = %batch.id,
            quantity = %batch.quantity,
            unit_price = %batch.unit_price.amount,
            "Received stock"
        );
        Ok(batch)
    }

    /// Total units of an item remaining across all batches.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn stock_level(&self, item_id: InventoryItemId) -> Result<Decimal, ServiceError> {
        Ok(StockBatchRepository::new(&self.pool)
            .total_available(item_id)
            .await?)
    }

    /// Consume parts for a service record in a single transaction.
    ///
    /// Requests for the same item are merged before allocation. Items are
    /// locked in ascending ID order so concurrent commits cannot deadlock.
    /// The receipt lists items in that same order.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InsufficientStock` if any item runs short.
    /// Returns `ServiceError::StalePreview` if a confirmed preview no longer matches.
    /// Returns `ServiceError::InvalidRequest` if a previewed item is requested twice
    /// or merged quantities exceed the storable range.
    /// Returns `ServiceError::Amount` if the receipt total leaves the decimal range.
    /// Returns `ServiceError::Repository` if a database operation fails.
    ///
    /// Nothing is written unless every item succeeds.
    #[instrument(skip_all, fields(service_record_id = %service_record_id, parts = parts.len()))]
    pub async fn consume_for_service(
        &self,
        service_record_id: ServiceRecordId,
        parts: Vec<PartRequest>,
    ) -> Result<ConsumptionReceipt, ServiceError> {
        let merged = merge_requests(parts)?;

        if merged.is_empty() {
            return Ok(ConsumptionReceipt {
                service_record_id,
                items: Vec::new(),
            });
        }

        let tx = self.pool.begin().await?;
        commit_consumption(tx, service_record_id, merged).await
    }
}

/// Database steps of a consumption commit.
///
/// Dropping an implementation without calling [`ConsumptionTx::commit`]
/// must discard every write made through it.
trait ConsumptionTx: Send + Sized {
    /// Lock and return the item's batches that still hold stock, oldest first.
    fn lock_available(
        &mut self,
        item_id: InventoryItemId,
    ) -> impl Future<Output = Result<Vec<StockBatchRecord>, RepositoryError>> + Send;

    /// Deduct one allocation line from its batch and record the consumption.
    fn record_draw(
        &mut self,
        service_record_id: ServiceRecordId,
        item_id: InventoryItemId,
        line: &AllocationLine,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Make every recorded draw permanent.
    fn commit(self) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

impl ConsumptionTx for Transaction<'_, Postgres> {
    async fn lock_available(
        &mut self,
        item_id: InventoryItemId,
    ) -> Result<Vec<StockBatchRecord>, RepositoryError> {
        stock_batches::lock_available_for_item(&mut **self, item_id).await
    }

    async fn record_draw(
        &mut self,
        service_record_id: ServiceRecordId,
        item_id: InventoryItemId,
        line: &AllocationLine,
    ) -> Result<(), RepositoryError> {
        stock_batches::decrement(&mut **self, line.batch_id, line.quantity_taken).await?;
        part_consumptions::insert(&mut **self, service_record_id, item_id, line).await?;
        Ok(())
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        Transaction::commit(self).await?;
        Ok(())
    }
}

/// Allocate, reconcile and record every merged request, then commit.
///
/// Returning early drops `tx`, which rolls back the writes of every item
/// processed so far.
async fn commit_consumption<T: ConsumptionTx>(
    mut tx: T,
    service_record_id: ServiceRecordId,
    requests: BTreeMap<InventoryItemId, PartRequest>,
) -> Result<ConsumptionReceipt, ServiceError> {
    let mut items = Vec::with_capacity(requests.len());

    for (item_id, request) in requests {
        let batches = tx.lock_available(item_id).await?;
        let plan = allocate_item(item_id, request.quantity, &snapshot(&batches))?;

        if let Some(previewed) = &request.previewed {
            reconcile_preview(item_id, previewed, &plan)?;
        }

        for line in &plan {
            tx.record_draw(service_record_id, item_id, line).await?;
        }

        debug!(item_id = %item_id, lines = plan.len(), "Allocated item");
        items.push(ItemConsumption { item_id, plan });
    }

    let receipt = ConsumptionReceipt {
        service_record_id,
        items,
    };
    let total_cost = receipt.total_cost()?;

    tx.commit().await?;

    info!(
        items = receipt.items.len(),
        total_cost = %total_cost,
        "Committed parts consumption"
    );
    Ok(receipt)
}

fn snapshot(batches: &[StockBatchRecord]) -> Vec<StockBatch> {
    batches.iter().map(StockBatchRecord::to_stock_batch).collect()
}

fn allocate_item(
    item_id: InventoryItemId,
    quantity: RequestedQuantity,
    batches: &[StockBatch],
) -> Result<AllocationPlan, ServiceError> {
    allocate(quantity, batches).map_err(|e| {
        warn!(
            item_id = %item_id,
            requested = %quantity,
            shortfall = %e.shortfall(),
            "Insufficient stock"
        );
        ServiceError::InsufficientStock {
            item_id,
            shortfall: e.shortfall(),
        }
    })
}

/// Merge part requests by item, summing quantities.
///
/// A previewed plan only describes a single request, so an item that
/// carries a preview may appear once.
///
/// # Errors
///
/// Returns `ServiceError::InvalidRequest` if a previewed item appears more than once,
/// or if the summed quantity of an item exceeds the storable maximum.
pub fn merge_requests(
    parts: Vec<PartRequest>,
) -> Result<BTreeMap<InventoryItemId, PartRequest>, ServiceError> {
    let mut merged: BTreeMap<InventoryItemId, PartRequest> = BTreeMap::new();

    for part in parts {
        match merged.get_mut(&part.item_id) {
            Some(existing) => {
                if existing.previewed.is_some() || part.previewed.is_some() {
                    return Err(ServiceError::InvalidRequest(format!(
                        "item {} requested more than once alongside a previewed plan",
                        part.item_id
                    )));
                }
                existing.quantity = existing.quantity.combine(part.quantity).map_err(|e| {
                    ServiceError::InvalidRequest(format!("item {}: {e}", part.item_id))
                })?;
            }
            None => {
                merged.insert(part.item_id, part);
            }
        }
    }

    Ok(merged)
}

/// Check that the plan derived at commit time matches the one the user confirmed.
///
/// # Errors
///
/// Returns `ServiceError::StalePreview` carrying the current plan on any difference
/// in batches, quantities or prices.
pub fn reconcile_preview(
    item_id: InventoryItemId,
    previewed: &AllocationPlan,
    committed: &AllocationPlan,
) -> Result<(), ServiceError> {
    if previewed == committed {
        return Ok(());
    }

    warn!(item_id = %item_id, "Previewed allocation no longer matches stock");
    Err(ServiceError::StalePreview {
        item_id,
        current: committed.clone(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    use service_bay_core::{CurrencyCode, MAX_QUANTITY, Price, StockBatchId};

    use super::*;

    type Draw = (InventoryItemId, StockBatchId, Decimal);

    /// What an in-memory transaction left behind.
    #[derive(Default)]
    struct Journal {
        locked: Vec<InventoryItemId>,
        committed: Vec<Draw>,
    }

    /// In-memory stand-in for a database transaction. Draws are staged and
    /// only reach the journal on commit.
    struct MemoryTx<'a> {
        stock: BTreeMap<InventoryItemId, Vec<StockBatchRecord>>,
        staged: Vec<Draw>,
        journal: &'a mut Journal,
    }

    impl<'a> MemoryTx<'a> {
        fn new(stock: Vec<StockBatchRecord>, journal: &'a mut Journal) -> Self {
            let mut by_item: BTreeMap<InventoryItemId, Vec<StockBatchRecord>> = BTreeMap::new();
            for record in stock {
                by_item.entry(record.item_id).or_default().push(record);
            }
            Self {
                stock: by_item,
                staged: Vec::new(),
                journal,
            }
        }
    }

    impl ConsumptionTx for MemoryTx<'_> {
        async fn lock_available(
            &mut self,
            item_id: InventoryItemId,
        ) -> Result<Vec<StockBatchRecord>, RepositoryError> {
            self.journal.locked.push(item_id);
            Ok(self
                .stock
                .get(&item_id)
                .map(|records| {
                    records
                        .iter()
                        .filter(|r| r.quantity_remaining > Decimal::ZERO)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default())
        }

        async fn record_draw(
            &mut self,
            _service_record_id: ServiceRecordId,
            item_id: InventoryItemId,
            line: &AllocationLine,
        ) -> Result<(), RepositoryError> {
            let record = self
                .stock
                .get_mut(&item_id)
                .and_then(|records| records.iter_mut().find(|r| r.id == line.batch_id))
                .ok_or(RepositoryError::NotFound)?;
            if record.quantity_remaining < line.quantity_taken {
                return Err(RepositoryError::Conflict("batch overdrawn".to_string()));
            }
            record.quantity_remaining -= line.quantity_taken;
            self.staged.push((item_id, line.batch_id, line.quantity_taken));
            Ok(())
        }

        async fn commit(self) -> Result<(), RepositoryError> {
            self.journal.committed.extend(self.staged);
            Ok(())
        }
    }

    fn record(
        id: i32,
        item_id: i32,
        month: u32,
        remaining: Decimal,
        price: Decimal,
    ) -> StockBatchRecord {
        let purchased = Utc.with_ymd_and_hms(2024, month, 1, 0, 0, 0).unwrap();
        StockBatchRecord {
            id: StockBatchId::new(id),
            item_id: InventoryItemId::new(item_id),
            purchase_reference: None,
            quantity: remaining,
            quantity_remaining: remaining,
            unit_price: Price::new(price, CurrencyCode::USD),
            purchase_date: purchased,
            created_at: purchased,
        }
    }

    /// Oil (item 1) in two batches, wiper blades (item 2) in one.
    fn workshop_stock() -> Vec<StockBatchRecord> {
        vec![
            record(1, 1, 1, dec!(5), dec!(10)),
            record(2, 1, 2, dec!(10), dec!(12)),
            record(3, 2, 1, dec!(3), dec!(20)),
        ]
    }

    fn draw(item_id: i32, batch_id: i32, quantity: Decimal) -> Draw {
        (InventoryItemId::new(item_id), StockBatchId::new(batch_id), quantity)
    }

    fn batch(id: i32, qty: Decimal) -> StockBatch {
        StockBatch {
            batch_id: StockBatchId::new(id),
            available_quantity: qty,
            purchase_date: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            unit_price: Price::new(dec!(10), CurrencyCode::USD),
        }
    }

    fn qty(value: Decimal) -> RequestedQuantity {
        RequestedQuantity::new(value).unwrap()
    }

    fn item(id: i32) -> InventoryItemId {
        InventoryItemId::new(id)
    }

    #[test]
    fn test_merge_sums_duplicate_items() {
        let merged = merge_requests(vec![
            PartRequest::new(item(2), qty(dec!(1))),
            PartRequest::new(item(1), qty(dec!(4))),
            PartRequest::new(item(2), qty(dec!(2.5))),
        ])
        .unwrap();

        let entries: Vec<_> = merged.iter().map(|(id, r)| (*id, r.quantity.get())).collect();
        assert_eq!(entries, vec![(item(1), dec!(4)), (item(2), dec!(3.5))]);
    }

    #[test]
    fn test_merge_rejects_duplicate_with_preview() {
        let plan = allocate(qty(dec!(1)), &[batch(1, dec!(5))]).unwrap();
        let result = merge_requests(vec![
            PartRequest::new(item(1), qty(dec!(1))).with_preview(plan),
            PartRequest::new(item(1), qty(dec!(1))),
        ]);

        assert!(matches!(result, Err(ServiceError::InvalidRequest(_))));
    }

    #[test]
    fn test_merge_rejects_sum_past_max() {
        let result = merge_requests(vec![
            PartRequest::new(item(1), qty(MAX_QUANTITY)),
            PartRequest::new(item(1), qty(MAX_QUANTITY)),
        ]);

        assert!(matches!(
            result,
            Err(ServiceError::InvalidRequest(msg)) if msg.starts_with("item 1")
        ));
    }

    #[test]
    fn test_merge_empty() {
        assert!(merge_requests(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn test_reconcile_matching_preview() {
        let batches = [batch(1, dec!(5)), batch(2, dec!(5))];
        let previewed = allocate(qty(dec!(7)), &batches).unwrap();
        let committed = allocate(qty(dec!(7)), &batches).unwrap();

        assert!(reconcile_preview(item(1), &previewed, &committed).is_ok());
    }

    #[test]
    fn test_reconcile_detects_consumed_stock() {
        // Preview saw 5 units in batch 1; another record used 3 before commit.
        let previewed = allocate(qty(dec!(4)), &[batch(1, dec!(5)), batch(2, dec!(5))]).unwrap();
        let committed = allocate(qty(dec!(4)), &[batch(1, dec!(2)), batch(2, dec!(5))]).unwrap();

        let err = reconcile_preview(item(1), &previewed, &committed).unwrap_err();
        match err {
            ServiceError::StalePreview { item_id, current } => {
                assert_eq!(item_id, item(1));
                assert_eq!(current, committed);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_allocate_item_maps_shortfall() {
        let err = allocate_item(item(3), qty(dec!(6)), &[batch(1, dec!(5))]).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::InsufficientStock { item_id, shortfall }
                if item_id == item(3) && shortfall == dec!(1)
        ));
    }

    #[test]
    fn test_error_display() {
        let err = ServiceError::InsufficientStock {
            item_id: item(4),
            shortfall: dec!(2),
        };
        assert_eq!(err.to_string(), "insufficient stock for item 4: short by 2");
    }

    #[tokio::test]
    async fn test_commit_draws_every_item_in_id_order() {
        let mut journal = Journal::default();
        let tx = MemoryTx::new(workshop_stock(), &mut journal);
        let requests = merge_requests(vec![
            PartRequest::new(item(2), qty(dec!(1))),
            PartRequest::new(item(1), qty(dec!(7))),
        ])
        .unwrap();

        let receipt = commit_consumption(tx, ServiceRecordId::new(40), requests)
            .await
            .unwrap();

        let order: Vec<_> = receipt.items.iter().map(|i| i.item_id).collect();
        assert_eq!(order, vec![item(1), item(2)]);
        assert_eq!(receipt.total_cost().unwrap(), dec!(94));
        assert_eq!(journal.locked, vec![item(1), item(2)]);
        assert_eq!(
            journal.committed,
            vec![draw(1, 1, dec!(5)), draw(1, 2, dec!(2)), draw(2, 3, dec!(1))]
        );
    }

    #[tokio::test]
    async fn test_shortfall_on_later_item_commits_nothing() {
        let mut journal = Journal::default();
        let tx = MemoryTx::new(workshop_stock(), &mut journal);
        let requests = merge_requests(vec![
            PartRequest::new(item(1), qty(dec!(7))),
            PartRequest::new(item(2), qty(dec!(5))),
        ])
        .unwrap();

        let err = commit_consumption(tx, ServiceRecordId::new(41), requests)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ServiceError::InsufficientStock { item_id, shortfall }
                if item_id == item(2) && shortfall == dec!(2)
        ));
        assert_eq!(journal.locked, vec![item(1), item(2)]);
        assert!(journal.committed.is_empty());
    }

    #[tokio::test]
    async fn test_stale_preview_on_later_item_commits_nothing() {
        // Preview taken when wiper blades still had 3 units at 18.
        let previewed = allocate(
            qty(dec!(2)),
            &[record(3, 2, 1, dec!(3), dec!(18)).to_stock_batch()],
        )
        .unwrap();

        let mut journal = Journal::default();
        let tx = MemoryTx::new(workshop_stock(), &mut journal);
        let requests = merge_requests(vec![
            PartRequest::new(item(1), qty(dec!(2))),
            PartRequest::new(item(2), qty(dec!(2))).with_preview(previewed),
        ])
        .unwrap();

        let err = commit_consumption(tx, ServiceRecordId::new(42), requests)
            .await
            .unwrap_err();

        match err {
            ServiceError::StalePreview { item_id, current } => {
                assert_eq!(item_id, item(2));
                assert_eq!(current.total_cost().unwrap(), dec!(40));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(journal.committed.is_empty());
    }

    #[tokio::test]
    async fn test_matching_preview_commits() {
        let stock = workshop_stock();
        let oil: Vec<StockBatch> = stock
            .iter()
            .filter(|r| r.item_id == item(1))
            .map(StockBatchRecord::to_stock_batch)
            .collect();
        let previewed = allocate(qty(dec!(6)), &oil).unwrap();

        let mut journal = Journal::default();
        let tx = MemoryTx::new(stock, &mut journal);
        let requests =
            merge_requests(vec![PartRequest::new(item(1), qty(dec!(6))).with_preview(previewed)])
                .unwrap();

        let receipt = commit_consumption(tx, ServiceRecordId::new(43), requests)
            .await
            .unwrap();

        assert_eq!(receipt.items.len(), 1);
        assert_eq!(
            journal.committed,
            vec![draw(1, 1, dec!(5)), draw(1, 2, dec!(1))]
        );
    }
}

//! FIFO allocation of requested quantities across stock batches.
//!
//! Parts used during a service are drawn from the stock batches of the
//! corresponding inventory item, oldest purchase first. [`allocate`] turns a
//! requested quantity and a snapshot of the item's batches into an
//! [`AllocationPlan`] stating how much to take from each batch and at what
//! unit price.
//!
//! Allocation is all-or-nothing: if the batches cannot cover the request, the
//! result is [`AllocationError::InsufficientStock`] and no plan exists.
//!
//! The allocator never touches storage. Applying a plan (decrementing batch
//! quantities and recording the consumption) is the caller's job, and must
//! happen in one transaction against a re-validated snapshot.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{AmountOverflow, InventoryItemId, Price, RequestedQuantity, StockBatchId};

/// Errors produced by [`allocate`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationError {
    /// The batches together hold less than the requested quantity.
    #[error("insufficient stock: short by {shortfall}")]
    InsufficientStock {
        /// Requested quantity minus the total available across all batches.
        shortfall: Decimal,
    },
}

impl AllocationError {
    /// The unsatisfied remainder of the request.
    #[must_use]
    pub const fn shortfall(&self) -> Decimal {
        match self {
            Self::InsufficientStock { shortfall } => *shortfall,
        }
    }
}

/// A snapshot of one stock batch as seen by the allocator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockBatch {
    /// Batch identifier, unique per batch.
    pub batch_id: StockBatchId,
    /// Quantity still unconsumed in this batch.
    pub available_quantity: Decimal,
    /// When the batch was purchased. Callers order batches by this, oldest first.
    pub purchase_date: DateTime<Utc>,
    /// Price per unit for anything drawn from this batch.
    pub unit_price: Price,
}

/// Quantity drawn from a single batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationLine {
    /// Batch the quantity is drawn from.
    pub batch_id: StockBatchId,
    /// Quantity taken from the batch. Always positive.
    pub quantity_taken: Decimal,
    /// Unit price of the batch.
    pub unit_price: Price,
}

impl AllocationLine {
    /// `quantity_taken * unit_price`.
    ///
    /// # Errors
    ///
    /// Returns `AmountOverflow` if the product does not fit in a `Decimal`.
    pub fn line_total(&self) -> Result<Decimal, AmountOverflow> {
        Ok(self.unit_price.times(self.quantity_taken)?.amount)
    }
}

/// An ordered set of draws that together satisfy one request exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllocationPlan {
    lines: Vec<AllocationLine>,
}

impl AllocationPlan {
    /// Lines in the order the batches were consumed.
    #[must_use]
    pub fn lines(&self) -> &[AllocationLine] {
        &self.lines
    }

    /// Consume the plan, returning its lines.
    #[must_use]
    pub fn into_lines(self) -> Vec<AllocationLine> {
        self.lines
    }

    /// Number of batches the plan draws from.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the plan draws from no batch at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of `quantity_taken` over all lines.
    #[must_use]
    pub fn total_quantity(&self) -> Decimal {
        self.lines.iter().map(|line| line.quantity_taken).sum()
    }

    /// Sum of line totals, in the batches' currency.
    ///
    /// Batches of one item are bought in a single currency, so the amounts
    /// are added without conversion.
    ///
    /// # Errors
    ///
    /// Returns `AmountOverflow` if a line total or the sum leaves the `Decimal` range.
    pub fn total_cost(&self) -> Result<Decimal, AmountOverflow> {
        self.lines.iter().try_fold(Decimal::ZERO, |total, line| {
            total.checked_add(line.line_total()?).ok_or(AmountOverflow)
        })
    }
}

impl<'a> IntoIterator for &'a AllocationPlan {
    type Item = &'a AllocationLine;
    type IntoIter = std::slice::Iter<'a, AllocationLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

/// A request to draw `requested_quantity` of one item from stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRequest {
    /// Item the stock belongs to.
    pub item_id: InventoryItemId,
    /// How much to draw.
    pub requested_quantity: RequestedQuantity,
}

impl AllocationRequest {
    /// Create a new allocation request.
    #[must_use]
    pub const fn new(item_id: InventoryItemId, requested_quantity: RequestedQuantity) -> Self {
        Self {
            item_id,
            requested_quantity,
        }
    }

    /// Allocate this request against the item's batches.
    ///
    /// # Errors
    ///
    /// Returns `AllocationError::InsufficientStock` when the batches cannot
    /// cover the request.
    pub fn allocate(&self, batches: &[StockBatch]) -> Result<AllocationPlan, AllocationError> {
        allocate(self.requested_quantity, batches)
    }
}

/// Allocate `requested` across `batches`, oldest first.
///
/// `batches` must already be sorted by purchase date, oldest first; the
/// order is trusted as given. Each batch contributes
/// `min(remaining, available_quantity)`. Batches with nothing available are
/// skipped and never show up as zero-quantity lines. Iteration stops as soon
/// as the request is covered, so later batches are untouched.
///
/// Batch IDs must be unique within `batches`.
///
/// # Errors
///
/// Returns `AllocationError::InsufficientStock` carrying
/// `requested - total_available` when the batches run out first. No partial
/// plan is returned in that case.
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use rust_decimal::Decimal;
/// use service_bay_core::{
///     CurrencyCode, Price, RequestedQuantity, StockBatch, StockBatchId, allocate,
/// };
///
/// let batch = |id: i32, qty: i64| StockBatch {
///     batch_id: StockBatchId::new(id),
///     available_quantity: Decimal::from(qty),
///     purchase_date: Utc::now(),
///     unit_price: Price::new(Decimal::TEN, CurrencyCode::USD),
/// };
/// let batches = [batch(1, 5), batch(2, 3)];
///
/// let plan = allocate(RequestedQuantity::try_from(7).unwrap(), &batches).unwrap();
/// assert_eq!(plan.len(), 2);
/// assert_eq!(plan.total_quantity(), Decimal::from(7));
///
/// let err = allocate(RequestedQuantity::try_from(9).unwrap(), &batches).unwrap_err();
/// assert_eq!(err.shortfall(), Decimal::ONE);
/// ```
pub fn allocate(
    requested: RequestedQuantity,
    batches: &[StockBatch],
) -> Result<AllocationPlan, AllocationError> {
    let mut remaining = requested.get();
    let mut lines = Vec::new();

    for batch in batches {
        if remaining <= Decimal::ZERO {
            break;
        }

        let take = remaining.min(batch.available_quantity);
        if take <= Decimal::ZERO {
            continue;
        }

        lines.push(AllocationLine {
            batch_id: batch.batch_id,
            quantity_taken: take,
            unit_price: batch.unit_price,
        });
        remaining -= take;
    }

    if remaining > Decimal::ZERO {
        return Err(AllocationError::InsufficientStock {
            shortfall: remaining,
        });
    }

    Ok(AllocationPlan { lines })
}

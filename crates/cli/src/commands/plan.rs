//! Offline FIFO allocation planning from a batch snapshot file.
//!
//! # Snapshot Format
//!
//! ```yaml
//! item: OIL-5W30
//! currency: USD
//! batches:
//!   - batch_id: 1
//!     available_quantity: 5
//!     purchase_date: 2024-01-03T09:00:00Z
//!     unit_price: "10.00"
//!   - batch_id: 2
//!     available_quantity: 3
//!     purchase_date: 2024-02-11T09:00:00Z
//!     unit_price: "12.00"
//! ```
//!
//! Batches are ordered oldest purchase first before allocating, with the
//! batch ID breaking ties, matching the order the inventory store uses.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

use service_bay_core::{
    AllocationError, AllocationPlan, AmountOverflow, CurrencyCode, Price, RequestedQuantity,
    StockBatch, StockBatchId, allocate,
};

/// Errors that can occur while planning.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid snapshot: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Duplicate batch ID in snapshot: {0}")]
    DuplicateBatch(i32),

    #[error("Batch {0} has negative available quantity")]
    NegativeQuantity(i32),

    #[error("Allocation failed: {0}")]
    Allocation(#[from] AllocationError),

    #[error("Plan cost out of range: {0}")]
    Amount(#[from] AmountOverflow),
}

/// A batch snapshot file.
#[derive(Debug, Deserialize)]
pub struct Snapshot {
    /// Optional label for the item, used in log output.
    #[serde(default)]
    pub item: Option<String>,
    /// Currency for batches that do not name one.
    #[serde(default)]
    pub currency: CurrencyCode,
    /// The item's batches, in any order.
    pub batches: Vec<SnapshotBatch>,
}

/// One batch in a snapshot file.
#[derive(Debug, Deserialize)]
pub struct SnapshotBatch {
    pub batch_id: i32,
    pub available_quantity: Decimal,
    pub purchase_date: DateTime<Utc>,
    pub unit_price: Decimal,
    #[serde(default)]
    pub currency: Option<CurrencyCode>,
}

impl Snapshot {
    /// Parse a snapshot from YAML.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::Parse` if the YAML does not match the snapshot format.
    pub fn from_yaml(content: &str) -> Result<Self, PlanError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Validated batches ordered oldest first.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::DuplicateBatch` or `PlanError::NegativeQuantity`
    /// for snapshots the allocator cannot accept.
    pub fn ordered_batches(&self) -> Result<Vec<StockBatch>, PlanError> {
        let mut seen = HashSet::new();
        let mut batches = Vec::with_capacity(self.batches.len());

        for batch in &self.batches {
            if !seen.insert(batch.batch_id) {
                return Err(PlanError::DuplicateBatch(batch.batch_id));
            }
            if batch.available_quantity < Decimal::ZERO {
                return Err(PlanError::NegativeQuantity(batch.batch_id));
            }
            batches.push(StockBatch {
                batch_id: StockBatchId::new(batch.batch_id),
                available_quantity: batch.available_quantity,
                purchase_date: batch.purchase_date,
                unit_price: Price::new(batch.unit_price, batch.currency.unwrap_or(self.currency)),
            });
        }

        batches.sort_by(|a, b| {
            a.purchase_date
                .cmp(&b.purchase_date)
                .then(a.batch_id.cmp(&b.batch_id))
        });
        Ok(batches)
    }

    /// Allocate `quantity` against this snapshot.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::Allocation` on insufficient stock, or a validation
    /// error from [`Self::ordered_batches`].
    pub fn plan(&self, quantity: RequestedQuantity) -> Result<AllocationPlan, PlanError> {
        let batches = self.ordered_batches()?;
        Ok(allocate(quantity, &batches)?)
    }
}

/// Plan an allocation from a snapshot file and log the result.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or stock is insufficient.
pub async fn run(path: &Path, quantity: RequestedQuantity) -> Result<(), PlanError> {
    info!(path = %path.display(), "Loading batch snapshot");
    let content = tokio::fs::read_to_string(path).await?;
    let snapshot = Snapshot::from_yaml(&content)?;
    let item = snapshot.item.as_deref().unwrap_or("(unnamed item)");

    let plan = match snapshot.plan(quantity) {
        Ok(plan) => plan,
        Err(PlanError::Allocation(e)) => {
            error!(item, requested = %quantity, shortfall = %e.shortfall(), "Not enough stock");
            return Err(e.into());
        }
        Err(e) => return Err(e),
    };

    let total_cost = plan.total_cost()?;

    info!(item, requested = %quantity, "Allocation plan");
    for line in &plan {
        info!(
            "  batch {:>6}  qty {:>10}  @ {}",
            line.batch_id,
            line.quantity_taken.normalize(),
            line.unit_price.display()
        );
    }
    info!(
        batches = plan.len(),
        total_quantity = %plan.total_quantity().normalize(),
        total_cost = %total_cost.round_dp(2),
        "Plan complete"
    );

    Ok(())
}

//! Parts consumed by service records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use service_bay_core::{
    AllocationPlan, AmountOverflow, InventoryItemId, PartConsumptionId, PartsInvoice, Price,
    RequestedQuantity, ServiceRecordId, StockBatchId,
};

/// Units of one batch consumed by a service record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartConsumption {
    /// Unique consumption ID.
    pub id: PartConsumptionId,
    /// Service record the part was used on.
    pub service_record_id: ServiceRecordId,
    /// Item consumed.
    pub item_id: InventoryItemId,
    /// Batch the units were drawn from.
    pub batch_id: StockBatchId,
    /// Units consumed.
    pub quantity: Decimal,
    /// Price per unit at the time of consumption.
    pub unit_price: Price,
    /// When the consumption was recorded.
    pub consumed_at: DateTime<Utc>,
}

/// A part requested for a service record.
#[derive(Debug, Clone, Deserialize)]
pub struct PartRequest {
    /// Item to draw.
    pub item_id: InventoryItemId,
    /// Units to draw.
    pub quantity: RequestedQuantity,
    /// Plan shown to the user before submission, if any.
    ///
    /// When present, the commit only goes through if the plan derived from
    /// the locked stock matches it exactly.
    #[serde(default)]
    pub previewed: Option<AllocationPlan>,
}

impl PartRequest {
    /// Request `quantity` of an item without a previewed plan.
    #[must_use]
    pub const fn new(item_id: InventoryItemId, quantity: RequestedQuantity) -> Self {
        Self {
            item_id,
            quantity,
            previewed: None,
        }
    }

    /// Attach the plan the user confirmed.
    #[must_use]
    pub fn with_preview(mut self, plan: AllocationPlan) -> Self {
        self.previewed = Some(plan);
        self
    }
}

/// The plan committed for one item.
#[derive(Debug, Clone, Serialize)]
pub struct ItemConsumption {
    /// Item consumed.
    pub item_id: InventoryItemId,
    /// Batches drawn from.
    pub plan: AllocationPlan,
}

/// Everything committed for a service record in one transaction.
#[derive(Debug, Clone, Serialize)]
pub struct ConsumptionReceipt {
    /// Service record the parts were used on.
    pub service_record_id: ServiceRecordId,
    /// Per-item plans, in ascending item ID order.
    pub items: Vec<ItemConsumption>,
}

impl ConsumptionReceipt {
    /// Total cost of all consumed parts.
    ///
    /// # Errors
    ///
    /// Returns `AmountOverflow` if the total leaves the `Decimal` range.
    pub fn total_cost(&self) -> Result<Decimal, AmountOverflow> {
        self.items.iter().try_fold(Decimal::ZERO, |total, item| {
            total
                .checked_add(item.plan.total_cost()?)
                .ok_or(AmountOverflow)
        })
    }

    /// Invoice lines for the consumed parts.
    ///
    /// # Errors
    ///
    /// Returns `AmountOverflow` if a line total leaves the `Decimal` range.
    pub fn invoice(&self) -> Result<PartsInvoice, AmountOverflow> {
        PartsInvoice::from_plans(self.items.iter().map(|item| (item.item_id, &item.plan)))
    }
}

//! Parts lines for service invoices.
//!
//! Each unit of a part is billed at the unit price of the batch it was drawn
//! from, so one item consumed across two batches yields two invoice lines.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::allocation::AllocationPlan;
use crate::types::{AmountOverflow, InventoryItemId, Price, StockBatchId};

/// One billed draw from a stock batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartsInvoiceLine {
    /// Item consumed.
    pub item_id: InventoryItemId,
    /// Batch the units came from.
    pub batch_id: StockBatchId,
    /// Units billed.
    pub quantity: Decimal,
    /// Price per unit.
    pub unit_price: Price,
    /// `quantity * unit_price`.
    pub line_total: Decimal,
}

/// Parts section of a service invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartsInvoice {
    /// Lines in consumption order.
    pub lines: Vec<PartsInvoiceLine>,
}

impl PartsInvoice {
    /// Build invoice lines from per-item allocation plans.
    ///
    /// # Errors
    ///
    /// Returns `AmountOverflow` if a line total leaves the `Decimal` range.
    pub fn from_plans<'a, I>(plans: I) -> Result<Self, AmountOverflow>
    where
        I: IntoIterator<Item = (InventoryItemId, &'a AllocationPlan)>,
    {
        let lines = plans
            .into_iter()
            .flat_map(|(item_id, plan)| {
                plan.lines().iter().map(move |line| {
                    Ok(PartsInvoiceLine {
                        item_id,
                        batch_id: line.batch_id,
                        quantity: line.quantity_taken,
                        unit_price: line.unit_price,
                        line_total: line.line_total()?,
                    })
                })
            })
            .collect::<Result<Vec<_>, AmountOverflow>>()?;

        Ok(Self { lines })
    }

    /// Sum of all line totals.
    ///
    /// # Errors
    ///
    /// Returns `AmountOverflow` if the sum leaves the `Decimal` range.
    pub fn subtotal(&self) -> Result<Decimal, AmountOverflow> {
        self.lines.iter().try_fold(Decimal::ZERO, |total, line| {
            total.checked_add(line.line_total).ok_or(AmountOverflow)
        })
    }

    /// Total units billed for one item.
    #[must_use]
    pub fn quantity_for(&self, item_id: InventoryItemId) -> Decimal {
        self.lines
            .iter()
            .filter(|line| line.item_id == item_id)
            .map(|line| line.quantity)
            .sum()
    }
}

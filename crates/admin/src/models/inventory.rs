//! Inventory item and stock batch models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use service_bay_core::{
    CurrencyCode, InventoryItemId, MAX_QUANTITY, MAX_UNIT_PRICE, PRICE_SCALE, Price,
    QUANTITY_SCALE, StockBatch, StockBatchId,
};

/// A stocked part or consumable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Unique item ID.
    pub id: InventoryItemId,
    /// Supplier or workshop part number, unique.
    pub part_number: String,
    /// Display name.
    pub name: String,
    /// When the item was created.
    pub created_at: DateTime<Utc>,
}

/// Input for creating an inventory item.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateItemInput {
    /// Part number, unique.
    pub part_number: String,
    /// Display name.
    pub name: String,
}

/// A stock batch as stored: units of one item bought together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockBatchRecord {
    /// Unique batch ID.
    pub id: StockBatchId,
    /// Item the batch holds.
    pub item_id: InventoryItemId,
    /// Purchase (order or invoice) the batch was received from.
    pub purchase_reference: Option<String>,
    /// Units received.
    pub quantity: Decimal,
    /// Units not yet consumed.
    pub quantity_remaining: Decimal,
    /// Price per unit.
    pub unit_price: Price,
    /// When the batch was purchased.
    pub purchase_date: DateTime<Utc>,
    /// When the batch was recorded.
    pub created_at: DateTime<Utc>,
}

impl StockBatchRecord {
    /// Snapshot of this batch for the allocator.
    #[must_use]
    pub const fn to_stock_batch(&self) -> StockBatch {
        StockBatch {
            batch_id: self.id,
            available_quantity: self.quantity_remaining,
            purchase_date: self.purchase_date,
            unit_price: self.unit_price,
        }
    }
}

/// Input for receiving purchased stock as a new batch.
#[derive(Debug, Clone, Deserialize)]
pub struct ReceiveStockInput {
    /// Item received.
    pub item_id: InventoryItemId,
    /// Purchase the stock came from.
    pub purchase_reference: Option<String>,
    /// Units received. Must be positive.
    pub quantity: Decimal,
    /// Price per unit. Must not be negative.
    pub unit_price: Decimal,
    /// Currency of `unit_price`.
    pub currency_code: CurrencyCode,
    /// When the stock was purchased.
    pub purchase_date: DateTime<Utc>,
}

impl ReceiveStockInput {
    /// Check the quantity and price are usable and fit the stored precision.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.quantity <= Decimal::ZERO {
            return Err(format!(
                "received quantity must be positive, got {}",
                self.quantity
            ));
        }
        if self.quantity.normalize().scale() > QUANTITY_SCALE {
            return Err(format!(
                "received quantity {} has more than {QUANTITY_SCALE} decimal places",
                self.quantity
            ));
        }
        if self.quantity > MAX_QUANTITY {
            return Err(format!("received quantity exceeds {MAX_QUANTITY}"));
        }
        if self.unit_price < Decimal::ZERO {
            return Err(format!(
                "unit price must not be negative, got {}",
                self.unit_price
            ));
        }
        if self.unit_price.normalize().scale() > PRICE_SCALE {
            return Err(format!(
                "unit price {} has more than {PRICE_SCALE} decimal places",
                self.unit_price
            ));
        }
        if self.unit_price > MAX_UNIT_PRICE {
            return Err(format!("unit price exceeds {MAX_UNIT_PRICE}"));
        }
        Ok(())
    }
}

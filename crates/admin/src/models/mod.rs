//! Domain models for the inventory store.

pub mod inventory;
pub mod service_record;

pub use inventory::{CreateItemInput, InventoryItem, ReceiveStockInput, StockBatchRecord};
pub use service_record::{ConsumptionReceipt, ItemConsumption, PartConsumption, PartRequest};

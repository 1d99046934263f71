//! Business logic services for the inventory store.
//!
//! # Services
//!
//! - `inventory` - FIFO previews, stock receiving and transactional parts consumption

pub mod inventory;

pub use inventory::{InventoryService, ServiceError, merge_requests, reconcile_preview};

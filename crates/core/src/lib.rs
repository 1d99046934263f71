//! Service Bay Core - Shared inventory types and stock allocation.
//!
//! This crate provides the types and pure logic used across all Service Bay
//! components:
//! - `admin` - Inventory store and service-record parts consumption
//! - `cli` - Command-line tools for migrations, stock and offline planning
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access. Allocation works on a caller-supplied snapshot of stock batches, so
//! it can run anywhere: inside a database transaction, in a preview endpoint,
//! or offline from a file.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, quantities and prices
//! - [`allocation`] - FIFO batch allocation
//! - [`billing`] - Parts invoice lines derived from allocation plans

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod allocation;
pub mod billing;
pub mod types;

pub use allocation::{
    AllocationError, AllocationLine, AllocationPlan, AllocationRequest, StockBatch, allocate,
};
pub use billing::{PartsInvoice, PartsInvoiceLine};
pub use types::*;

//! Core types for Service Bay.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod price;
pub mod quantity;

pub use id::*;
pub use price::{
    AmountOverflow, CurrencyCode, CurrencyCodeError, MAX_UNIT_PRICE, PRICE_SCALE, Price,
};
pub use quantity::{MAX_QUANTITY, QUANTITY_SCALE, QuantityError, RequestedQuantity};

//! CLI command implementations.

pub mod migrate;
pub mod plan;
pub mod stock;

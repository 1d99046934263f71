//! Service Bay Admin library.
//!
//! Inventory store behind the workshop back office: stock batches received
//! from purchases, parts consumed by service records, and the service that
//! allocates stock FIFO and commits the consumption atomically.
//!
//! # Modules
//!
//! - [`config`] - Environment-driven configuration
//! - [`db`] - `PostgreSQL` repositories
//! - [`models`] - Inventory and service-record domain models
//! - [`services`] - Business logic over the repositories

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod models;
pub mod services;

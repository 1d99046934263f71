//! Inventory item and stock batch commands.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

use service_bay_admin::config::{AdminConfig, ConfigError};
use service_bay_admin::db::{self, InventoryItemRepository, RepositoryError, StockBatchRepository};
use service_bay_admin::models::{CreateItemInput, InventoryItem, ReceiveStockInput};
use service_bay_admin::services::{InventoryService, ServiceError};

/// Errors from stock commands.
#[derive(Debug, Error)]
pub enum StockCommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Inventory error: {0}")]
    Service(#[from] ServiceError),

    #[error("No inventory item with part number {0}")]
    UnknownPart(String),
}

/// Arguments for `stock receive`.
pub struct ReceiveArgs {
    pub part_number: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub purchase_reference: Option<String>,
    pub purchase_date: DateTime<Utc>,
}

async fn connect() -> Result<(AdminConfig, PgPool), StockCommandError> {
    let config = AdminConfig::from_env()?;
    let pool = db::create_pool(&config.database_url, config.max_connections).await?;
    Ok((config, pool))
}

async fn find_item(pool: &PgPool, part_number: &str) -> Result<InventoryItem, StockCommandError> {
    InventoryItemRepository::new(pool)
        .get_by_part_number(part_number)
        .await?
        .ok_or_else(|| StockCommandError::UnknownPart(part_number.to_owned()))
}

/// Register a new inventory item.
///
/// # Errors
///
/// Returns an error if the part number is already registered or the database is unreachable.
pub async fn create_item(part_number: &str, name: &str) -> Result<(), StockCommandError> {
    let (_, pool) = connect().await?;

    let item = InventoryItemRepository::new(&pool)
        .create(&CreateItemInput {
            part_number: part_number.to_owned(),
            name: name.to_owned(),
        })
        .await?;

    info!(id = %item.id, part_number = %item.part_number, "Created inventory item");
    Ok(())
}

/// List an item's batches, oldest first.
///
/// # Errors
///
/// Returns an error if the item does not exist or the database is unreachable.
pub async fn list(part_number: &str) -> Result<(), StockCommandError> {
    let (_, pool) = connect().await?;
    let item = find_item(&pool, part_number).await?;
    let batches = StockBatchRepository::new(&pool)
        .list_for_item(item.id)
        .await?;

    info!("{} - {}", item.part_number, item.name);
    if batches.is_empty() {
        info!("  (no batches)");
        return Ok(());
    }

    for batch in &batches {
        info!(
            "  batch {:>6}  {}  {:>10} / {:<10} @ {}  {}",
            batch.id,
            batch.purchase_date.format("%Y-%m-%d"),
            batch.quantity_remaining.normalize(),
            batch.quantity.normalize(),
            batch.unit_price.display(),
            batch.purchase_reference.as_deref().unwrap_or("")
        );
    }

    let total = InventoryService::new(pool).stock_level(item.id).await?;
    info!(batches = batches.len(), available = %total.normalize(), "Stock level");
    Ok(())
}

/// Record stock received from a purchase, priced in the configured currency.
///
/// # Errors
///
/// Returns an error if the item does not exist, the input is invalid,
/// or the database is unreachable.
pub async fn receive(args: ReceiveArgs) -> Result<(), StockCommandError> {
    let (config, pool) = connect().await?;
    let item = find_item(&pool, &args.part_number).await?;

    let input = ReceiveStockInput {
        item_id: item.id,
        purchase_reference: args.purchase_reference,
        quantity: args.quantity,
        unit_price: args.unit_price,
        currency_code: config.default_currency,
        purchase_date: args.purchase_date,
    };

    let batch = InventoryService::new(pool).receive_stock(&input).await?;
    info!(
        batch_id = %batch.id,
        part_number = %item.part_number,
        quantity = %batch.quantity.normalize(),
        unit_price = %batch.unit_price.display(),
        "Stock received"
    );
    Ok(())
}

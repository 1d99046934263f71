//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! bay-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `SERVICE_BAY_DATABASE_URL` - `PostgreSQL` connection string
//!
//! # Migration Files
//!
//! Migrations live in `crates/admin/migrations/` and are embedded at build time.

use thiserror::Error;

use service_bay_admin::config::{AdminConfig, ConfigError};
use service_bay_admin::db;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run the inventory database migrations.
///
/// # Errors
///
/// Returns an error if configuration is missing, the database is unreachable,
/// or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let config = AdminConfig::from_env()?;

    tracing::info!("Connecting to inventory database...");
    let pool = db::create_pool(&config.database_url, config.max_connections).await?;

    tracing::info!("Running inventory migrations...");
    sqlx::migrate!("../admin/migrations").run(&pool).await?;

    tracing::info!("Inventory migrations complete!");
    Ok(())
}

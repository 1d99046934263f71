//! Database operations for inventory items.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use service_bay_core::InventoryItemId;

use super::{RepositoryError, map_unique_violation};
use crate::models::inventory::{CreateItemInput, InventoryItem};

/// Internal row type for inventory item queries.
#[derive(Debug, sqlx::FromRow)]
struct InventoryItemRow {
    id: i32,
    part_number: String,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<InventoryItemRow> for InventoryItem {
    fn from(row: InventoryItemRow) -> Self {
        Self {
            id: InventoryItemId::new(row.id),
            part_number: row.part_number,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

/// Repository for inventory item database operations.
pub struct InventoryItemRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> InventoryItemRepository<'a> {
    /// Create a new inventory item repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a new inventory item.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the part number already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, input: &CreateItemInput) -> Result<InventoryItem, RepositoryError> {
        let row = sqlx::query_as::<_, InventoryItemRow>(
            r"
            INSERT INTO workshop.inventory_item (part_number, name)
            VALUES ($1, $2)
            RETURNING id, part_number, name, created_at
            ",
        )
        .bind(&input.part_number)
        .bind(&input.name)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "part number already exists"))?;

        Ok(row.into())
    }

    /// Get an inventory item by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: InventoryItemId) -> Result<Option<InventoryItem>, RepositoryError> {
        let row = sqlx::query_as::<_, InventoryItemRow>(
            r"
            SELECT id, part_number, name, created_at
            FROM workshop.inventory_item
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Get an inventory item by part number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_part_number(
        &self,
        part_number: &str,
    ) -> Result<Option<InventoryItem>, RepositoryError> {
        let row = sqlx::query_as::<_, InventoryItemRow>(
            r"
            SELECT id, part_number, name, created_at
            FROM workshop.inventory_item
            WHERE part_number = $1
            ",
        )
        .bind(part_number)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// List all inventory items ordered by part number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<InventoryItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, InventoryItemRow>(
            r"
            SELECT id, part_number, name, created_at
            FROM workshop.inventory_item
            ORDER BY part_number ASC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

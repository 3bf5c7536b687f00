//! # Inventory Repository
//!
//! Items, guarded stock changes and the adjustment log.
//!
//! ## Guarded Stock Delta
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  UPDATE inventory SET stock = stock + :delta                        │
//! │  WHERE id = :id AND stock + :delta >= 0                             │
//! │                                                                     │
//! │  Pharmacist A sells 3 ─┐                                            │
//! │  Pharmacist B sells 2 ─┴─► both deltas apply, stock - 5             │
//! │                                                                     │
//! │  No read-modify-write, so concurrent sales never overwrite each     │
//! │  other. Zero rows affected means the item is missing or short.      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use clinic_core::{DateRange, InventoryItem, StockAdjustment};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>("SELECT * FROM inventory ORDER BY name COLLATE NOCASE")
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>("SELECT * FROM inventory WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(item)
    }

    pub async fn insert(&self, item: &InventoryItem) -> DbResult<()> {
        debug!(id = %item.id, name = %item.name, "Inserting inventory item");

        sqlx::query(
            r#"
            INSERT INTO inventory (
                id, name, category, stock, unit,
                cost_price, selling_price, supplier_id,
                expiry_date, reorder_level, batch_number, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(item.category)
        .bind(item.stock)
        .bind(&item.unit)
        .bind(item.cost_price)
        .bind(item.selling_price)
        .bind(&item.supplier_id)
        .bind(item.expiry_date)
        .bind(item.reorder_level)
        .bind(&item.batch_number)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates the descriptive fields of an item.
    ///
    /// `stock` is left untouched; it only moves through [`Self::adjust`],
    /// invoices and received orders so every change is logged.
    pub async fn update(&self, item: &InventoryItem) -> DbResult<InventoryItem> {
        debug!(id = %item.id, "Updating inventory item");

        let result = sqlx::query(
            r#"
            UPDATE inventory SET
                name = ?2,
                category = ?3,
                unit = ?4,
                cost_price = ?5,
                selling_price = ?6,
                supplier_id = ?7,
                expiry_date = ?8,
                reorder_level = ?9,
                batch_number = ?10,
                updated_at = ?11
            WHERE id = ?1
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(item.category)
        .bind(&item.unit)
        .bind(item.cost_price)
        .bind(item.selling_price)
        .bind(&item.supplier_id)
        .bind(item.expiry_date)
        .bind(item.reorder_level)
        .bind(&item.batch_number)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Inventory item", &item.id));
        }

        self.get_by_id(&item.id)
            .await?
            .ok_or_else(|| DbError::not_found("Inventory item", &item.id))
    }

    /// Applies an adjustment and logs it in one transaction.
    pub async fn adjust(&self, adjustment: &StockAdjustment) -> DbResult<InventoryItem> {
        let mut tx = self.pool.begin().await?;

        let item = apply_stock_delta(&mut tx, &adjustment.inventory_item_id, adjustment.quantity_delta).await?;
        insert_adjustment(&mut tx, adjustment).await?;

        tx.commit().await?;

        info!(
            item = %item.name,
            delta = adjustment.quantity_delta,
            reason = %adjustment.reason,
            stock = item.stock,
            "Stock adjusted"
        );
        Ok(item)
    }

    /// Adjustments whose `created_at` date falls in the range, newest first.
    pub async fn adjustments_between(&self, range: DateRange) -> DbResult<Vec<StockAdjustment>> {
        let rows = sqlx::query_as::<_, StockAdjustment>(
            r#"
            SELECT * FROM stock_adjustments
            WHERE substr(created_at, 1, 10) BETWEEN ?1 AND ?2
            ORDER BY created_at DESC
            "#,
        )
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Connection-level helpers (used inside transactions)
// =============================================================================

/// Adds `delta` to an item's stock unless the result would be negative.
///
/// ## Returns
/// The item after the change.
///
/// ## Errors
/// - `NotFound` when the item does not exist
/// - `InsufficientStock` when `stock + delta < 0`
pub(crate) async fn apply_stock_delta(
    conn: &mut SqliteConnection,
    item_id: &str,
    delta: i64,
) -> DbResult<InventoryItem> {
    debug!(id = %item_id, delta = delta, "Applying stock delta");

    let result = sqlx::query(
        r#"
        UPDATE inventory
        SET stock = stock + ?2, updated_at = ?3
        WHERE id = ?1 AND stock + ?2 >= 0
        "#,
    )
    .bind(item_id)
    .bind(delta)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let current: Option<(String, i64)> =
            sqlx::query_as("SELECT name, stock FROM inventory WHERE id = ?1")
                .bind(item_id)
                .fetch_optional(&mut *conn)
                .await?;

        return Err(match current {
            None => DbError::not_found("Inventory item", item_id),
            Some((name, stock)) => DbError::InsufficientStock {
                item: name,
                available: stock,
                requested: delta.saturating_neg(),
            },
        });
    }

    let item = sqlx::query_as::<_, InventoryItem>("SELECT * FROM inventory WHERE id = ?1")
        .bind(item_id)
        .fetch_one(&mut *conn)
        .await?;

    Ok(item)
}

pub(crate) async fn insert_adjustment(conn: &mut SqliteConnection, adj: &StockAdjustment) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_adjustments (
            id, inventory_item_id, quantity_delta, reason, note, adjusted_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&adj.id)
    .bind(&adj.inventory_item_id)
    .bind(adj.quantity_delta)
    .bind(adj.reason)
    .bind(&adj.note)
    .bind(&adj.adjusted_by)
    .bind(adj.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

//! # Purchase Order Repository
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Pending ──► Ordered ──► Received   (stock += quantity, Purchase log)  │
//! │     │           │                                                       │
//! │     └───────────┴──────► Cancelled                                      │
//! │                                                                         │
//! │  Received and Cancelled are terminal. Receiving happens in the same    │
//! │  transaction as the status change, so stock is added exactly once.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use clinic_core::{AdjustmentReason, CoreError, Order, OrderStatus, StockAdjustment};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::inventory::{apply_stock_delta, insert_adjustment};

#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, Order>("SELECT * FROM orders ORDER BY ordered_on DESC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let row = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    pub async fn insert(&self, o: &Order) -> DbResult<()> {
        debug!(id = %o.id, supplier_id = %o.supplier_id, quantity = o.quantity, "Inserting order");

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, supplier_id, inventory_item_id, quantity,
                unit_cost, total_cost, ordered_on, expected_on, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&o.id)
        .bind(&o.supplier_id)
        .bind(&o.inventory_item_id)
        .bind(o.quantity)
        .bind(o.unit_cost)
        .bind(o.total_cost)
        .bind(o.ordered_on)
        .bind(o.expected_on)
        .bind(o.status)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Moves an order to `status`, restocking on first receipt.
    pub async fn update_status(&self, id: &str, status: OrderStatus, changed_by: &str) -> DbResult<Order> {
        let mut tx = self.pool.begin().await?;

        let mut order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))?;

        if !order.status.can_transition_to(status) {
            return Err(CoreError::InvalidStatusTransition {
                entity: "Order".to_string(),
                from: order.status.to_string(),
                to: status.to_string(),
            }
            .into());
        }

        let receiving = status == OrderStatus::Received && order.status != OrderStatus::Received;

        sqlx::query("UPDATE orders SET status = ?2 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .execute(&mut *tx)
            .await?;

        if receiving {
            let mut adjustment = StockAdjustment::new(
                &order.inventory_item_id,
                order.quantity,
                AdjustmentReason::Purchase,
                changed_by,
            );
            adjustment.note = Some(format!("Order {} received", order.id));

            apply_stock_delta(&mut tx, &order.inventory_item_id, order.quantity).await?;
            insert_adjustment(&mut tx, &adjustment).await?;
        }

        tx.commit().await?;

        info!(id = %id, from = %order.status, to = %status, restocked = receiving, "Order status changed");
        order.status = status;
        Ok(order)
    }
}

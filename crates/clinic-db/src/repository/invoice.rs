//! # Invoice Repository
//!
//! Records an invoice and everything it touches in one SQLite transaction.
//!
//! ## Recording Steps
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │   1. INSERT invoices                                                    │
//! │   2. INSERT invoice_payments   (one per split)                          │
//! │   3. INSERT transactions       (one per line, status Paid)              │
//! │   4. guarded stock delta       (per linked item, + Sale adjustment)    │
//! │   5. UPDATE consultations      (status Completed, if linked)            │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any error drops the transaction un-committed, which rolls back every  │
//! │  step. A stock shortfall surfaces as InsufficientStock.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use clinic_core::{
    AdjustmentReason, ConsultationStatus, DateRange, Invoice, PaymentMethod, PaymentSplit,
    StockAdjustment, Transaction,
};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;
use crate::repository::consultation::set_status;
use crate::repository::inventory::{apply_stock_delta, insert_adjustment};

#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Persists a validated invoice. All or nothing.
    pub async fn record(&self, invoice: &Invoice) -> DbResult<()> {
        debug!(id = %invoice.id, lines = invoice.items.len(), total = %invoice.total, "Recording invoice");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO invoices (id, patient_id, consultation_id, total, created_by, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.patient_id)
        .bind(&invoice.consultation_id)
        .bind(invoice.total)
        .bind(&invoice.created_by)
        .bind(invoice.created_at)
        .execute(&mut *tx)
        .await?;

        for payment in &invoice.payments {
            sqlx::query("INSERT INTO invoice_payments (invoice_id, method, amount) VALUES (?1, ?2, ?3)")
                .bind(&invoice.id)
                .bind(payment.method)
                .bind(payment.amount)
                .execute(&mut *tx)
                .await?;
        }

        for t in invoice.to_transactions() {
            sqlx::query(
                r#"
                INSERT INTO transactions (
                    id, invoice_id, date, patient_id, consultation_id,
                    item_type, category, description, quantity, amount, total, status
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
            )
            .bind(&t.id)
            .bind(&t.invoice_id)
            .bind(t.date)
            .bind(&t.patient_id)
            .bind(&t.consultation_id)
            .bind(t.item_type)
            .bind(&t.category)
            .bind(&t.description)
            .bind(t.quantity)
            .bind(t.amount)
            .bind(t.total)
            .bind(t.status)
            .execute(&mut *tx)
            .await?;
        }

        for (item_id, quantity) in invoice.stock_withdrawals() {
            apply_stock_delta(&mut tx, &item_id, -quantity).await?;

            let mut adjustment =
                StockAdjustment::new(&item_id, -quantity, AdjustmentReason::Sale, &invoice.created_by);
            adjustment.note = Some(format!("Invoice {}", invoice.id));
            adjustment.created_at = invoice.created_at;
            insert_adjustment(&mut tx, &adjustment).await?;
        }

        if let Some(consultation_id) = &invoice.consultation_id {
            set_status(&mut tx, consultation_id, ConsultationStatus::Completed).await?;
        }

        tx.commit().await?;

        info!(id = %invoice.id, total = %invoice.total, patient_id = %invoice.patient_id, "Invoice recorded");
        Ok(())
    }

    /// Transactions whose date falls in the range, newest first.
    pub async fn transactions_between(&self, range: DateRange) -> DbResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT * FROM transactions
            WHERE substr(date, 1, 10) BETWEEN ?1 AND ?2
            ORDER BY date DESC
            "#,
        )
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Payment splits recorded for one invoice.
    pub async fn payments(&self, invoice_id: &str) -> DbResult<Vec<PaymentSplit>> {
        let rows: Vec<(PaymentMethod, clinic_core::Money)> =
            sqlx::query_as("SELECT method, amount FROM invoice_payments WHERE invoice_id = ?1 ORDER BY id")
                .bind(invoice_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(method, amount)| PaymentSplit { method, amount })
            .collect())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

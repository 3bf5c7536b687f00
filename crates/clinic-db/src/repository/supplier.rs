//! # Supplier Repository

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use clinic_core::Supplier;

#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<Supplier>> {
        let rows = sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers ORDER BY name COLLATE NOCASE")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Supplier>> {
        let row = sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    pub async fn insert(&self, s: &Supplier) -> DbResult<()> {
        debug!(id = %s.id, name = %s.name, "Inserting supplier");

        sqlx::query(
            r#"
            INSERT INTO suppliers (id, name, contact_person, phone, email, address, gst_number, status)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&s.id)
        .bind(&s.name)
        .bind(&s.contact_person)
        .bind(&s.phone)
        .bind(&s.email)
        .bind(&s.address)
        .bind(&s.gst_number)
        .bind(s.status)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn update(&self, s: &Supplier) -> DbResult<()> {
        debug!(id = %s.id, "Updating supplier");

        let result = sqlx::query(
            r#"
            UPDATE suppliers SET
                name = ?2,
                contact_person = ?3,
                phone = ?4,
                email = ?5,
                address = ?6,
                gst_number = ?7,
                status = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&s.id)
        .bind(&s.name)
        .bind(&s.contact_person)
        .bind(&s.phone)
        .bind(&s.email)
        .bind(&s.address)
        .bind(&s.gst_number)
        .bind(s.status)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", &s.id));
        }

        Ok(())
    }
}

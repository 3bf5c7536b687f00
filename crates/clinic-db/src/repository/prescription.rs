//! # Prescription Repository
//!
//! Medicines are kept as a JSON array in one column; a prescription is
//! always read and written whole.

use sqlx::types::Json;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use clinic_core::Prescription;

#[derive(Debug, Clone)]
pub struct PrescriptionRepository {
    pool: SqlitePool,
}

impl PrescriptionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PrescriptionRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<Prescription>> {
        let rows = sqlx::query_as::<_, Prescription>("SELECT * FROM prescriptions ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    pub async fn insert(&self, p: &Prescription) -> DbResult<()> {
        debug!(id = %p.id, consultation_id = %p.consultation_id, medicines = p.medicines.len(), "Inserting prescription");

        sqlx::query(
            r#"
            INSERT INTO prescriptions (id, consultation_id, medicines, total_cost, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&p.id)
        .bind(&p.consultation_id)
        .bind(Json(&p.medicines))
        .bind(p.total_cost)
        .bind(p.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

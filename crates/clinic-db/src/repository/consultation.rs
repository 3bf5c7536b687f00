//! # Consultation Repository

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use clinic_core::{Consultation, ConsultationStatus};

#[derive(Debug, Clone)]
pub struct ConsultationRepository {
    pool: SqlitePool,
}

impl ConsultationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ConsultationRepository { pool }
    }

    /// All consultations, most recent first.
    pub async fn list(&self) -> DbResult<Vec<Consultation>> {
        let rows = sqlx::query_as::<_, Consultation>(
            "SELECT * FROM consultations ORDER BY date DESC, created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Consultation>> {
        let row = sqlx::query_as::<_, Consultation>("SELECT * FROM consultations WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    pub async fn insert(&self, c: &Consultation) -> DbResult<()> {
        debug!(id = %c.id, patient_id = %c.patient_id, "Inserting consultation");

        sqlx::query(
            r#"
            INSERT INTO consultations (
                id, patient_id, doctor_email, date, chief_complaint,
                diagnosis, notes, fee, status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&c.id)
        .bind(&c.patient_id)
        .bind(&c.doctor_email)
        .bind(c.date)
        .bind(&c.chief_complaint)
        .bind(&c.diagnosis)
        .bind(&c.notes)
        .bind(c.fee)
        .bind(c.status)
        .bind(c.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn update_status(&self, id: &str, status: ConsultationStatus) -> DbResult<Consultation> {
        let mut conn = self.pool.acquire().await?;
        set_status(&mut conn, id, status).await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Consultation", id))
    }
}

/// Sets a consultation's status on an existing connection, so invoice
/// recording can do it inside its transaction.
pub(crate) async fn set_status(
    conn: &mut SqliteConnection,
    id: &str,
    status: ConsultationStatus,
) -> DbResult<()> {
    debug!(id = %id, status = %status, "Updating consultation status");

    let result = sqlx::query("UPDATE consultations SET status = ?2 WHERE id = ?1")
        .bind(id)
        .bind(status)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Consultation", id));
    }

    Ok(())
}

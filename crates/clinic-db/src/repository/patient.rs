//! # Patient Repository

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use clinic_core::Patient;

/// Repository for patient records.
#[derive(Debug, Clone)]
pub struct PatientRepository {
    pool: SqlitePool,
}

impl PatientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PatientRepository { pool }
    }

    /// All patients, alphabetically.
    pub async fn list(&self) -> DbResult<Vec<Patient>> {
        let patients = sqlx::query_as::<_, Patient>("SELECT * FROM patients ORDER BY name COLLATE NOCASE")
            .fetch_all(&self.pool)
            .await?;

        debug!(count = patients.len(), "Listed patients");
        Ok(patients)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Patient>> {
        let patient = sqlx::query_as::<_, Patient>("SELECT * FROM patients WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(patient)
    }

    pub async fn insert(&self, p: &Patient) -> DbResult<()> {
        debug!(id = %p.id, "Inserting patient");

        sqlx::query(
            r#"
            INSERT INTO patients (
                id, name, age, gender, phone, email,
                district, state, occupation, allergies, emergency_contact,
                registered_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&p.id)
        .bind(&p.name)
        .bind(p.age)
        .bind(p.gender)
        .bind(&p.phone)
        .bind(&p.email)
        .bind(&p.district)
        .bind(&p.state)
        .bind(&p.occupation)
        .bind(&p.allergies)
        .bind(&p.emergency_contact)
        .bind(p.registered_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Replaces every field except `registered_at`.
    pub async fn update(&self, p: &Patient) -> DbResult<()> {
        debug!(id = %p.id, "Updating patient");

        let result = sqlx::query(
            r#"
            UPDATE patients SET
                name = ?2,
                age = ?3,
                gender = ?4,
                phone = ?5,
                email = ?6,
                district = ?7,
                state = ?8,
                occupation = ?9,
                allergies = ?10,
                emergency_contact = ?11
            WHERE id = ?1
            "#,
        )
        .bind(&p.id)
        .bind(&p.name)
        .bind(p.age)
        .bind(p.gender)
        .bind(&p.phone)
        .bind(&p.email)
        .bind(&p.district)
        .bind(&p.state)
        .bind(&p.occupation)
        .bind(&p.allergies)
        .bind(&p.emergency_contact)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Patient", &p.id));
        }

        Ok(())
    }

    /// Counts patients (for the dashboard and seeding).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM patients")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

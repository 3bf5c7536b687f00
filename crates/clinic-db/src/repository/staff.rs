//! # Staff Repository

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use clinic_core::Staff;

#[derive(Debug, Clone)]
pub struct StaffRepository {
    pool: SqlitePool,
}

impl StaffRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StaffRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<Staff>> {
        let rows = sqlx::query_as::<_, Staff>("SELECT * FROM staff ORDER BY name COLLATE NOCASE")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Inserts a staff member. Emails are unique (case-insensitive).
    pub async fn insert(&self, s: &Staff) -> DbResult<()> {
        debug!(id = %s.id, role = %s.role, "Inserting staff member");

        sqlx::query(
            r#"
            INSERT INTO staff (id, name, email, phone, role, status, joined_on)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&s.id)
        .bind(&s.name)
        .bind(&s.email)
        .bind(&s.phone)
        .bind(s.role)
        .bind(s.status)
        .bind(s.joined_on)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

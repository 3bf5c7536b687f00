//! # Schema Migrations
//!
//! The clinic schema ships inside the binary (`migrations/sqlite/*.sql`)
//! and is applied on every open.
//!
//! ```text
//! 001_initial_schema.sql   patients … transactions, users, user_roles
//! 002_…                    next change goes here
//! ```
//!
//! Applied files are recorded in `_sqlx_migrations` with a checksum, so an
//! edited file is refused at startup. Schema changes always get a new file.

use sqlx::migrate::Migrator;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::DbResult;

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every pending migration in version order.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let before = migration_status(pool).await?;
    if before.is_current() {
        return Ok(());
    }

    info!(pending = ?before.pending, "Applying schema migrations");
    MIGRATOR.run(pool).await?;
    info!(version = MIGRATOR.migrations.len(), "Schema up to date");
    Ok(())
}

/// Embedded versus applied migrations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub embedded: usize,
    pub applied: usize,
    /// Descriptions of embedded migrations not yet applied.
    pub pending: Vec<String>,
}

impl MigrationStatus {
    pub fn is_current(&self) -> bool {
        self.pending.is_empty()
    }
}

pub async fn migration_status(pool: &SqlitePool) -> DbResult<MigrationStatus> {
    // The bookkeeping table only exists after the first run.
    let applied_versions: Vec<i64> =
        match sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await
        {
            Ok(versions) => versions,
            Err(e) => {
                if !e.to_string().contains("no such table") {
                    warn!(error = %e, "Could not read migration history");
                }
                Vec::new()
            }
        };

    let pending = MIGRATOR
        .migrations
        .iter()
        .filter(|m| !applied_versions.contains(&m.version))
        .map(|m| format!("{:03}_{}", m.version, m.description))
        .collect();

    Ok(MigrationStatus {
        embedded: MIGRATOR.migrations.len(),
        applied: applied_versions.len(),
        pending,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_fresh_database_reports_pending() {
        let db = Database::new(DbConfig::in_memory().run_migrations(false))
            .await
            .unwrap();

        let status = migration_status(db.pool()).await.unwrap();
        assert_eq!(status.applied, 0);
        assert!(!status.is_current());
        assert!(status.pending[0].starts_with("001_"));

        run_migrations(db.pool()).await.unwrap();
        run_migrations(db.pool()).await.unwrap();

        let status = migration_status(db.pool()).await.unwrap();
        assert!(status.is_current());
        assert_eq!(status.applied, status.embedded);
    }
}

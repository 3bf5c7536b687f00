//! # Database Pool Management
//!
//! Opens the clinic's SQLite file and hands out repositories over one pool.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CLINIC_DATA_BACKEND=sqlite                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(CLINIC_SQLITE_PATH)  or  DbConfig::in_memory() (tests)   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new ── WAL, foreign keys, busy timeout                       │
//! │       │                                                                 │
//! │       ├── migrations (embedded, idempotent)                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.patients() / db.inventory() / db.invoices() ...                     │
//! │       each repository holds a clone of the same SqlitePool              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! WAL lets dashboards read while the cash desk writes. SQLite still has a
//! single writer; two desks recording invoices at once queue on the busy
//! timeout instead of failing with `SQLITE_BUSY`.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations::{self, MigrationStatus};
use crate::repository::consultation::ConsultationRepository;
use crate::repository::inventory::InventoryRepository;
use crate::repository::invoice::InvoiceRepository;
use crate::repository::order::OrderRepository;
use crate::repository::patient::PatientRepository;
use crate::repository::prescription::PrescriptionRepository;
use crate::repository::staff::StaffRepository;
use crate::repository::supplier::SupplierRepository;
use crate::repository::user::UserRepository;

/// Tables reported by [`Database::table_counts`], in display order.
pub const CLINIC_TABLES: &[&str] = &[
    "patients",
    "consultations",
    "prescriptions",
    "inventory",
    "stock_adjustments",
    "staff",
    "suppliers",
    "orders",
    "invoices",
    "transactions",
    "users",
];

// =============================================================================
// Configuration
// =============================================================================

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    /// A file, created on first open.
    File(PathBuf),
    /// A private in-memory database that disappears with the pool.
    Memory,
}

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub storage: Storage,

    /// Pool size. Forced to 1 for [`Storage::Memory`].
    pub max_connections: u32,

    /// How long a writer waits for the lock before giving up.
    pub busy_timeout: Duration,

    /// How long a request waits for a free connection.
    pub acquire_timeout: Duration,

    pub run_migrations: bool,
}

impl DbConfig {
    /// A file-backed database at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            storage: Storage::File(path.into()),
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
            acquire_timeout: Duration::from_secs(30),
            run_migrations: true,
        }
    }

    /// An isolated in-memory database with the schema applied.
    pub fn in_memory() -> Self {
        DbConfig {
            storage: Storage::Memory,
            max_connections: 1,
            busy_timeout: Duration::from_secs(5),
            acquire_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    fn connect_options(&self) -> SqliteConnectOptions {
        let options = match &self.storage {
            Storage::File(path) => SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal),
            // WAL is unavailable for in-memory databases.
            Storage::Memory => SqliteConnectOptions::new()
                .in_memory(true)
                .journal_mode(SqliteJournalMode::Memory),
        };

        options
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout)
    }

    fn pool_options(&self) -> SqlitePoolOptions {
        match self.storage {
            // The database lives and dies with its only connection.
            Storage::Memory => SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None),
            Storage::File(_) => SqlitePoolOptions::new()
                .max_connections(self.max_connections.max(1))
                .idle_timeout(Some(Duration::from_secs(600))),
        }
        .acquire_timeout(self.acquire_timeout)
    }

    fn describe(&self) -> String {
        match &self.storage {
            Storage::File(path) => path.display().to_string(),
            Storage::Memory => ":memory:".to_string(),
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Pool handle and repository factory. Clones share the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, brings the schema up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(database = %config.describe(), "Opening clinic database");

        let pool = config
            .pool_options()
            .connect_with(config.connect_options())
            .await
            .map_err(|e| DbError::ConnectionFailed(format!("{}: {e}", config.describe())))?;

        debug!(max_connections = config.max_connections, "Pool ready");

        let db = Database { pool };
        if config.run_migrations {
            migrations::run_migrations(&db.pool).await?;
        }
        Ok(db)
    }

    /// Opens a file database with default settings.
    pub async fn open(path: &Path) -> DbResult<Self> {
        Database::new(DbConfig::new(path)).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migration_status(&self) -> DbResult<MigrationStatus> {
        migrations::migration_status(&self.pool).await
    }

    pub fn patients(&self) -> PatientRepository {
        PatientRepository::new(self.pool.clone())
    }

    pub fn consultations(&self) -> ConsultationRepository {
        ConsultationRepository::new(self.pool.clone())
    }

    pub fn prescriptions(&self) -> PrescriptionRepository {
        PrescriptionRepository::new(self.pool.clone())
    }

    /// Items and their stock adjustment log.
    pub fn inventory(&self) -> InventoryRepository {
        InventoryRepository::new(self.pool.clone())
    }

    pub fn staff(&self) -> StaffRepository {
        StaffRepository::new(self.pool.clone())
    }

    pub fn suppliers(&self) -> SupplierRepository {
        SupplierRepository::new(self.pool.clone())
    }

    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone())
    }

    /// Invoices with their payments and transaction lines.
    pub fn invoices(&self) -> InvoiceRepository {
        InvoiceRepository::new(self.pool.clone())
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    /// Row count of every table in [`CLINIC_TABLES`].
    pub async fn table_counts(&self) -> DbResult<Vec<(&'static str, i64)>> {
        let mut counts = Vec::with_capacity(CLINIC_TABLES.len());
        for table in CLINIC_TABLES {
            // Names come from the constant above, never from input.
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
                .fetch_one(&self.pool)
                .await?;
            counts.push((*table, count));
        }
        Ok(counts)
    }

    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    pub async fn close(&self) {
        info!("Closing clinic database");
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database_is_migrated_and_empty() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);

        let status = db.migration_status().await.unwrap();
        assert!(status.is_current());

        let counts = db.table_counts().await.unwrap();
        assert_eq!(counts.len(), CLINIC_TABLES.len());
        assert!(counts.iter().all(|(_, n)| *n == 0));
    }

    #[tokio::test]
    async fn test_in_memory_databases_are_isolated() {
        let first = Database::new(DbConfig::in_memory()).await.unwrap();
        sqlx::query("CREATE TABLE scratch (id INTEGER)")
            .execute(first.pool())
            .await
            .unwrap();

        let second = Database::new(DbConfig::in_memory()).await.unwrap();
        let clash = sqlx::query("SELECT * FROM scratch").execute(second.pool()).await;
        assert!(clash.is_err());
    }

    #[tokio::test]
    async fn test_file_database_created() {
        let path = std::env::temp_dir().join(format!("clinic-pool-{}.db", uuid::Uuid::new_v4()));
        let db = Database::open(&path).await.unwrap();
        assert!(path.exists());
        db.close().await;
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/clinic-test.db")
            .max_connections(10)
            .busy_timeout(Duration::from_secs(1))
            .run_migrations(false);

        assert_eq!(config.storage, Storage::File(PathBuf::from("/tmp/clinic-test.db")));
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.busy_timeout, Duration::from_secs(1));
        assert!(!config.run_migrations);
        assert_eq!(DbConfig::in_memory().describe(), ":memory:");
    }
}

//! # clinic-db: SQLite Backend for Clinic Desk
//!
//! Implements the `DataService` contract on a local SQLite file using sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Clinic Desk Data Flow                            │
//! │                                                                         │
//! │  HTTP handler (POST /api/cash/invoices)                                 │
//! │       │                                                                 │
//! │       ▼  Arc<dyn DataService>                                          │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     clinic-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ PatientRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ InventoryRepo │    │ 001_initial  │  │   │
//! │  │   │ WAL + FKs     │    │ InvoiceRepo   │    │   _schema    │  │   │
//! │  │   └───────────────┘    │ ...           │    └──────────────┘  │   │
//! │  │           ▲            └───────────────┘                       │   │
//! │  │           │                                                    │   │
//! │  │   SqliteDataService (service.rs): validation + error mapping   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ./clinic.db (CLINIC_SQLITE_PATH)                              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - One repository per table group
//! - [`service`] - The `DataService` implementation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use clinic_core::DataService;
//! use clinic_db::SqliteDataService;
//!
//! let service = SqliteDataService::connect("./clinic.db").await?;
//! let low = service.get_inventory().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use migrations::MigrationStatus;
pub use pool::{Database, DbConfig, Storage};
pub use repository::user::hash_password;
pub use service::SqliteDataService;

// Repository re-exports for convenience
pub use repository::inventory::InventoryRepository;
pub use repository::invoice::InvoiceRepository;
pub use repository::patient::PatientRepository;
pub use repository::user::UserRepository;

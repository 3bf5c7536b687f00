//! # clinic-sheets: Google Sheets Backend for Clinic Desk
//!
//! Implements the `DataService` contract on one Google spreadsheet. Each
//! entity lives in its own tab; row 1 names the columns and every later
//! row is one record.
//!
//! ## Layering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  SheetsDataService (service.rs)                                         │
//! │    validation, references, stock arithmetic, sagas                     │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Table / SheetRecord (codec.rs, records.rs)                             │
//! │    header-keyed rows  ◄──►  Patient, Consultation, Invoice, ...        │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  SheetsTransport (transport.rs)                                         │
//! │    ├── GoogleSheetsClient  Sheets v4 REST + service-account OAuth      │
//! │    └── MemorySheets        tests, local runs, fault injection          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tabs
//!
//! `Patients`, `Consultations`, `Prescriptions`, `Inventory`,
//! `StockAdjustments`, `Staff`, `Suppliers`, `Transactions`, `Orders`,
//! `Invoices`, `InvoicePayments`, `UserRoles`.
//!
//! Column order inside a tab does not matter; headers are matched ignoring
//! case, spaces and hyphens.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use clinic_sheets::{ServiceAccount, SheetsDataService};
//!
//! let account = ServiceAccount::new(client_email, private_key_pem);
//! let service = SheetsDataService::connect(spreadsheet_id, account)?;
//! let roles = service.get_user_roles("asha@clinic.in").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod auth;
pub mod client;
pub mod codec;
pub mod error;
pub mod memory;
pub mod records;
mod saga;
pub mod service;
pub mod transport;

// =============================================================================
// Re-exports
// =============================================================================

pub use auth::{ServiceAccount, TokenProvider};
pub use client::GoogleSheetsClient;
pub use error::{SheetsError, SheetsResult};
pub use memory::MemorySheets;
pub use service::SheetsDataService;
pub use transport::SheetsTransport;

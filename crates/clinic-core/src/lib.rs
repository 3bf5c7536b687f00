//! # clinic-core: Pure Domain Logic for Clinic Desk
//!
//! Everything the clinic back office knows about patients, billing and
//! stock, with no I/O. Storage adapters and the HTTP server depend on this
//! crate; it depends on neither.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Clinic Desk Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 clinic-api (axum, JSON over HTTP)               │   │
//! │  │   sign-in ─► patients ─► consultations ─► cash desk ─► reports  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ Arc<dyn DataService>                   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ clinic-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │  ┌────────┐ ┌────────┐ ┌─────────┐ ┌────────┐ ┌────────────┐  │   │
//! │  │  │ types  │ │ money  │ │ invoice │ │ access │ │  service   │  │   │
//! │  │  │ report │ │        │ │         │ │        │ │ DataService│  │   │
//! │  │  └────────┘ └────────┘ └─────────┘ └────────┘ └────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └──────────────┬──────────────────────────────────┬───────────────┘   │
//! │                 │                                  │                    │
//! │  ┌──────────────▼──────────────┐   ┌───────────────▼──────────────┐   │
//! │  │  clinic-db (SQLite, sqlx)   │   │ clinic-sheets (Sheets v4)    │   │
//! │  └─────────────────────────────┘   └──────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records and label enums
//! - [`money`] - Integer paise arithmetic
//! - [`invoice`] - Invoice lines, payment splits, reconciliation
//! - [`validation`] - Field and record rules
//! - [`access`] - Role to area matrix
//! - [`report`] - Stock movement, expiry and revenue aggregations
//! - [`service`] - The `DataService` contract and `ServiceError`
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use clinic_core::invoice::{Invoice, InvoiceDraft, InvoiceItemDraft, PaymentSplit};
//! use clinic_core::{InvoiceItemType, Money, PaymentMethod};
//!
//! let draft = InvoiceDraft {
//!     patient_id: "p-1".to_string(),
//!     consultation_id: None,
//!     items: vec![InvoiceItemDraft {
//!         item_type: InvoiceItemType::Consultation,
//!         category: "General".to_string(),
//!         description: "OPD consultation".to_string(),
//!         inventory_item_id: None,
//!         quantity: 1,
//!         amount: Money::parse_decimal("500").unwrap(),
//!     }],
//!     payments: vec![PaymentSplit { method: PaymentMethod::Cash, amount: Money::from_rupees(500) }],
//! };
//!
//! let invoice = Invoice::from_draft(draft, "cashier@clinic.in").unwrap();
//! assert_eq!(invoice.total.paise(), 50000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod error;
pub mod invoice;
pub mod money;
pub mod report;
pub mod service;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use access::{can_access, reachable_areas, Area};
pub use error::{CoreError, CoreResult, ValidationError};
pub use invoice::{Invoice, InvoiceDraft, InvoiceItem, PaymentSplit};
pub use money::Money;
pub use service::{
    BackendKind, DataService, RowUpdate, ServiceError, ServiceResult, SheetRows, UserAccounts,
};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity on one invoice line or purchase order.
///
/// Catches a mistyped `1000` for `10` at the billing desk.
pub const MAX_ITEM_QUANTITY: i64 = 9999;

/// Maximum lines on one invoice.
pub const MAX_INVOICE_ITEMS: usize = 100;

/// Upper bound for names, IDs and short labels.
pub const MAX_NAME_LEN: usize = 200;

/// Upper bound for free text (notes, diagnosis, allergies).
pub const MAX_TEXT_LEN: usize = 2000;

pub const MAX_AGE: i64 = 150;

/// Largest unit amount accepted for a fee, price or invoice line (₹1 crore).
///
/// With [`MAX_ITEM_QUANTITY`] and [`MAX_INVOICE_ITEMS`] this keeps every
/// invoice total far inside `i64`.
pub const MAX_AMOUNT_PAISE: i64 = 1_000_000_000;

/// Largest single stock adjustment, in either direction.
pub const MAX_STOCK_DELTA: i64 = 1_000_000;

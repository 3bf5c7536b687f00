//! # DataService Contract
//!
//! The persistence contract every backend implements.
//!
//! ## Backend Selection
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   BackendConfig (env, read once)                                        │
//! │        │                                                                │
//! │        ├── Sqlite { path } ─────────► SqliteDataService   (clinic-db)   │
//! │        │                                                                │
//! │        └── GoogleSheets { .. } ─────► SheetsDataService (clinic-sheets) │
//! │                                             │                           │
//! │                                             ▼                           │
//! │                             Arc<dyn DataService> in AppState            │
//! │                                                                         │
//! │   Chosen once at start-up. Handlers only ever see the trait object.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Optional Capabilities
//! Some operations only make sense for one backend. Rather than methods
//! that fail at runtime, they live on separate traits reached through
//! accessors that return `None` when unsupported:
//!
//! | Capability | Trait | Backend |
//! |---|---|---|
//! | Raw row writes | [`SheetRows`] | Google Sheets |
//! | Password accounts | [`UserAccounts`] | SQLite |

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::error::{CoreError, ValidationError};
use crate::invoice::Invoice;
use crate::types::{
    Consultation, ConsultationStatus, DateRange, InventoryItem, NewUser, Order, OrderStatus, Patient,
    Prescription, Role, Staff, StockAdjustment, Supplier, Transaction, UserAccount,
};

// =============================================================================
// Backend Kind
// =============================================================================

/// Which storage a `DataService` talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    Sqlite,
    GoogleSheets,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Sqlite => f.write_str("sqlite"),
            BackendKind::GoogleSheets => f.write_str("google-sheets"),
        }
    }
}

// =============================================================================
// Service Error
// =============================================================================

/// Errors returned by any `DataService` implementation.
///
/// Adapters map their own error types into this enum, so the HTTP layer
/// never depends on sqlx or reqwest.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("{entity} already exists: {detail}")]
    Duplicate { entity: String, detail: String },

    #[error("Insufficient stock for {item}: available {available}, requested {requested}")]
    InsufficientStock {
        item: String,
        available: i64,
        requested: i64,
    },

    /// Input or stored data broke a business rule.
    #[error("{0}")]
    Invalid(String),

    /// The operation is not offered by this backend.
    #[error("{operation} is not supported by the {backend} backend")]
    Unsupported {
        operation: &'static str,
        backend: BackendKind,
    },

    /// The backend failed (I/O, network, auth, bad response).
    #[error("{backend} backend error: {message}")]
    Backend {
        backend: BackendKind,
        message: String,
    },

    /// A multi-step write failed and could not be fully undone.
    #[error("Data may be inconsistent: compensation for {step} failed: {message}")]
    Inconsistent { step: String, message: String },
}

impl ServiceError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        ServiceError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn backend(backend: BackendKind, message: impl Into<String>) -> Self {
        ServiceError::Backend {
            backend,
            message: message.into(),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Invalid(err.to_string())
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientStock {
                item,
                available,
                requested,
            } => ServiceError::InsufficientStock {
                item,
                available,
                requested,
            },
            CoreError::Validation(v) => v.into(),
            other => ServiceError::Invalid(other.to_string()),
        }
    }
}

/// Convenience type alias for Results with ServiceError.
pub type ServiceResult<T> = Result<T, ServiceError>;

// =============================================================================
// DataService
// =============================================================================

/// Read/write access to every clinic entity.
///
/// ## Contract
/// - `get_*` by ID returns [`ServiceError::NotFound`] when absent
/// - `create_*` validates the record and returns it as stored
/// - `update_*` replaces the record with the same ID
/// - Ranges are inclusive calendar dates on the record's timestamp
#[async_trait]
pub trait DataService: Send + Sync {
    fn backend(&self) -> BackendKind;

    // Patients
    async fn get_patients(&self) -> ServiceResult<Vec<Patient>>;
    async fn get_patient(&self, id: &str) -> ServiceResult<Patient>;
    async fn create_patient(&self, patient: Patient) -> ServiceResult<Patient>;
    async fn update_patient(&self, patient: Patient) -> ServiceResult<Patient>;

    // Consultations
    async fn get_consultations(&self) -> ServiceResult<Vec<Consultation>>;
    async fn create_consultation(&self, consultation: Consultation) -> ServiceResult<Consultation>;
    async fn update_consultation_status(
        &self,
        id: &str,
        status: ConsultationStatus,
    ) -> ServiceResult<Consultation>;

    // Prescriptions
    async fn get_prescriptions(&self) -> ServiceResult<Vec<Prescription>>;
    async fn create_prescription(&self, prescription: Prescription) -> ServiceResult<Prescription>;

    // Inventory
    async fn get_inventory(&self) -> ServiceResult<Vec<InventoryItem>>;
    async fn get_inventory_item(&self, id: &str) -> ServiceResult<InventoryItem>;
    async fn create_inventory_item(&self, item: InventoryItem) -> ServiceResult<InventoryItem>;
    async fn update_inventory_item(&self, item: InventoryItem) -> ServiceResult<InventoryItem>;

    /// Applies `quantity_delta` to the item, records the adjustment and
    /// returns the updated item. Fails with `InsufficientStock` rather
    /// than going negative.
    async fn adjust_stock(&self, adjustment: StockAdjustment) -> ServiceResult<InventoryItem>;
    async fn get_stock_adjustments(&self, range: DateRange) -> ServiceResult<Vec<StockAdjustment>>;

    // Staff
    async fn get_staff(&self) -> ServiceResult<Vec<Staff>>;
    async fn create_staff(&self, staff: Staff) -> ServiceResult<Staff>;

    // Suppliers
    async fn get_suppliers(&self) -> ServiceResult<Vec<Supplier>>;
    async fn create_supplier(&self, supplier: Supplier) -> ServiceResult<Supplier>;
    async fn update_supplier(&self, supplier: Supplier) -> ServiceResult<Supplier>;

    // Transactions
    async fn get_transactions(&self, range: DateRange) -> ServiceResult<Vec<Transaction>>;

    // Orders
    async fn get_orders(&self) -> ServiceResult<Vec<Order>>;
    async fn create_order(&self, order: Order) -> ServiceResult<Order>;

    /// Moves an order along its lifecycle. Moving to `Received` adds the
    /// ordered quantity to stock with a `Purchase` adjustment attributed
    /// to `changed_by`.
    async fn update_order_status(
        &self,
        id: &str,
        status: OrderStatus,
        changed_by: &str,
    ) -> ServiceResult<Order>;

    // Roles
    /// Roles for a user. An unknown email yields an empty list, not an
    /// error.
    async fn get_user_roles(&self, email: &str) -> ServiceResult<Vec<Role>>;

    // Billing
    /// Persists a validated invoice with its lines, payments, stock
    /// withdrawals and consultation completion, all or nothing.
    async fn record_invoice(&self, invoice: Invoice) -> ServiceResult<Invoice>;

    /// Raw row writes, for spreadsheet-backed stores.
    fn sheet_rows(&self) -> Option<&dyn SheetRows> {
        None
    }

    /// Password accounts, for stores that keep credentials.
    fn user_accounts(&self) -> Option<&dyn UserAccounts> {
        None
    }
}

// =============================================================================
// Capabilities
// =============================================================================

/// One row rewrite inside a [`SheetRows::batch_update`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowUpdate {
    pub sheet: String,
    /// 1-based sheet row. Row 1 is the header and cannot be written.
    pub row: u32,
    pub values: Vec<String>,
}

/// Direct row access on spreadsheet backends.
#[async_trait]
pub trait SheetRows: Send + Sync {
    /// Appends a row and returns the A1 range that was written.
    async fn append_row(&self, sheet: &str, values: Vec<String>) -> ServiceResult<String>;

    /// Overwrites one row starting at column A.
    async fn update_row(&self, sheet: &str, row: u32, values: Vec<String>) -> ServiceResult<()>;

    /// Overwrites several rows in one request.
    async fn batch_update(&self, updates: Vec<RowUpdate>) -> ServiceResult<()>;
}

/// Password-based accounts.
#[async_trait]
pub trait UserAccounts: Send + Sync {
    /// Returns the account when the password matches, `None` otherwise
    /// (unknown email and wrong password are indistinguishable).
    async fn authenticate_user(&self, email: &str, password: &str) -> ServiceResult<Option<UserAccount>>;

    async fn create_user(&self, user: NewUser) -> ServiceResult<UserAccount>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_mapping() {
        let err: ServiceError = CoreError::InsufficientStock {
            item: "Cetirizine".to_string(),
            available: 2,
            requested: 5,
        }
        .into();
        assert!(matches!(err, ServiceError::InsufficientStock { available: 2, .. }));

        let err: ServiceError = CoreError::EmptyInvoice.into();
        assert!(matches!(err, ServiceError::Invalid(msg) if msg == "Invoice has no items"));

        let err: ServiceError = CoreError::Validation(ValidationError::required("name")).into();
        assert!(matches!(err, ServiceError::Invalid(msg) if msg == "name is required"));
    }

    #[test]
    fn test_backend_kind_labels() {
        assert_eq!(BackendKind::GoogleSheets.to_string(), "google-sheets");
        assert_eq!(
            serde_json::to_string(&BackendKind::Sqlite).unwrap(),
            "\"sqlite\""
        );
    }
}

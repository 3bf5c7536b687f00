//! # Sheets Error Types
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sheets Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │   Transport     │  │   Sheet data    │  │     Domain              │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Auth           │  │  MissingSheet   │  │  NotFound               │ │
//! │  │  Network        │  │  MissingColumn  │  │  Duplicate              │ │
//! │  │  Api (non-2xx)  │  │  InvalidRow     │  │  InsufficientStock      │ │
//! │  │  InvalidResponse│  │  InvalidRange   │  │  Rule (CoreError)       │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  Compensation: a saga step could not be undone                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Transport and sheet-data errors reach callers as
//! `ServiceError::Backend { backend: GoogleSheets, .. }` after being logged.

use clinic_core::{BackendKind, CoreError, ServiceError, ValidationError};
use thiserror::Error;

/// Result type alias for Sheets operations.
pub type SheetsResult<T> = Result<T, SheetsError>;

#[derive(Debug, Error)]
pub enum SheetsError {
    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Token exchange or key loading failed.
    #[error("Google auth failed: {0}")]
    Auth(String),

    /// Request never got a response.
    #[error("Network error: {0}")]
    Network(String),

    /// The API answered with a non-2xx status.
    #[error("Sheets API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A 2xx response whose body did not have the expected shape.
    #[error("Unexpected Sheets response: {0}")]
    InvalidResponse(String),

    // =========================================================================
    // Sheet Data Errors
    // =========================================================================
    /// The tab does not exist or has no header row.
    #[error("Sheet '{0}' is missing or has no header row")]
    MissingSheet(String),

    /// A required header is absent from row 1.
    #[error("Sheet '{sheet}' has no '{column}' column")]
    MissingColumn { sheet: String, column: String },

    /// A stored row could not be decoded into a record.
    #[error("Invalid row {row} in '{sheet}': {reason}")]
    InvalidRow { sheet: String, row: u32, reason: String },

    /// A range string or row number the adapter cannot address.
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    // =========================================================================
    // Domain Errors
    // =========================================================================
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

    /// A record points at a row that does not exist.
    #[error("Referenced {entity} does not exist: {id}")]
    MissingReference { entity: String, id: String },

    #[error(transparent)]
    Rule(#[from] CoreError),

    /// Undoing a saga step failed after an earlier failure.
    #[error("Compensation for {step} failed: {message}")]
    Compensation { step: String, message: String },
}

impl SheetsError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        SheetsError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn invalid_row(sheet: &str, row: u32, reason: impl Into<String>) -> Self {
        SheetsError::InvalidRow {
            sheet: sheet.to_string(),
            row,
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for SheetsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SheetsError::InvalidResponse(err.to_string())
        } else if let Some(status) = err.status() {
            SheetsError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            SheetsError::Network(err.to_string())
        }
    }
}

impl From<ValidationError> for SheetsError {
    fn from(err: ValidationError) -> Self {
        SheetsError::Rule(err.into())
    }
}

impl From<SheetsError> for ServiceError {
    fn from(err: SheetsError) -> Self {
        match err {
            SheetsError::NotFound { entity, id } => ServiceError::NotFound { entity, id },
            SheetsError::Duplicate { entity, detail } => ServiceError::Duplicate { entity, detail },
            SheetsError::InsufficientStock {
                item,
                available,
                requested,
            } => ServiceError::InsufficientStock {
                item,
                available,
                requested,
            },
            missing @ SheetsError::MissingReference { .. } => ServiceError::Invalid(missing.to_string()),
            SheetsError::Rule(core) => core.into(),
            SheetsError::Compensation { step, message } => {
                tracing::error!(step = %step, error = %message, "Sheets left partially written");
                ServiceError::Inconsistent { step, message }
            }
            other => {
                tracing::error!(error = %other, "Google Sheets backend failure");
                ServiceError::backend(BackendKind::GoogleSheets, other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_row_is_a_backend_error() {
        let err: ServiceError = SheetsError::invalid_row("Patients", 7, "age: not a number").into();
        match err {
            ServiceError::Backend { backend, message } => {
                assert_eq!(backend, BackendKind::GoogleSheets);
                assert!(message.contains("row 7"));
                assert!(message.contains("Patients"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_compensation_maps_to_inconsistent() {
        let err: ServiceError = SheetsError::Compensation {
            step: "append Transactions".to_string(),
            message: "503".to_string(),
        }
        .into();
        assert!(matches!(err, ServiceError::Inconsistent { ref step, .. } if step == "append Transactions"));
    }
}

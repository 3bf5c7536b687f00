//! # Error Types
//!
//! Domain-specific error types for clinic-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  clinic-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  clinic-core service contract (service.rs)                             │
//! │  └── ServiceError     - What any DataService adapter returns           │
//! │                                                                         │
//! │  Adapter errors (separate crates)                                      │
//! │  ├── DbError          - SQLite failures     ──► ServiceError           │
//! │  └── SheetsError      - Sheets API failures ──► ServiceError           │
//! │                                                                         │
//! │  HTTP errors (in app)                                                  │
//! │  └── ApiError         - What the web client sees (JSON)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (IDs, amounts)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An invoice must bill at least one line.
    #[error("Invoice has no items")]
    EmptyInvoice,

    /// Payment splits do not add up to the invoice total.
    ///
    /// ## User Workflow
    /// ```text
    /// Invoice total:  ₹650.00  (65000 paise)
    /// Cash:           ₹500.00
    /// UPI:            ₹100.00
    ///      │
    ///      ▼
    /// PaymentMismatch { expected: 65000, received: 60000 }
    ///      │
    ///      ▼
    /// UI shows: "Payments total ₹600.00 but invoice is ₹650.00"
    /// ```
    ///
    /// Comparison is exact on integer paise, so `0.1 + 0.2` style drift
    /// cannot cause a false mismatch.
    #[error("Payments total {received} but invoice total is {expected}")]
    PaymentMismatch { expected: Money, received: Money },

    /// A payment split carries a negative amount.
    #[error("Payment via {method} cannot be negative")]
    NegativePayment { method: String },

    /// Discounts exceed the billed lines.
    #[error("Invoice total {total} is negative")]
    NegativeInvoiceTotal { total: Money },

    /// Stock cannot go below zero.
    #[error("Insufficient stock for {item}: available {available}, requested {requested}")]
    InsufficientStock {
        item: String,
        available: i64,
        requested: i64,
    },

    /// A status change that the record's lifecycle does not allow.
    ///
    /// ## When This Occurs
    /// - Moving a `Received` order back to `Pending`
    /// - Cancelling an order that was already received
    #[error("{entity} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        entity: String,
        from: String,
        to: String,
    },

    /// An amount or stock count left the representable range.
    #[error("{what} is out of range")]
    Overflow { what: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised both for HTTP request bodies and for rows read back from a
/// spreadsheet, where anyone with edit access can type anything.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date, bad amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Shorthand for [`ValidationError::InvalidFormat`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_mismatch_message() {
        let err = CoreError::PaymentMismatch {
            expected: Money::from_paise(65000),
            received: Money::from_paise(60000),
        };
        assert_eq!(
            err.to_string(),
            "Payments total ₹600.00 but invoice total is ₹650.00"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(ValidationError::required("name").to_string(), "name is required");
        assert_eq!(
            ValidationError::invalid("date", "expected YYYY-MM-DD").to_string(),
            "date has invalid format: expected YYYY-MM-DD"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("phone").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}

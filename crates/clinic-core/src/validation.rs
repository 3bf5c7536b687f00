//! # Validation Module
//!
//! Input validation for clinic records.
//!
//! ## Where Validation Runs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  HTTP request body ──► serde (types, enum labels)                      │
//! │                           │                                             │
//! │                           ▼                                             │
//! │                  THIS MODULE: field + record rules                      │
//! │                           ▲                                             │
//! │                           │                                             │
//! │  Spreadsheet row ──► row codec (header lookup, cell parsing)           │
//! │                                                                         │
//! │  SQLite adds NOT NULL / UNIQUE / FK / CHECK constraints on top.        │
//! │  Sheets has nothing below this module, so every row read back is       │
//! │  checked again.                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use clinic_core::validation::{validate_phone, validate_quantity};
//!
//! validate_phone("+91 98765 43210").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{
    Consultation, InventoryItem, Order, Patient, Prescription, Staff, StockAdjustment, Supplier,
};
use crate::{
    MAX_AGE, MAX_AMOUNT_PAISE, MAX_ITEM_QUANTITY, MAX_NAME_LEN, MAX_STOCK_DELTA, MAX_TEXT_LEN,
};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required text field.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most `max` characters
pub fn validate_required(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates an optional free-text field (notes, allergies, address).
pub fn validate_optional(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

/// Validates an email address.
///
/// Deliberately loose: one `@`, something on each side, a dot in the
/// domain, no whitespace.
///
/// ## Example
/// ```rust
/// use clinic_core::validation::validate_email;
///
/// assert!(validate_email("dr.rao@clinic.in").is_ok());
/// assert!(validate_email("dr.rao@clinic").is_err());
/// assert!(validate_email("").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::required("email"));
    }

    let invalid = || ValidationError::invalid("email", "expected name@domain");
    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    match domain.split_once('.') {
        Some((host, tld)) if !host.is_empty() && !tld.is_empty() && !tld.ends_with('.') => Ok(()),
        _ => Err(invalid()),
    }
}

/// Validates a phone number.
///
/// ## Rules
/// - Optional leading `+`
/// - Spaces, hyphens and parentheses are ignored
/// - 7 to 15 digits (E.164 upper bound)
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Err(ValidationError::required("phone"));
    }

    let body = phone.strip_prefix('+').unwrap_or(phone);
    let mut digits = 0;
    for c in body.chars() {
        match c {
            '0'..='9' => digits += 1,
            ' ' | '-' | '(' | ')' => {}
            _ => {
                return Err(ValidationError::invalid(
                    "phone",
                    "must contain only digits, spaces, hyphens and a leading +",
                ))
            }
        }
    }

    if !(7..=15).contains(&digits) {
        return Err(ValidationError::invalid("phone", "must have 7 to 15 digits"));
    }

    Ok(())
}

/// Parses a `YYYY-MM-DD` date.
///
/// ## Example
/// ```rust
/// use clinic_core::validation::parse_date;
///
/// assert!(parse_date("expiry_date", "2027-03-31").is_ok());
/// assert!(parse_date("expiry_date", "31/03/2027").is_err());
/// ```
pub fn parse_date(field: &str, text: &str) -> ValidationResult<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::invalid(field, "expected YYYY-MM-DD"))
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line or order quantity.
///
/// ## Rules
/// - At least 1
/// - At most [`MAX_ITEM_QUANTITY`]
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price or fee. Zero is allowed (free follow-ups, samples).
pub fn validate_price(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() || amount.paise() > MAX_AMOUNT_PAISE {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_PAISE,
        });
    }

    Ok(())
}

/// Validates a signed amount such as an invoice line, where discounts are
/// negative. The magnitude is capped at [`MAX_AMOUNT_PAISE`].
pub fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.paise().unsigned_abs() > MAX_AMOUNT_PAISE.unsigned_abs() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: -MAX_AMOUNT_PAISE,
            max: MAX_AMOUNT_PAISE,
        });
    }

    Ok(())
}

/// Validates a non-negative count such as stock or reorder level.
pub fn validate_non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Record Validators
// =============================================================================

pub fn validate_patient(p: &Patient) -> ValidationResult<()> {
    validate_required("id", &p.id, MAX_NAME_LEN)?;
    validate_required("name", &p.name, MAX_NAME_LEN)?;
    if !(0..=MAX_AGE).contains(&p.age) {
        return Err(ValidationError::OutOfRange {
            field: "age".to_string(),
            min: 0,
            max: MAX_AGE,
        });
    }
    validate_phone(&p.phone)?;
    if let Some(email) = p.email.as_deref() {
        validate_email(email)?;
    }
    validate_required("district", &p.district, MAX_NAME_LEN)?;
    validate_required("state", &p.state, MAX_NAME_LEN)?;
    validate_optional("occupation", p.occupation.as_deref(), MAX_NAME_LEN)?;
    validate_optional("allergies", p.allergies.as_deref(), MAX_TEXT_LEN)?;
    validate_optional("emergency_contact", p.emergency_contact.as_deref(), MAX_NAME_LEN)?;
    Ok(())
}

pub fn validate_consultation(c: &Consultation) -> ValidationResult<()> {
    validate_required("id", &c.id, MAX_NAME_LEN)?;
    validate_required("patient_id", &c.patient_id, MAX_NAME_LEN)?;
    validate_email(&c.doctor_email)?;
    validate_required("chief_complaint", &c.chief_complaint, MAX_TEXT_LEN)?;
    validate_optional("diagnosis", Some(&c.diagnosis), MAX_TEXT_LEN)?;
    validate_optional("notes", c.notes.as_deref(), MAX_TEXT_LEN)?;
    validate_price("fee", c.fee)
}

/// Every medicine needs a name and a positive quantity; the total may be
/// zero when the patient buys elsewhere.
pub fn validate_prescription(p: &Prescription) -> ValidationResult<()> {
    validate_required("id", &p.id, MAX_NAME_LEN)?;
    validate_required("consultation_id", &p.consultation_id, MAX_NAME_LEN)?;
    if p.medicines.is_empty() {
        return Err(ValidationError::required("medicines"));
    }
    for m in &p.medicines {
        validate_required("medicine_name", &m.medicine_name, MAX_NAME_LEN)?;
        validate_quantity(m.quantity)?;
        if m.duration_days <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "duration_days".to_string(),
            });
        }
    }
    validate_price("total_cost", p.total_cost)
}

pub fn validate_inventory_item(item: &InventoryItem) -> ValidationResult<()> {
    validate_required("id", &item.id, MAX_NAME_LEN)?;
    validate_required("name", &item.name, MAX_NAME_LEN)?;
    validate_required("unit", &item.unit, 30)?;
    validate_non_negative("stock", item.stock)?;
    validate_non_negative("reorder_level", item.reorder_level)?;
    validate_price("cost_price", item.cost_price)?;
    validate_price("selling_price", item.selling_price)?;
    validate_optional("batch_number", item.batch_number.as_deref(), 50)
}

pub fn validate_stock_adjustment(adj: &StockAdjustment) -> ValidationResult<()> {
    validate_required("inventory_item_id", &adj.inventory_item_id, MAX_NAME_LEN)?;
    if adj.quantity_delta == 0 {
        return Err(ValidationError::invalid("quantity_delta", "must not be zero"));
    }
    if adj.quantity_delta.unsigned_abs() > MAX_STOCK_DELTA.unsigned_abs() {
        return Err(ValidationError::OutOfRange {
            field: "quantity_delta".to_string(),
            min: -MAX_STOCK_DELTA,
            max: MAX_STOCK_DELTA,
        });
    }
    validate_required("adjusted_by", &adj.adjusted_by, MAX_NAME_LEN)?;
    validate_optional("note", adj.note.as_deref(), MAX_TEXT_LEN)
}

pub fn validate_staff(s: &Staff) -> ValidationResult<()> {
    validate_required("id", &s.id, MAX_NAME_LEN)?;
    validate_required("name", &s.name, MAX_NAME_LEN)?;
    validate_email(&s.email)?;
    validate_phone(&s.phone)
}

pub fn validate_supplier(s: &Supplier) -> ValidationResult<()> {
    validate_required("id", &s.id, MAX_NAME_LEN)?;
    validate_required("name", &s.name, MAX_NAME_LEN)?;
    validate_required("contact_person", &s.contact_person, MAX_NAME_LEN)?;
    validate_phone(&s.phone)?;
    if let Some(email) = s.email.as_deref() {
        validate_email(email)?;
    }
    validate_optional("address", s.address.as_deref(), MAX_TEXT_LEN)?;
    if let Some(gst) = s.gst_number.as_deref() {
        validate_gst_number(gst)?;
    }
    Ok(())
}

/// Indian GSTIN: 15 alphanumeric characters.
fn validate_gst_number(gst: &str) -> ValidationResult<()> {
    let gst = gst.trim();
    if gst.len() != 15 || !gst.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::invalid(
            "gst_number",
            "must be 15 letters and digits",
        ));
    }
    Ok(())
}

/// Checks quantities and that `total_cost == quantity × unit_cost`.
pub fn validate_order(o: &Order) -> ValidationResult<()> {
    validate_required("id", &o.id, MAX_NAME_LEN)?;
    validate_required("supplier_id", &o.supplier_id, MAX_NAME_LEN)?;
    validate_required("inventory_item_id", &o.inventory_item_id, MAX_NAME_LEN)?;
    validate_quantity(o.quantity)?;
    validate_price("unit_cost", o.unit_cost)?;
    if o.unit_cost.checked_mul(o.quantity) != Some(o.total_cost) {
        return Err(ValidationError::invalid(
            "total_cost",
            "must equal quantity times unit_cost",
        ));
    }
    if let Some(expected) = o.expected_on {
        if expected < o.ordered_on {
            return Err(ValidationError::invalid(
                "expected_on",
                "cannot be before ordered_on",
            ));
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

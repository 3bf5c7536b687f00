//! # Domain Types
//!
//! Core records shared by every backend and by the HTTP API.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────┐   ┌────────────────┐   ┌──────────────────┐          │
//! │  │   Patient    │◄──│  Consultation  │◄──│   Prescription   │          │
//! │  │  demographics│   │  doctor_email  │   │  medicines[]     │          │
//! │  └──────┬───────┘   │  fee, status   │   │  total_cost      │          │
//! │         │           └───────┬────────┘   └──────────────────┘          │
//! │         │                   │                                           │
//! │         ▼                   ▼                                           │
//! │  ┌──────────────────────────────────┐    ┌──────────────────┐          │
//! │  │ Transaction (persisted invoice   │───►│  InventoryItem   │◄─┐       │
//! │  │ line) ── invoice_id              │    │  stock, prices   │  │       │
//! │  └──────────────────────────────────┘    └────────┬─────────┘  │       │
//! │                                                   │            │       │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────▼───────┐    │       │
//! │  │    Staff     │   │   Supplier   │◄──│      Order       │────┘       │
//! │  │  role,status │   │   status     │   │  status          │            │
//! │  └──────────────┘   └──────────────┘   └──────────────────┘            │
//! │                                                                         │
//! │  References are plain string IDs; there is no object graph.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Label Enums
//! Every status/category enum is stored and exchanged by a human label
//! (`"Follow-up"`, `"cash_manager"`) so spreadsheet users can type values
//! by hand. Parsing ignores case and treats `-`, `_` and spaces alike.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;

// =============================================================================
// Label Enum Macro
// =============================================================================

/// Lowercases and drops separators so `"Follow-up"`, `"follow_up"` and
/// `"FOLLOW UP"` compare equal.
fn normalize_label(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
        #[ts(export)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $label)]
                #[cfg_attr(feature = "sqlx", sqlx(rename = $label))]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The stored label.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let needle = normalize_label(s);
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| normalize_label(v.as_str()) == needle)
                    .ok_or_else(|| ValidationError::NotAllowed {
                        field: stringify!($name).to_string(),
                        allowed: $name::ALL.iter().map(|v| v.as_str().to_string()).collect(),
                    })
            }
        }
    };
}

// =============================================================================
// Enums
// =============================================================================

labelled_enum! {
    /// Access role attached to a user. See [`crate::access`].
    Role {
        Admin => "admin",
        Doctor => "doctor",
        Pharmacist => "pharmacist",
        CashManager => "cash_manager",
        StockManager => "stock_manager",
    }
}

labelled_enum! {
    Gender {
        Male => "Male",
        Female => "Female",
        Other => "Other",
    }
}

labelled_enum! {
    /// Consultation lifecycle. Recording an invoice against a consultation
    /// marks it `Completed`.
    ConsultationStatus {
        Completed => "Completed",
        Pending => "Pending",
        FollowUp => "Follow-up",
    }
}

labelled_enum! {
    InventoryCategory {
        Medicine => "Medicine",
        Consumable => "Consumable",
        Equipment => "Equipment",
        Supplement => "Supplement",
        Other => "Other",
    }
}

labelled_enum! {
    /// Why stock moved.
    AdjustmentReason {
        Sale => "Sale",
        Purchase => "Purchase",
        Damage => "Damage",
        Expiry => "Expiry",
        Return => "Return",
        Correction => "Correction",
    }
}

labelled_enum! {
    StaffStatus {
        Active => "Active",
        OnLeave => "On Leave",
        Inactive => "Inactive",
    }
}

labelled_enum! {
    SupplierStatus {
        Active => "Active",
        Inactive => "Inactive",
    }
}

labelled_enum! {
    TransactionStatus {
        Paid => "Paid",
        Pending => "Pending",
        Refunded => "Refunded",
    }
}

labelled_enum! {
    /// Purchase order lifecycle: `Pending → Ordered → Received`, with
    /// `Cancelled` reachable until the goods arrive.
    OrderStatus {
        Pending => "Pending",
        Ordered => "Ordered",
        Received => "Received",
        Cancelled => "Cancelled",
    }
}

labelled_enum! {
    /// Kind of billable line on an invoice.
    InvoiceItemType {
        Consultation => "Consultation",
        Medicine => "Medicine",
        Procedure => "Procedure",
        Discount => "Discount",
    }
}

labelled_enum! {
    PaymentMethod {
        Cash => "Cash",
        Card => "Card",
        Upi => "UPI",
        BankTransfer => "Bank Transfer",
    }
}

impl OrderStatus {
    /// Whether an order may move from `self` to `next`.
    ///
    /// `Received` and `Cancelled` are terminal. Setting the same status
    /// again is allowed (idempotent edits from the UI).
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        if self == next {
            return true;
        }
        match self {
            Pending => matches!(next, Ordered | Received | Cancelled),
            Ordered => matches!(next, Received | Cancelled),
            Received | Cancelled => false,
        }
    }
}

// =============================================================================
// Date Range
// =============================================================================

/// Inclusive calendar date range used for report and ledger filters.
///
/// Timestamps are stored in UTC and both backends compare the UTC calendar
/// date, so a sale at 23:30 IST (18:00 UTC) stays on its own day but one at
/// 05:00 IST lands on the previous UTC day. Ledgers for a clinic east of UTC
/// therefore split at 05:30 local time, not midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Creates a range, rejecting `from > to`.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, ValidationError> {
        if from > to {
            return Err(ValidationError::invalid("date range", "from is after to"));
        }
        Ok(DateRange { from, to })
    }

    /// The `days` days ending on `today`, inclusive.
    pub fn last_days(today: NaiveDate, days: u32) -> Self {
        let from = today - chrono::Duration::days(i64::from(days.saturating_sub(1)));
        DateRange { from, to: today }
    }

    /// Whether a calendar date falls within the range.
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }

    /// Whether a timestamp's UTC date falls within the range.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.contains_date(at.date_naive())
    }
}

// =============================================================================
// Patient
// =============================================================================

/// A registered patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub age: i64,
    pub gender: Gender,
    pub phone: String,
    pub email: Option<String>,
    pub district: String,
    pub state: String,
    pub occupation: Option<String>,
    pub allergies: Option<String>,
    pub emergency_contact: Option<String>,
    #[ts(as = "String")]
    pub registered_at: DateTime<Utc>,
}

// =============================================================================
// Consultation
// =============================================================================

/// A doctor's consultation with a patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Consultation {
    pub id: String,
    pub patient_id: String,
    pub doctor_email: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub chief_complaint: String,
    pub diagnosis: String,
    pub notes: Option<String>,
    /// Consultation fee in paise.
    pub fee: Money,
    pub status: ConsultationStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Prescription
// =============================================================================

/// One medicine line inside a prescription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MedicineDosage {
    pub inventory_item_id: Option<String>,
    pub medicine_name: String,
    /// e.g. "500mg"
    pub dosage: String,
    /// e.g. "1-0-1"
    pub frequency: String,
    pub duration_days: i64,
    pub quantity: i64,
}

/// A prescription issued during a consultation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Prescription {
    pub id: String,
    pub consultation_id: String,
    /// Embedded list, stored as JSON in both backends.
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub medicines: Vec<MedicineDosage>,
    pub total_cost: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Inventory
// =============================================================================

/// A stock-keeping record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    pub category: InventoryCategory,
    /// Units on hand. Never negative.
    pub stock: i64,
    /// e.g. "strip", "bottle", "box"
    pub unit: String,
    pub cost_price: Money,
    pub selling_price: Money,
    pub supplier_id: Option<String>,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,
    pub reorder_level: i64,
    pub batch_number: Option<String>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Applies a stock delta, refusing to go below zero.
    ///
    /// ## Returns
    /// The new stock level.
    pub fn apply_delta(&self, delta: i64) -> CoreResult<i64> {
        let next = self.stock.checked_add(delta).ok_or_else(|| CoreError::Overflow {
            what: format!("stock of {}", self.name),
        })?;
        if next < 0 {
            return Err(CoreError::InsufficientStock {
                item: self.name.clone(),
                available: self.stock,
                requested: delta.saturating_neg(),
            });
        }
        Ok(next)
    }

    /// At or below the reorder level.
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.reorder_level
    }
}

/// A recorded stock movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockAdjustment {
    pub id: String,
    pub inventory_item_id: String,
    /// Positive adds stock, negative removes it.
    pub quantity_delta: i64,
    pub reason: AdjustmentReason,
    pub note: Option<String>,
    /// Email of the user who made the change.
    pub adjusted_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl StockAdjustment {
    /// Creates an adjustment stamped now with a fresh ID.
    pub fn new(
        inventory_item_id: impl Into<String>,
        quantity_delta: i64,
        reason: AdjustmentReason,
        adjusted_by: impl Into<String>,
    ) -> Self {
        StockAdjustment {
            id: generate_id(),
            inventory_item_id: inventory_item_id.into(),
            quantity_delta,
            reason,
            note: None,
            adjusted_by: adjusted_by.into(),
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// Staff & Suppliers
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Staff {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub status: StaffStatus,
    #[ts(as = "String")]
    pub joined_on: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub contact_person: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub gst_number: Option<String>,
    pub status: SupplierStatus,
}

// =============================================================================
// Transactions & Orders
// =============================================================================

/// One persisted invoice line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    pub invoice_id: String,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub patient_id: String,
    pub consultation_id: Option<String>,
    pub item_type: InvoiceItemType,
    pub category: String,
    pub description: String,
    pub quantity: i64,
    pub amount: Money,
    pub total: Money,
    pub status: TransactionStatus,
}

/// A purchase order placed with a supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub supplier_id: String,
    pub inventory_item_id: String,
    pub quantity: i64,
    pub unit_cost: Money,
    pub total_cost: Money,
    #[ts(as = "String")]
    pub ordered_on: NaiveDate,
    #[ts(as = "Option<String>")]
    pub expected_on: Option<NaiveDate>,
    pub status: OrderStatus,
}

// =============================================================================
// Users
// =============================================================================

/// A login account (SQLite backend only). Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserAccount {
    pub id: String,
    pub email: String,
    pub name: String,
    pub roles: Vec<Role>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for creating a login account.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password: String,
    pub roles: Vec<Role>,
}

/// Generates a new record ID (UUID v4).
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Parses a list of role labels, returning the recognised roles and the
/// labels that were not.
pub fn parse_roles<'a, I>(labels: I) -> (Vec<Role>, Vec<String>)
where
    I: IntoIterator<Item = &'a str>,
{
    let mut roles = Vec::new();
    let mut unknown = Vec::new();
    for label in labels {
        let label = label.trim();
        if label.is_empty() {
            continue;
        }
        match label.parse::<Role>() {
            Ok(role) if !roles.contains(&role) => roles.push(role),
            Ok(_) => {}
            Err(_) => unknown.push(label.to_string()),
        }
    }
    (roles, unknown)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_parsing_is_lenient() {
        assert_eq!("Follow-up".parse::<ConsultationStatus>().unwrap(), ConsultationStatus::FollowUp);
        assert_eq!("follow_up".parse::<ConsultationStatus>().unwrap(), ConsultationStatus::FollowUp);
        assert_eq!("CASH MANAGER".parse::<Role>().unwrap(), Role::CashManager);
        assert_eq!("upi".parse::<PaymentMethod>().unwrap(), PaymentMethod::Upi);
        assert!("Maybe".parse::<ConsultationStatus>().is_err());
    }

    #[test]
    fn test_labels_serialize_as_stored_text() {
        assert_eq!(serde_json::to_string(&ConsultationStatus::FollowUp).unwrap(), "\"Follow-up\"");
        assert_eq!(serde_json::to_string(&Role::StockManager).unwrap(), "\"stock_manager\"");
        assert_eq!(StaffStatus::OnLeave.to_string(), "On Leave");
    }

    #[test]
    fn test_order_transitions() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Ordered));
        assert!(OrderStatus::Ordered.can_transition_to(OrderStatus::Received));
        assert!(OrderStatus::Ordered.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Received.can_transition_to(OrderStatus::Received));
        assert!(!OrderStatus::Received.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Received));
        assert!(!OrderStatus::Ordered.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn test_date_range() {
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        let range = DateRange::new(d("2026-10-01"), d("2026-10-31")).unwrap();
        assert!(range.contains_date(d("2026-10-01")));
        assert!(range.contains_date(d("2026-10-31")));
        assert!(!range.contains_date(d("2026-11-01")));
        assert!(DateRange::new(d("2026-10-02"), d("2026-10-01")).is_err());

        let last_week = DateRange::last_days(d("2026-10-19"), 7);
        assert_eq!(last_week.from, d("2026-10-13"));
    }

    #[test]
    fn test_date_range_uses_utc_day() {
        let day = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let range = DateRange::new(day, day).unwrap();
        let at = |rfc3339: &str| DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc);

        // 23:30 IST is still the 19th in UTC.
        assert!(range.contains(at("2026-10-19T23:30:00+05:30")));
        // 04:00 IST on the 20th is 22:30 UTC on the 19th.
        assert!(range.contains(at("2026-10-20T04:00:00+05:30")));
        // 04:00 IST on the 19th belongs to the 18th.
        assert!(!range.contains(at("2026-10-19T04:00:00+05:30")));
    }

    #[test]
    fn test_apply_delta() {
        let item = InventoryItem {
            id: generate_id(),
            name: "Paracetamol 500mg".to_string(),
            category: InventoryCategory::Medicine,
            stock: 5,
            unit: "strip".to_string(),
            cost_price: Money::from_paise(1500),
            selling_price: Money::from_paise(2500),
            supplier_id: None,
            expiry_date: None,
            reorder_level: 10,
            batch_number: None,
            updated_at: Utc::now(),
        };
        assert_eq!(item.apply_delta(-5).unwrap(), 0);
        assert_eq!(item.apply_delta(20).unwrap(), 25);
        assert!(matches!(
            item.apply_delta(-6),
            Err(CoreError::InsufficientStock { available: 5, requested: 6, .. })
        ));
        assert!(item.is_low_stock());

        // A hand-edited stock cell near the top of the range.
        let hoarded = InventoryItem {
            stock: i64::MAX - 1,
            ..item.clone()
        };
        assert!(matches!(hoarded.apply_delta(5), Err(CoreError::Overflow { .. })));
        assert!(matches!(
            item.apply_delta(i64::MIN),
            Err(CoreError::InsufficientStock { requested: i64::MAX, .. })
        ));
    }

    #[test]
    fn test_parse_roles_skips_unknown() {
        let (roles, unknown) = parse_roles(["doctor", "Admin", "janitor", "doctor", ""]);
        assert_eq!(roles, vec![Role::Doctor, Role::Admin]);
        assert_eq!(unknown, vec!["janitor".to_string()]);
    }
}

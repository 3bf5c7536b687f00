//! # Tab Mappings
//!
//! One `SheetRecord` impl per entity tab. Money is written as decimal
//! rupees (`"350.00"`), dates as `YYYY-MM-DD`, timestamps as RFC 3339 and
//! enums by label.

use chrono::{DateTime, Utc};
use clinic_core::validation::{
    validate_consultation, validate_inventory_item, validate_order, validate_patient,
    validate_prescription, validate_staff, validate_stock_adjustment, validate_supplier,
};
use clinic_core::{
    Consultation, InventoryItem, Money, Order, Patient, PaymentMethod, Prescription, Staff,
    StockAdjustment, Supplier, Transaction, ValidationError,
};

use crate::codec::{Row, SheetRecord};

/// Tab holding `email | role` grants.
pub const USER_ROLES_SHEET: &str = "UserRoles";
pub const USER_ROLES_HEADERS: &[&str] = &["email", "role"];

/// Every tab the adapter uses, with its headers.
pub fn all_tabs() -> Vec<(&'static str, &'static [&'static str])> {
    vec![
        (Patient::SHEET, Patient::HEADERS),
        (Consultation::SHEET, Consultation::HEADERS),
        (Prescription::SHEET, Prescription::HEADERS),
        (InventoryItem::SHEET, InventoryItem::HEADERS),
        (StockAdjustment::SHEET, StockAdjustment::HEADERS),
        (Staff::SHEET, Staff::HEADERS),
        (Supplier::SHEET, Supplier::HEADERS),
        (Transaction::SHEET, Transaction::HEADERS),
        (Order::SHEET, Order::HEADERS),
        (InvoiceRow::SHEET, InvoiceRow::HEADERS),
        (PaymentRow::SHEET, PaymentRow::HEADERS),
        (USER_ROLES_SHEET, USER_ROLES_HEADERS),
    ]
}

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn money(value: Money) -> String {
    value.to_decimal_string()
}

fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339()
}

// =============================================================================
// Patients & Clinical
// =============================================================================

impl SheetRecord for Patient {
    const SHEET: &'static str = "Patients";
    const ENTITY: &'static str = "Patient";
    const HEADERS: &'static [&'static str] = &[
        "id",
        "name",
        "age",
        "gender",
        "phone",
        "email",
        "district",
        "state",
        "occupation",
        "allergies",
        "emergency_contact",
        "registered_at",
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn encode(&self) -> Vec<(&'static str, String)> {
        vec![
            ("id", self.id.clone()),
            ("name", self.name.clone()),
            ("age", self.age.to_string()),
            ("gender", self.gender.to_string()),
            ("phone", self.phone.clone()),
            ("email", opt(&self.email)),
            ("district", self.district.clone()),
            ("state", self.state.clone()),
            ("occupation", opt(&self.occupation)),
            ("allergies", opt(&self.allergies)),
            ("emergency_contact", opt(&self.emergency_contact)),
            ("registered_at", timestamp(self.registered_at)),
        ]
    }

    fn decode(row: &Row<'_>) -> Result<Self, String> {
        Ok(Patient {
            id: row.required("id")?,
            name: row.required("name")?,
            age: row.parse("age")?,
            gender: row.parse("gender")?,
            phone: row.required("phone")?,
            email: row.optional("email"),
            district: row.required("district")?,
            state: row.required("state")?,
            occupation: row.optional("occupation"),
            allergies: row.optional("allergies"),
            emergency_contact: row.optional("emergency_contact"),
            registered_at: row.timestamp("registered_at")?,
        })
    }

    fn check(&self) -> Result<(), ValidationError> {
        validate_patient(self)
    }
}

impl SheetRecord for Consultation {
    const SHEET: &'static str = "Consultations";
    const ENTITY: &'static str = "Consultation";
    const HEADERS: &'static [&'static str] = &[
        "id",
        "patient_id",
        "doctor_email",
        "date",
        "chief_complaint",
        "diagnosis",
        "notes",
        "fee",
        "status",
        "created_at",
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn encode(&self) -> Vec<(&'static str, String)> {
        vec![
            ("id", self.id.clone()),
            ("patient_id", self.patient_id.clone()),
            ("doctor_email", self.doctor_email.clone()),
            ("date", self.date.to_string()),
            ("chief_complaint", self.chief_complaint.clone()),
            ("diagnosis", self.diagnosis.clone()),
            ("notes", opt(&self.notes)),
            ("fee", money(self.fee)),
            ("status", self.status.to_string()),
            ("created_at", timestamp(self.created_at)),
        ]
    }

    fn decode(row: &Row<'_>) -> Result<Self, String> {
        Ok(Consultation {
            id: row.required("id")?,
            patient_id: row.required("patient_id")?,
            doctor_email: row.required("doctor_email")?,
            date: row.date("date")?,
            chief_complaint: row.required("chief_complaint")?,
            diagnosis: row.text("diagnosis").to_string(),
            notes: row.optional("notes"),
            fee: row.money("fee")?,
            status: row.parse("status")?,
            created_at: row.timestamp("created_at")?,
        })
    }

    fn check(&self) -> Result<(), ValidationError> {
        validate_consultation(self)
    }
}

impl SheetRecord for Prescription {
    const SHEET: &'static str = "Prescriptions";
    const ENTITY: &'static str = "Prescription";
    const HEADERS: &'static [&'static str] = &["id", "consultation_id", "medicines", "total_cost", "created_at"];

    fn id(&self) -> &str {
        &self.id
    }

    fn encode(&self) -> Vec<(&'static str, String)> {
        vec![
            ("id", self.id.clone()),
            ("consultation_id", self.consultation_id.clone()),
            // Serializing plain structs of strings and integers cannot fail.
            ("medicines", serde_json::to_string(&self.medicines).unwrap_or_else(|_| "[]".to_string())),
            ("total_cost", money(self.total_cost)),
            ("created_at", timestamp(self.created_at)),
        ]
    }

    fn decode(row: &Row<'_>) -> Result<Self, String> {
        Ok(Prescription {
            id: row.required("id")?,
            consultation_id: row.required("consultation_id")?,
            medicines: row.json("medicines")?,
            total_cost: row.money("total_cost")?,
            created_at: row.timestamp("created_at")?,
        })
    }

    fn check(&self) -> Result<(), ValidationError> {
        validate_prescription(self)
    }
}

// =============================================================================
// Inventory
// =============================================================================

impl SheetRecord for InventoryItem {
    const SHEET: &'static str = "Inventory";
    const ENTITY: &'static str = "Inventory item";
    const HEADERS: &'static [&'static str] = &[
        "id",
        "name",
        "category",
        "stock",
        "unit",
        "cost_price",
        "selling_price",
        "supplier_id",
        "expiry_date",
        "reorder_level",
        "batch_number",
        "updated_at",
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn encode(&self) -> Vec<(&'static str, String)> {
        vec![
            ("id", self.id.clone()),
            ("name", self.name.clone()),
            ("category", self.category.to_string()),
            ("stock", self.stock.to_string()),
            ("unit", self.unit.clone()),
            ("cost_price", money(self.cost_price)),
            ("selling_price", money(self.selling_price)),
            ("supplier_id", opt(&self.supplier_id)),
            ("expiry_date", self.expiry_date.map(|d| d.to_string()).unwrap_or_default()),
            ("reorder_level", self.reorder_level.to_string()),
            ("batch_number", opt(&self.batch_number)),
            ("updated_at", timestamp(self.updated_at)),
        ]
    }

    fn decode(row: &Row<'_>) -> Result<Self, String> {
        Ok(InventoryItem {
            id: row.required("id")?,
            name: row.required("name")?,
            category: row.parse("category")?,
            stock: row.parse("stock")?,
            unit: row.required("unit")?,
            cost_price: row.money("cost_price")?,
            selling_price: row.money("selling_price")?,
            supplier_id: row.optional("supplier_id"),
            expiry_date: row.optional_date("expiry_date")?,
            reorder_level: row.parse("reorder_level")?,
            batch_number: row.optional("batch_number"),
            updated_at: row.timestamp("updated_at")?,
        })
    }

    fn check(&self) -> Result<(), ValidationError> {
        validate_inventory_item(self)
    }
}

impl SheetRecord for StockAdjustment {
    const SHEET: &'static str = "StockAdjustments";
    const ENTITY: &'static str = "Stock adjustment";
    const HEADERS: &'static [&'static str] = &[
        "id",
        "inventory_item_id",
        "quantity_delta",
        "reason",
        "note",
        "adjusted_by",
        "created_at",
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn encode(&self) -> Vec<(&'static str, String)> {
        vec![
            ("id", self.id.clone()),
            ("inventory_item_id", self.inventory_item_id.clone()),
            ("quantity_delta", self.quantity_delta.to_string()),
            ("reason", self.reason.to_string()),
            ("note", opt(&self.note)),
            ("adjusted_by", self.adjusted_by.clone()),
            ("created_at", timestamp(self.created_at)),
        ]
    }

    fn decode(row: &Row<'_>) -> Result<Self, String> {
        Ok(StockAdjustment {
            id: row.required("id")?,
            inventory_item_id: row.required("inventory_item_id")?,
            quantity_delta: row.parse("quantity_delta")?,
            reason: row.parse("reason")?,
            note: row.optional("note"),
            adjusted_by: row.required("adjusted_by")?,
            created_at: row.timestamp("created_at")?,
        })
    }

    fn check(&self) -> Result<(), ValidationError> {
        validate_stock_adjustment(self)
    }
}

// =============================================================================
// Staff & Suppliers
// =============================================================================

impl SheetRecord for Staff {
    const SHEET: &'static str = "Staff";
    const ENTITY: &'static str = "Staff";
    const HEADERS: &'static [&'static str] = &["id", "name", "email", "phone", "role", "status", "joined_on"];

    fn id(&self) -> &str {
        &self.id
    }

    fn encode(&self) -> Vec<(&'static str, String)> {
        vec![
            ("id", self.id.clone()),
            ("name", self.name.clone()),
            ("email", self.email.clone()),
            ("phone", self.phone.clone()),
            ("role", self.role.to_string()),
            ("status", self.status.to_string()),
            ("joined_on", self.joined_on.to_string()),
        ]
    }

    fn decode(row: &Row<'_>) -> Result<Self, String> {
        Ok(Staff {
            id: row.required("id")?,
            name: row.required("name")?,
            email: row.required("email")?,
            phone: row.required("phone")?,
            role: row.parse("role")?,
            status: row.parse("status")?,
            joined_on: row.date("joined_on")?,
        })
    }

    fn check(&self) -> Result<(), ValidationError> {
        validate_staff(self)
    }
}

impl SheetRecord for Supplier {
    const SHEET: &'static str = "Suppliers";
    const ENTITY: &'static str = "Supplier";
    const HEADERS: &'static [&'static str] = &[
        "id",
        "name",
        "contact_person",
        "phone",
        "email",
        "address",
        "gst_number",
        "status",
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn encode(&self) -> Vec<(&'static str, String)> {
        vec![
            ("id", self.id.clone()),
            ("name", self.name.clone()),
            ("contact_person", self.contact_person.clone()),
            ("phone", self.phone.clone()),
            ("email", opt(&self.email)),
            ("address", opt(&self.address)),
            ("gst_number", opt(&self.gst_number)),
            ("status", self.status.to_string()),
        ]
    }

    fn decode(row: &Row<'_>) -> Result<Self, String> {
        Ok(Supplier {
            id: row.required("id")?,
            name: row.required("name")?,
            contact_person: row.required("contact_person")?,
            phone: row.required("phone")?,
            email: row.optional("email"),
            address: row.optional("address"),
            gst_number: row.optional("gst_number"),
            status: row.parse("status")?,
        })
    }

    fn check(&self) -> Result<(), ValidationError> {
        validate_supplier(self)
    }
}

// =============================================================================
// Billing & Procurement
// =============================================================================

impl SheetRecord for Transaction {
    const SHEET: &'static str = "Transactions";
    const ENTITY: &'static str = "Transaction";
    const HEADERS: &'static [&'static str] = &[
        "id",
        "invoice_id",
        "date",
        "patient_id",
        "consultation_id",
        "item_type",
        "category",
        "description",
        "quantity",
        "amount",
        "total",
        "status",
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn encode(&self) -> Vec<(&'static str, String)> {
        vec![
            ("id", self.id.clone()),
            ("invoice_id", self.invoice_id.clone()),
            ("date", timestamp(self.date)),
            ("patient_id", self.patient_id.clone()),
            ("consultation_id", opt(&self.consultation_id)),
            ("item_type", self.item_type.to_string()),
            ("category", self.category.clone()),
            ("description", self.description.clone()),
            ("quantity", self.quantity.to_string()),
            ("amount", money(self.amount)),
            ("total", money(self.total)),
            ("status", self.status.to_string()),
        ]
    }

    fn decode(row: &Row<'_>) -> Result<Self, String> {
        let transaction = Transaction {
            id: row.required("id")?,
            invoice_id: row.required("invoice_id")?,
            date: row.timestamp("date")?,
            patient_id: row.required("patient_id")?,
            consultation_id: row.optional("consultation_id"),
            item_type: row.parse("item_type")?,
            category: row.text("category").to_string(),
            description: row.text("description").to_string(),
            quantity: row.parse("quantity")?,
            amount: row.money("amount")?,
            total: row.money("total")?,
            status: row.parse("status")?,
        };

        if transaction.amount.checked_mul(transaction.quantity) != Some(transaction.total) {
            return Err(format!(
                "total: {} is not quantity {} × {}",
                transaction.total, transaction.quantity, transaction.amount
            ));
        }
        Ok(transaction)
    }
}

impl SheetRecord for Order {
    const SHEET: &'static str = "Orders";
    const ENTITY: &'static str = "Order";
    const HEADERS: &'static [&'static str] = &[
        "id",
        "supplier_id",
        "inventory_item_id",
        "quantity",
        "unit_cost",
        "total_cost",
        "ordered_on",
        "expected_on",
        "status",
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn encode(&self) -> Vec<(&'static str, String)> {
        vec![
            ("id", self.id.clone()),
            ("supplier_id", self.supplier_id.clone()),
            ("inventory_item_id", self.inventory_item_id.clone()),
            ("quantity", self.quantity.to_string()),
            ("unit_cost", money(self.unit_cost)),
            ("total_cost", money(self.total_cost)),
            ("ordered_on", self.ordered_on.to_string()),
            ("expected_on", self.expected_on.map(|d| d.to_string()).unwrap_or_default()),
            ("status", self.status.to_string()),
        ]
    }

    fn decode(row: &Row<'_>) -> Result<Self, String> {
        Ok(Order {
            id: row.required("id")?,
            supplier_id: row.required("supplier_id")?,
            inventory_item_id: row.required("inventory_item_id")?,
            quantity: row.parse("quantity")?,
            unit_cost: row.money("unit_cost")?,
            total_cost: row.money("total_cost")?,
            ordered_on: row.date("ordered_on")?,
            expected_on: row.optional_date("expected_on")?,
            status: row.parse("status")?,
        })
    }

    fn check(&self) -> Result<(), ValidationError> {
        validate_order(self)
    }
}

/// Invoice header row. Lines live in `Transactions`, splits in
/// `InvoicePayments`.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceRow {
    pub id: String,
    pub patient_id: String,
    pub consultation_id: Option<String>,
    pub total: Money,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl SheetRecord for InvoiceRow {
    const SHEET: &'static str = "Invoices";
    const ENTITY: &'static str = "Invoice";
    const HEADERS: &'static [&'static str] =
        &["id", "patient_id", "consultation_id", "total", "created_by", "created_at"];

    fn id(&self) -> &str {
        &self.id
    }

    fn encode(&self) -> Vec<(&'static str, String)> {
        vec![
            ("id", self.id.clone()),
            ("patient_id", self.patient_id.clone()),
            ("consultation_id", opt(&self.consultation_id)),
            ("total", money(self.total)),
            ("created_by", self.created_by.clone()),
            ("created_at", timestamp(self.created_at)),
        ]
    }

    fn decode(row: &Row<'_>) -> Result<Self, String> {
        Ok(InvoiceRow {
            id: row.required("id")?,
            patient_id: row.required("patient_id")?,
            consultation_id: row.optional("consultation_id"),
            total: row.money("total")?,
            created_by: row.required("created_by")?,
            created_at: row.timestamp("created_at")?,
        })
    }
}

/// One payment split. `id` is `{invoice_id}-{n}`.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRow {
    pub id: String,
    pub invoice_id: String,
    pub method: PaymentMethod,
    pub amount: Money,
}

impl SheetRecord for PaymentRow {
    const SHEET: &'static str = "InvoicePayments";
    const ENTITY: &'static str = "Payment";
    const HEADERS: &'static [&'static str] = &["id", "invoice_id", "method", "amount"];

    fn id(&self) -> &str {
        &self.id
    }

    fn encode(&self) -> Vec<(&'static str, String)> {
        vec![
            ("id", self.id.clone()),
            ("invoice_id", self.invoice_id.clone()),
            ("method", self.method.to_string()),
            ("amount", money(self.amount)),
        ]
    }

    fn decode(row: &Row<'_>) -> Result<Self, String> {
        Ok(PaymentRow {
            id: row.required("id")?,
            invoice_id: row.required("invoice_id")?,
            method: row.parse("method")?,
            amount: row.money("amount")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Table;
    use chrono::NaiveDate;
    use clinic_core::{generate_id, InventoryCategory, MedicineDosage};

    fn table_for<R: SheetRecord>(record: &R) -> Table {
        let headers: Vec<String> = R::HEADERS.iter().map(|h| h.to_string()).collect();
        let empty = Table::parse(R::SHEET, vec![headers.clone()]).unwrap();
        let row = empty.layout(&record.encode()).unwrap();
        Table::parse(R::SHEET, vec![headers, row]).unwrap()
    }

    #[test]
    fn test_encode_covers_every_header() {
        let patient = Patient {
            id: generate_id(),
            name: "Ravi".to_string(),
            age: 41,
            gender: clinic_core::Gender::Male,
            phone: "9876543210".to_string(),
            email: None,
            district: "Nagpur".to_string(),
            state: "Maharashtra".to_string(),
            occupation: None,
            allergies: None,
            emergency_contact: None,
            registered_at: Utc::now(),
        };
        let encoded: Vec<&str> = patient.encode().iter().map(|(h, _)| *h).collect();
        assert_eq!(encoded, Patient::HEADERS);
    }

    #[test]
    fn test_inventory_item_through_sheet() {
        let item = InventoryItem {
            id: generate_id(),
            name: "Cetirizine 10mg".to_string(),
            category: InventoryCategory::Medicine,
            stock: 40,
            unit: "strip".to_string(),
            cost_price: Money::from_paise(805),
            selling_price: Money::from_paise(1500),
            supplier_id: None,
            expiry_date: NaiveDate::from_ymd_opt(2027, 1, 31),
            reorder_level: 10,
            batch_number: None,
            updated_at: DateTime::parse_from_rfc3339("2026-10-01T09:30:00Z").unwrap().with_timezone(&Utc),
        };

        let table = table_for(&item);
        let (row, decoded) = table.find::<InventoryItem>(&item.id).unwrap().unwrap();
        assert_eq!(row, 2);
        assert_eq!(decoded, item);
    }

    #[test]
    fn test_prescription_medicines_as_json_cell() {
        let prescription = Prescription {
            id: generate_id(),
            consultation_id: generate_id(),
            medicines: vec![MedicineDosage {
                inventory_item_id: None,
                medicine_name: "Azithromycin 500mg".to_string(),
                dosage: "500mg".to_string(),
                frequency: "1-0-0".to_string(),
                duration_days: 3,
                quantity: 3,
            }],
            total_cost: Money::from_paise(33000),
            created_at: DateTime::parse_from_rfc3339("2026-10-01T09:30:00Z").unwrap().with_timezone(&Utc),
        };

        let cells = prescription.encode();
        assert!(cells[2].1.starts_with("[{"));

        let table = table_for(&prescription);
        let decoded = table.decode_all::<Prescription>().unwrap();
        assert_eq!(decoded[0].1, prescription);
    }

    #[test]
    fn test_malformed_row_reports_row_number() {
        let headers: Vec<String> = Staff::HEADERS.iter().map(|h| h.to_string()).collect();
        let good: Vec<String> = ["s1", "Pooja", "pooja@clinic.in", "9123456780", "pharmacist", "Active", "2025-04-01"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut bad = good.clone();
        bad[0] = "s2".to_string();
        bad[4] = "janitor".to_string();

        let table = Table::parse("Staff", vec![headers, good, bad]).unwrap();
        let err = table.decode_all::<Staff>().unwrap_err();
        assert!(matches!(err, crate::error::SheetsError::InvalidRow { row: 3, .. }));
    }

    #[test]
    fn test_rule_violation_fails_decode() {
        let headers: Vec<String> = Order::HEADERS.iter().map(|h| h.to_string()).collect();
        // 10 × 4.50 is 45.00, not 40.00
        let row: Vec<String> = ["o1", "s1", "i1", "10", "4.50", "40.00", "2026-10-01", "", "Pending"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let table = Table::parse("Orders", vec![headers, row]).unwrap();
        assert!(table.decode_all::<Order>().is_err());
    }

    #[test]
    fn test_all_tabs_unique() {
        let tabs = all_tabs();
        let mut names: Vec<&str> = tabs.iter().map(|(n, _)| *n).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), tabs.len());
    }
}

//! # SQLite DataService
//!
//! Binds the repositories to the `DataService` contract.
//!
//! ```text
//! DataService call ──► validate (clinic-core) ──► repository ──► SqlitePool
//!                                                     │
//!                         DbError ──► ServiceError ◄──┘
//! ```

use async_trait::async_trait;
use clinic_core::validation::{
    validate_consultation, validate_email, validate_inventory_item, validate_order, validate_patient,
    validate_prescription, validate_required, validate_staff, validate_stock_adjustment,
    validate_supplier,
};
use clinic_core::{
    BackendKind, Consultation, ConsultationStatus, DataService, DateRange, InventoryItem, Invoice,
    NewUser, Order, OrderStatus, Patient, Prescription, Role, ServiceError, ServiceResult, Staff,
    StockAdjustment, Supplier, Transaction, UserAccount, UserAccounts, MAX_NAME_LEN,
};
use std::path::PathBuf;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::pool::{Database, DbConfig};

/// Minimum password length for new accounts.
const MIN_PASSWORD_LEN: usize = 8;

/// `DataService` backed by a local SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteDataService {
    db: Database,
}

impl SqliteDataService {
    pub fn new(db: Database) -> Self {
        SqliteDataService { db }
    }

    /// Opens (or creates) the database file and applies migrations.
    pub async fn connect(path: impl Into<PathBuf>) -> DbResult<Self> {
        let db = Database::new(DbConfig::new(path)).await?;
        Ok(SqliteDataService { db })
    }

    /// The underlying database, for seeding and diagnostics.
    pub fn database(&self) -> &Database {
        &self.db
    }
}

fn found<T>(value: Option<T>, entity: &str, id: &str) -> ServiceResult<T> {
    value.ok_or_else(|| ServiceError::not_found(entity, id))
}

#[async_trait]
impl DataService for SqliteDataService {
    fn backend(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    // -------------------------------------------------------------------------
    // Patients
    // -------------------------------------------------------------------------

    async fn get_patients(&self) -> ServiceResult<Vec<Patient>> {
        Ok(self.db.patients().list().await?)
    }

    async fn get_patient(&self, id: &str) -> ServiceResult<Patient> {
        found(self.db.patients().get_by_id(id).await?, "Patient", id)
    }

    async fn create_patient(&self, patient: Patient) -> ServiceResult<Patient> {
        validate_patient(&patient)?;
        self.db.patients().insert(&patient).await?;
        info!(id = %patient.id, "Patient registered");
        Ok(patient)
    }

    async fn update_patient(&self, patient: Patient) -> ServiceResult<Patient> {
        validate_patient(&patient)?;
        self.db.patients().update(&patient).await?;
        self.get_patient(&patient.id).await
    }

    // -------------------------------------------------------------------------
    // Consultations
    // -------------------------------------------------------------------------

    async fn get_consultations(&self) -> ServiceResult<Vec<Consultation>> {
        Ok(self.db.consultations().list().await?)
    }

    async fn create_consultation(&self, consultation: Consultation) -> ServiceResult<Consultation> {
        validate_consultation(&consultation)?;
        self.db.consultations().insert(&consultation).await?;
        info!(id = %consultation.id, patient_id = %consultation.patient_id, "Consultation created");
        Ok(consultation)
    }

    async fn update_consultation_status(
        &self,
        id: &str,
        status: ConsultationStatus,
    ) -> ServiceResult<Consultation> {
        Ok(self.db.consultations().update_status(id, status).await?)
    }

    // -------------------------------------------------------------------------
    // Prescriptions
    // -------------------------------------------------------------------------

    async fn get_prescriptions(&self) -> ServiceResult<Vec<Prescription>> {
        Ok(self.db.prescriptions().list().await?)
    }

    async fn create_prescription(&self, prescription: Prescription) -> ServiceResult<Prescription> {
        validate_prescription(&prescription)?;
        self.db.prescriptions().insert(&prescription).await?;
        info!(id = %prescription.id, "Prescription created");
        Ok(prescription)
    }

    // -------------------------------------------------------------------------
    // Inventory
    // -------------------------------------------------------------------------

    async fn get_inventory(&self) -> ServiceResult<Vec<InventoryItem>> {
        Ok(self.db.inventory().list().await?)
    }

    async fn get_inventory_item(&self, id: &str) -> ServiceResult<InventoryItem> {
        found(self.db.inventory().get_by_id(id).await?, "Inventory item", id)
    }

    async fn create_inventory_item(&self, item: InventoryItem) -> ServiceResult<InventoryItem> {
        validate_inventory_item(&item)?;
        self.db.inventory().insert(&item).await?;
        info!(id = %item.id, name = %item.name, "Inventory item created");
        Ok(item)
    }

    async fn update_inventory_item(&self, item: InventoryItem) -> ServiceResult<InventoryItem> {
        validate_inventory_item(&item)?;
        Ok(self.db.inventory().update(&item).await?)
    }

    async fn adjust_stock(&self, adjustment: StockAdjustment) -> ServiceResult<InventoryItem> {
        validate_stock_adjustment(&adjustment)?;
        Ok(self.db.inventory().adjust(&adjustment).await?)
    }

    async fn get_stock_adjustments(&self, range: DateRange) -> ServiceResult<Vec<StockAdjustment>> {
        Ok(self.db.inventory().adjustments_between(range).await?)
    }

    // -------------------------------------------------------------------------
    // Staff & Suppliers
    // -------------------------------------------------------------------------

    async fn get_staff(&self) -> ServiceResult<Vec<Staff>> {
        Ok(self.db.staff().list().await?)
    }

    async fn create_staff(&self, staff: Staff) -> ServiceResult<Staff> {
        validate_staff(&staff)?;
        self.db.staff().insert(&staff).await.map_err(|e| match e {
            DbError::UniqueViolation { .. } => ServiceError::Duplicate {
                entity: "Staff".to_string(),
                detail: format!("email {}", staff.email),
            },
            other => other.into(),
        })?;
        info!(id = %staff.id, role = %staff.role, "Staff member added");
        Ok(staff)
    }

    async fn get_suppliers(&self) -> ServiceResult<Vec<Supplier>> {
        Ok(self.db.suppliers().list().await?)
    }

    async fn create_supplier(&self, supplier: Supplier) -> ServiceResult<Supplier> {
        validate_supplier(&supplier)?;
        self.db.suppliers().insert(&supplier).await?;
        info!(id = %supplier.id, name = %supplier.name, "Supplier created");
        Ok(supplier)
    }

    async fn update_supplier(&self, supplier: Supplier) -> ServiceResult<Supplier> {
        validate_supplier(&supplier)?;
        self.db.suppliers().update(&supplier).await?;
        found(self.db.suppliers().get_by_id(&supplier.id).await?, "Supplier", &supplier.id)
    }

    // -------------------------------------------------------------------------
    // Transactions & Orders
    // -------------------------------------------------------------------------

    async fn get_transactions(&self, range: DateRange) -> ServiceResult<Vec<Transaction>> {
        Ok(self.db.invoices().transactions_between(range).await?)
    }

    async fn get_orders(&self) -> ServiceResult<Vec<Order>> {
        Ok(self.db.orders().list().await?)
    }

    async fn create_order(&self, order: Order) -> ServiceResult<Order> {
        validate_order(&order)?;
        self.db.orders().insert(&order).await?;
        info!(id = %order.id, total = %order.total_cost, "Order placed");
        Ok(order)
    }

    async fn update_order_status(
        &self,
        id: &str,
        status: OrderStatus,
        changed_by: &str,
    ) -> ServiceResult<Order> {
        Ok(self.db.orders().update_status(id, status, changed_by).await?)
    }

    // -------------------------------------------------------------------------
    // Roles & Billing
    // -------------------------------------------------------------------------

    async fn get_user_roles(&self, email: &str) -> ServiceResult<Vec<Role>> {
        Ok(self.db.users().roles_for(email).await?)
    }

    async fn record_invoice(&self, invoice: Invoice) -> ServiceResult<Invoice> {
        invoice.validate()?;
        self.db.invoices().record(&invoice).await?;
        Ok(invoice)
    }

    fn user_accounts(&self) -> Option<&dyn UserAccounts> {
        Some(self)
    }
}

#[async_trait]
impl UserAccounts for SqliteDataService {
    async fn authenticate_user(&self, email: &str, password: &str) -> ServiceResult<Option<UserAccount>> {
        Ok(self.db.users().authenticate(email, password).await?)
    }

    async fn create_user(&self, user: NewUser) -> ServiceResult<UserAccount> {
        validate_email(&user.email)?;
        validate_required("name", &user.name, MAX_NAME_LEN)?;
        if user.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ServiceError::Invalid(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if user.roles.is_empty() {
            return Err(ServiceError::Invalid("at least one role is required".to_string()));
        }
        Ok(self.db.users().create(&user).await?)
    }
}

// =============================================================================
// Integration Tests (in-memory SQLite)
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use chrono::{NaiveDate, Utc};
    use clinic_core::invoice::{InvoiceDraft, InvoiceItemDraft};
    use clinic_core::{
        generate_id, AdjustmentReason, Gender, InventoryCategory, InvoiceItemType, MedicineDosage,
        Money, PaymentMethod, PaymentSplit, StaffStatus, SupplierStatus, TransactionStatus,
    };

    async fn service() -> SqliteDataService {
        SqliteDataService::new(Database::new(DbConfig::in_memory()).await.unwrap())
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn patient(name: &str) -> Patient {
        Patient {
            id: generate_id(),
            name: name.to_string(),
            age: 41,
            gender: Gender::Male,
            phone: "9876543210".to_string(),
            email: None,
            district: "Nagpur".to_string(),
            state: "Maharashtra".to_string(),
            occupation: Some("Teacher".to_string()),
            allergies: None,
            emergency_contact: None,
            registered_at: Utc::now(),
        }
    }

    fn consultation(patient_id: &str) -> Consultation {
        Consultation {
            id: generate_id(),
            patient_id: patient_id.to_string(),
            doctor_email: "dr.iyer@clinic.in".to_string(),
            date: today(),
            chief_complaint: "Fever for 3 days".to_string(),
            diagnosis: "Viral fever".to_string(),
            notes: None,
            fee: Money::from_rupees(500),
            status: ConsultationStatus::Pending,
            created_at: Utc::now(),
        }
    }

    fn item(name: &str, stock: i64) -> InventoryItem {
        InventoryItem {
            id: generate_id(),
            name: name.to_string(),
            category: InventoryCategory::Medicine,
            stock,
            unit: "strip".to_string(),
            cost_price: Money::from_paise(2000),
            selling_price: Money::from_paise(3500),
            supplier_id: None,
            expiry_date: NaiveDate::from_ymd_opt(2027, 6, 30),
            reorder_level: 5,
            batch_number: Some("B-1029".to_string()),
            updated_at: Utc::now(),
        }
    }

    fn supplier() -> Supplier {
        Supplier {
            id: generate_id(),
            name: "Shree Pharma Distributors".to_string(),
            contact_person: "R. Kulkarni".to_string(),
            phone: "020-25671234".to_string(),
            email: Some("orders@shreepharma.in".to_string()),
            address: None,
            gst_number: Some("27ABCDE1234F1Z5".to_string()),
            status: SupplierStatus::Active,
        }
    }

    fn medicine_draft(
        patient_id: &str,
        consultation_id: Option<&str>,
        item_id: &str,
        qty: i64,
        paid: i64,
    ) -> InvoiceDraft {
        InvoiceDraft {
            patient_id: patient_id.to_string(),
            consultation_id: consultation_id.map(str::to_string),
            items: vec![
                InvoiceItemDraft {
                    item_type: InvoiceItemType::Consultation,
                    category: "General".to_string(),
                    description: "OPD".to_string(),
                    inventory_item_id: None,
                    quantity: 1,
                    amount: Money::from_rupees(500),
                },
                InvoiceItemDraft {
                    item_type: InvoiceItemType::Medicine,
                    category: "Tablets".to_string(),
                    description: "Paracetamol 500mg".to_string(),
                    inventory_item_id: Some(item_id.to_string()),
                    quantity: qty,
                    amount: Money::from_paise(3500),
                },
            ],
            payments: vec![PaymentSplit {
                method: PaymentMethod::Upi,
                amount: Money::from_paise(paid),
            }],
        }
    }

    #[tokio::test]
    async fn test_patient_crud() {
        let svc = service().await;
        let mut p = patient("Ravi Deshmukh");
        svc.create_patient(p.clone()).await.unwrap();

        p.allergies = Some("Sulfa drugs".to_string());
        let updated = svc.update_patient(p.clone()).await.unwrap();
        assert_eq!(updated.allergies.as_deref(), Some("Sulfa drugs"));

        assert_eq!(svc.get_patients().await.unwrap().len(), 1);
        assert!(matches!(
            svc.get_patient("missing").await,
            Err(ServiceError::NotFound { .. })
        ));
        assert!(matches!(
            svc.create_patient(p).await,
            Err(ServiceError::Duplicate { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_patient_rejected() {
        let svc = service().await;
        let mut p = patient("X");
        p.phone = "call me".to_string();
        assert!(matches!(svc.create_patient(p).await, Err(ServiceError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_consultation_for_unknown_patient_rejected() {
        let svc = service().await;
        let result = svc.create_consultation(consultation("nobody")).await;
        assert!(matches!(result, Err(ServiceError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_prescription_medicines_roundtrip_as_json() {
        let svc = service().await;
        let p = svc.create_patient(patient("Meena")).await.unwrap();
        let c = svc.create_consultation(consultation(&p.id)).await.unwrap();

        let prescription = Prescription {
            id: generate_id(),
            consultation_id: c.id.clone(),
            medicines: vec![MedicineDosage {
                inventory_item_id: None,
                medicine_name: "Azithromycin 500mg".to_string(),
                dosage: "500mg".to_string(),
                frequency: "1-0-0".to_string(),
                duration_days: 3,
                quantity: 3,
            }],
            total_cost: Money::from_paise(9000),
            created_at: Utc::now(),
        };
        svc.create_prescription(prescription.clone()).await.unwrap();

        let stored = svc.get_prescriptions().await.unwrap();
        assert_eq!(stored, vec![prescription]);
    }

    #[tokio::test]
    async fn test_adjust_stock_is_guarded() {
        let svc = service().await;
        let it = svc.create_inventory_item(item("Cetirizine 10mg", 4)).await.unwrap();

        let after = svc
            .adjust_stock(StockAdjustment::new(&it.id, 6, AdjustmentReason::Purchase, "sm@clinic.in"))
            .await
            .unwrap();
        assert_eq!(after.stock, 10);

        let err = svc
            .adjust_stock(StockAdjustment::new(&it.id, -11, AdjustmentReason::Damage, "sm@clinic.in"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::InsufficientStock { available: 10, requested: 11, .. }
        ));

        let range = DateRange::last_days(today(), 1);
        let log = svc.get_stock_adjustments(range).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(svc.get_inventory_item(&it.id).await.unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_update_inventory_keeps_stock() {
        let svc = service().await;
        let mut it = svc.create_inventory_item(item("ORS sachet", 20)).await.unwrap();
        it.stock = 999;
        it.selling_price = Money::from_paise(2200);

        let updated = svc.update_inventory_item(it).await.unwrap();
        assert_eq!(updated.stock, 20);
        assert_eq!(updated.selling_price.paise(), 2200);
    }

    #[tokio::test]
    async fn test_record_invoice_commits_everything() {
        let svc = service().await;
        let p = svc.create_patient(patient("Kavita")).await.unwrap();
        let c = svc.create_consultation(consultation(&p.id)).await.unwrap();
        let it = svc.create_inventory_item(item("Paracetamol 500mg", 10)).await.unwrap();

        let invoice = Invoice::from_draft(
            medicine_draft(&p.id, Some(&c.id), &it.id, 2, 50000 + 7000),
            "cash@clinic.in",
        )
        .unwrap();
        let invoice_id = invoice.id.clone();
        svc.record_invoice(invoice).await.unwrap();

        assert_eq!(svc.get_inventory_item(&it.id).await.unwrap().stock, 8);

        let txns = svc.get_transactions(DateRange::last_days(today(), 1)).await.unwrap();
        assert_eq!(txns.len(), 2);
        assert!(txns.iter().all(|t| t.invoice_id == invoice_id && t.status == TransactionStatus::Paid));

        let consultations = svc.get_consultations().await.unwrap();
        assert_eq!(consultations[0].status, ConsultationStatus::Completed);

        let payments = svc.database().invoices().payments(&invoice_id).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount.paise(), 57000);

        let log = svc.get_stock_adjustments(DateRange::last_days(today(), 1)).await.unwrap();
        assert_eq!(log[0].reason, AdjustmentReason::Sale);
        assert_eq!(log[0].quantity_delta, -2);
    }

    #[tokio::test]
    async fn test_record_invoice_rolls_back_on_shortfall() {
        let svc = service().await;
        let p = svc.create_patient(patient("Arjun")).await.unwrap();
        let c = svc.create_consultation(consultation(&p.id)).await.unwrap();
        let it = svc.create_inventory_item(item("Amoxicillin 250mg", 1)).await.unwrap();

        let invoice = Invoice::from_draft(
            medicine_draft(&p.id, Some(&c.id), &it.id, 3, 50000 + 10500),
            "cash@clinic.in",
        )
        .unwrap();
        let err = svc.record_invoice(invoice).await.unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientStock { available: 1, requested: 3, .. }));

        assert_eq!(svc.get_inventory_item(&it.id).await.unwrap().stock, 1);
        assert!(svc.get_transactions(DateRange::last_days(today(), 1)).await.unwrap().is_empty());
        assert_eq!(svc.database().invoices().count().await.unwrap(), 0);
        assert_eq!(
            svc.get_consultations().await.unwrap()[0].status,
            ConsultationStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_record_invoice_for_unknown_patient_writes_nothing() {
        let svc = service().await;
        let it = svc.create_inventory_item(item("Paracetamol 500mg", 10)).await.unwrap();

        let invoice = Invoice::from_draft(
            medicine_draft("ghost-patient", None, &it.id, 2, 50000 + 7000),
            "cash@clinic.in",
        )
        .unwrap();
        let err = svc.record_invoice(invoice).await.unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(_)));

        assert_eq!(svc.get_inventory_item(&it.id).await.unwrap().stock, 10);
        assert!(svc.get_transactions(DateRange::last_days(today(), 1)).await.unwrap().is_empty());
        assert!(svc.get_stock_adjustments(DateRange::last_days(today(), 1)).await.unwrap().is_empty());
        assert_eq!(svc.database().invoices().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_stock_delta_rejected() {
        let svc = service().await;
        let it = svc.create_inventory_item(item("ORS sachet", 20)).await.unwrap();

        let err = svc
            .adjust_stock(StockAdjustment::new(&it.id, i64::MAX, AdjustmentReason::Correction, "sm@clinic.in"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(_)));
        assert_eq!(svc.get_inventory_item(&it.id).await.unwrap().stock, 20);
    }

    #[tokio::test]
    async fn test_receiving_order_restocks_once() {
        let svc = service().await;
        let s = svc.create_supplier(supplier()).await.unwrap();
        let it = svc.create_inventory_item(item("Insulin pen", 2)).await.unwrap();

        let order = Order {
            id: generate_id(),
            supplier_id: s.id.clone(),
            inventory_item_id: it.id.clone(),
            quantity: 10,
            unit_cost: Money::from_paise(45000),
            total_cost: Money::from_paise(450000),
            ordered_on: today(),
            expected_on: None,
            status: OrderStatus::Pending,
        };
        svc.create_order(order.clone()).await.unwrap();

        svc.update_order_status(&order.id, OrderStatus::Ordered, "sm@clinic.in").await.unwrap();
        let received = svc
            .update_order_status(&order.id, OrderStatus::Received, "sm@clinic.in")
            .await
            .unwrap();
        assert_eq!(received.status, OrderStatus::Received);
        assert_eq!(svc.get_inventory_item(&it.id).await.unwrap().stock, 12);

        // Re-sending Received is accepted but does not restock again.
        svc.update_order_status(&order.id, OrderStatus::Received, "sm@clinic.in").await.unwrap();
        assert_eq!(svc.get_inventory_item(&it.id).await.unwrap().stock, 12);

        let back = svc.update_order_status(&order.id, OrderStatus::Pending, "sm@clinic.in").await;
        assert!(matches!(back, Err(ServiceError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_staff_email_unique() {
        let svc = service().await;
        let staff = Staff {
            id: generate_id(),
            name: "Pooja Nair".to_string(),
            email: "pooja@clinic.in".to_string(),
            phone: "9123456780".to_string(),
            role: Role::Pharmacist,
            status: StaffStatus::Active,
            joined_on: today(),
        };
        svc.create_staff(staff.clone()).await.unwrap();

        let mut again = staff;
        again.id = generate_id();
        again.email = "POOJA@clinic.in".to_string();
        assert!(matches!(svc.create_staff(again).await, Err(ServiceError::Duplicate { .. })));
    }

    #[tokio::test]
    async fn test_roles_and_accounts() {
        let svc = service().await;
        assert!(svc.get_user_roles("nobody@clinic.in").await.unwrap().is_empty());

        let accounts = svc.user_accounts().unwrap();
        accounts
            .create_user(NewUser {
                email: "Admin@Clinic.in".to_string(),
                name: "Clinic Admin".to_string(),
                password: "correct horse".to_string(),
                roles: vec![Role::Admin, Role::Doctor],
            })
            .await
            .unwrap();

        let roles = svc.get_user_roles("admin@clinic.in").await.unwrap();
        assert_eq!(roles.len(), 2);
        assert!(roles.contains(&Role::Admin));

        let ok = accounts.authenticate_user("admin@clinic.in", "correct horse").await.unwrap();
        assert_eq!(ok.map(|a| a.name), Some("Clinic Admin".to_string()));
        assert!(accounts.authenticate_user("admin@clinic.in", "wrong").await.unwrap().is_none());
        assert!(accounts.authenticate_user("ghost@clinic.in", "x").await.unwrap().is_none());

        let short = accounts
            .create_user(NewUser {
                email: "x@clinic.in".to_string(),
                name: "X".to_string(),
                password: "short".to_string(),
                roles: vec![Role::Doctor],
            })
            .await;
        assert!(matches!(short, Err(ServiceError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_unknown_role_labels_are_skipped() {
        let svc = service().await;
        sqlx::query("INSERT INTO user_roles (email, role) VALUES ('a@clinic.in', 'doctor'), ('a@clinic.in', 'janitor')")
            .execute(svc.database().pool())
            .await
            .unwrap();

        assert_eq!(svc.get_user_roles("a@clinic.in").await.unwrap(), vec![Role::Doctor]);
    }

    #[tokio::test]
    async fn test_no_sheet_rows_capability() {
        let svc = service().await;
        assert!(svc.sheet_rows().is_none());
        assert_eq!(svc.backend(), BackendKind::Sqlite);
    }
}

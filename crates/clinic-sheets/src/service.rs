//! # Google Sheets DataService
//!
//! Binds the tab mappings to the `DataService` contract.
//!
//! ## Write Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  create_*   read tab ─► reject duplicate id ─► append row               │
//! │  update_*   read tab ─► find row by id ─► rewrite row in sheet order    │
//! │  stock      read item ─► apply delta in memory ─► rewrite + log row     │
//! │                                                                         │
//! │  Every write is last-write-wins. Two stock edits racing on the same    │
//! │  item can lose one delta; the SQLite backend guards this, Sheets       │
//! │  cannot without a lock service.                                         │
//! │                                                                         │
//! │  record_invoice and order receipt run as a Saga (saga.rs).             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use clinic_core::validation::{
    validate_consultation, validate_inventory_item, validate_order, validate_patient,
    validate_prescription, validate_staff, validate_stock_adjustment, validate_supplier,
};
use clinic_core::{
    parse_roles, AdjustmentReason, BackendKind, Consultation, ConsultationStatus, CoreError,
    DataService, DateRange, InventoryItem, Invoice, Order, OrderStatus, Patient, Prescription,
    Role, RowUpdate, ServiceError, ServiceResult, SheetRows, Staff, StockAdjustment, Supplier,
    Transaction,
};
use tracing::{debug, info, warn};

use crate::auth::{ServiceAccount, TokenProvider};
use crate::client::GoogleSheetsClient;
use crate::codec::{SheetRecord, Table};
use crate::error::{SheetsError, SheetsResult};
use crate::memory::MemorySheets;
use crate::records::{InvoiceRow, PaymentRow, USER_ROLES_HEADERS, USER_ROLES_SHEET};
use crate::saga::Saga;
use crate::transport::{row_range, SheetsTransport};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// `DataService` backed by one Google spreadsheet.
#[derive(Clone)]
pub struct SheetsDataService {
    transport: Arc<dyn SheetsTransport>,
}

impl std::fmt::Debug for SheetsDataService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsDataService").finish_non_exhaustive()
    }
}

/// An inventory row read for a stock change.
struct StockRow {
    row: u32,
    previous: Vec<String>,
    item: InventoryItem,
}

impl SheetsDataService {
    pub fn new(transport: Arc<dyn SheetsTransport>) -> Self {
        SheetsDataService { transport }
    }

    /// Connects to a live spreadsheet as a service account.
    pub fn connect(spreadsheet_id: impl Into<String>, account: ServiceAccount) -> SheetsResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        let auth = TokenProvider::new(account, client.clone())?;
        let spreadsheet_id = spreadsheet_id.into();

        info!(
            spreadsheet = %spreadsheet_id,
            account = %auth.client_email(),
            "Using Google Sheets backend"
        );
        Ok(Self::new(Arc::new(GoogleSheetsClient::new(client, auth, spreadsheet_id))))
    }

    /// Backed by an in-memory spreadsheet holding every clinic tab.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySheets::with_clinic_tabs()))
    }

    // -------------------------------------------------------------------------
    // Generic row helpers
    // -------------------------------------------------------------------------

    async fn table(&self, sheet: &str) -> SheetsResult<Table> {
        let values = self.transport.read(sheet).await?;
        let table = Table::parse(sheet, values)?;
        debug!(sheet = %sheet, rows = table.len(), "Read sheet");
        Ok(table)
    }

    async fn load<R: SheetRecord>(&self) -> SheetsResult<Vec<R>> {
        let table = self.table(R::SHEET).await?;
        Ok(table.decode_all::<R>()?.into_iter().map(|(_, r)| r).collect())
    }

    async fn get<R: SheetRecord>(&self, id: &str) -> SheetsResult<R> {
        let table = self.table(R::SHEET).await?;
        table
            .find::<R>(id)?
            .map(|(_, record)| record)
            .ok_or_else(|| SheetsError::not_found(R::ENTITY, id))
    }

    async fn exists<R: SheetRecord>(&self, id: &str) -> SheetsResult<bool> {
        let table = self.table(R::SHEET).await?;
        Ok(table.find::<R>(id)?.is_some())
    }

    /// Fails with `MissingReference` when `id` is not in `R`'s tab.
    async fn require_reference<R: SheetRecord>(&self, id: &str) -> SheetsResult<()> {
        if self.exists::<R>(id).await? {
            Ok(())
        } else {
            Err(SheetsError::MissingReference {
                entity: R::ENTITY.to_string(),
                id: id.to_string(),
            })
        }
    }

    async fn insert<R: SheetRecord>(&self, record: &R) -> SheetsResult<u32> {
        let table = self.table(R::SHEET).await?;
        if table.find::<R>(record.id())?.is_some() {
            return Err(SheetsError::Duplicate {
                entity: R::ENTITY.to_string(),
                detail: format!("id {}", record.id()),
            });
        }

        let values = table.layout(&record.encode())?;
        let row = self.transport.append(R::SHEET, values).await?;
        info!(sheet = R::SHEET, row, id = %record.id(), "Row appended");
        Ok(row)
    }

    async fn replace<R: SheetRecord>(&self, record: &R) -> SheetsResult<()> {
        let table = self.table(R::SHEET).await?;
        let (row, _) = table
            .find::<R>(record.id())?
            .ok_or_else(|| SheetsError::not_found(R::ENTITY, record.id()))?;

        let values = table.layout(&record.encode())?;
        self.transport.update(R::SHEET, row, values).await?;
        info!(sheet = R::SHEET, row, id = %record.id(), "Row updated");
        Ok(())
    }

    fn stock_row(&self, table: &Table, item_id: &str) -> SheetsResult<StockRow> {
        let (row, item) = table
            .find::<InventoryItem>(item_id)?
            .ok_or_else(|| SheetsError::not_found(InventoryItem::ENTITY, item_id))?;
        let previous = table
            .raw(row)
            .ok_or_else(|| SheetsError::invalid_row(table.sheet(), row, "row vanished while reading"))?;
        Ok(StockRow { row, previous, item })
    }

    /// Rewrites the item with its new stock and appends the log row.
    async fn write_stock_change(
        &self,
        saga: &mut Saga<'_>,
        inventory: &Table,
        adjustments: &Table,
        stock: &StockRow,
        adjustment: &StockAdjustment,
    ) -> SheetsResult<InventoryItem> {
        let mut item = stock.item.clone();
        item.stock = item.apply_delta(adjustment.quantity_delta)?;
        item.updated_at = Utc::now();

        saga.replace(
            InventoryItem::SHEET,
            stock.row,
            stock.previous.clone(),
            inventory.layout(&item.encode())?,
        )
        .await?;
        saga.append(StockAdjustment::SHEET, adjustments.layout(&adjustment.encode())?)
            .await?;

        Ok(item)
    }

    async fn roles_for(&self, email: &str) -> SheetsResult<Vec<Role>> {
        let table = self.table(USER_ROLES_SHEET).await?;
        table.require(USER_ROLES_HEADERS)?;

        let wanted = email.trim().to_lowercase();
        let labels: Vec<&str> = table
            .rows()
            .filter(|row| row.text("email").to_lowercase() == wanted)
            .map(|row| row.text("role"))
            .collect();

        let (roles, unknown) = parse_roles(labels);
        if !unknown.is_empty() {
            warn!(email = %email, unknown = ?unknown, "Skipping unrecognised roles");
        }
        debug!(email = %email, roles = ?roles, "Resolved roles");
        Ok(roles)
    }

    async fn record(&self, invoice: &Invoice) -> SheetsResult<()> {
        // Everything that can be checked is checked before the first write.
        self.require_reference::<Patient>(&invoice.patient_id).await?;

        let withdrawals = invoice.stock_withdrawals();
        let inventory = self.table(InventoryItem::SHEET).await?;
        let mut stock_rows = Vec::with_capacity(withdrawals.len());
        for (item_id, quantity) in &withdrawals {
            let stock = self.stock_row(&inventory, item_id)?;
            stock.item.apply_delta(-quantity)?;
            stock_rows.push((stock, *quantity));
        }

        let consultations = self.table(Consultation::SHEET).await?;
        let consultation = match &invoice.consultation_id {
            Some(id) => {
                let (row, record) = consultations
                    .find::<Consultation>(id)?
                    .ok_or_else(|| SheetsError::not_found(Consultation::ENTITY, id))?;
                let previous = consultations.raw(row).unwrap_or_default();
                Some((row, previous, record))
            }
            None => None,
        };

        let invoices = self.table(InvoiceRow::SHEET).await?;
        if invoices.find::<InvoiceRow>(&invoice.id)?.is_some() {
            return Err(SheetsError::Duplicate {
                entity: "Invoice".to_string(),
                detail: format!("id {}", invoice.id),
            });
        }
        let payments = self.table(PaymentRow::SHEET).await?;
        let transactions = self.table(Transaction::SHEET).await?;
        let adjustments = self.table(StockAdjustment::SHEET).await?;

        let mut saga = Saga::new(self.transport.as_ref());
        let result = async {
            let header = InvoiceRow {
                id: invoice.id.clone(),
                patient_id: invoice.patient_id.clone(),
                consultation_id: invoice.consultation_id.clone(),
                total: invoice.total,
                created_by: invoice.created_by.clone(),
                created_at: invoice.created_at,
            };
            saga.append(InvoiceRow::SHEET, invoices.layout(&header.encode())?).await?;

            for (n, split) in invoice.payments.iter().enumerate() {
                let payment = PaymentRow {
                    id: format!("{}-{}", invoice.id, n + 1),
                    invoice_id: invoice.id.clone(),
                    method: split.method,
                    amount: split.amount,
                };
                saga.append(PaymentRow::SHEET, payments.layout(&payment.encode())?).await?;
            }

            for line in invoice.to_transactions() {
                saga.append(Transaction::SHEET, transactions.layout(&line.encode())?).await?;
            }

            for (stock, quantity) in &stock_rows {
                let mut adjustment = StockAdjustment::new(
                    &stock.item.id,
                    -quantity,
                    AdjustmentReason::Sale,
                    &invoice.created_by,
                );
                adjustment.note = Some(format!("Invoice {}", invoice.id));
                adjustment.created_at = invoice.created_at;
                self.write_stock_change(&mut saga, &inventory, &adjustments, stock, &adjustment)
                    .await?;
            }

            if let Some((row, previous, record)) = &consultation {
                let mut completed = record.clone();
                completed.status = ConsultationStatus::Completed;
                saga.replace(
                    Consultation::SHEET,
                    *row,
                    previous.clone(),
                    consultations.layout(&completed.encode())?,
                )
                .await?;
            }

            Ok::<(), SheetsError>(())
        }
        .await;

        match result {
            Ok(()) => {
                info!(
                    id = %invoice.id,
                    total = %invoice.total,
                    writes = saga.len(),
                    "Invoice recorded"
                );
                Ok(())
            }
            Err(e) => Err(saga.abort(e).await),
        }
    }
}

fn row_must_be_data(row: u32) -> ServiceResult<()> {
    if row < 2 {
        return Err(ServiceError::Invalid(format!(
            "row {row} cannot be written: row 1 holds the headers"
        )));
    }
    Ok(())
}

fn sheet_name_must_be_set(sheet: &str) -> ServiceResult<()> {
    if sheet.trim().is_empty() {
        return Err(ServiceError::Invalid("sheet name is required".to_string()));
    }
    Ok(())
}

#[async_trait]
impl DataService for SheetsDataService {
    fn backend(&self) -> BackendKind {
        BackendKind::GoogleSheets
    }

    // -------------------------------------------------------------------------
    // Patients
    // -------------------------------------------------------------------------

    async fn get_patients(&self) -> ServiceResult<Vec<Patient>> {
        let mut patients = self.load::<Patient>().await?;
        patients.sort_by_key(|p| p.name.to_lowercase());
        Ok(patients)
    }

    async fn get_patient(&self, id: &str) -> ServiceResult<Patient> {
        Ok(self.get::<Patient>(id).await?)
    }

    async fn create_patient(&self, patient: Patient) -> ServiceResult<Patient> {
        validate_patient(&patient)?;
        self.insert(&patient).await?;
        Ok(patient)
    }

    async fn update_patient(&self, patient: Patient) -> ServiceResult<Patient> {
        validate_patient(&patient)?;
        self.replace(&patient).await?;
        Ok(patient)
    }

    // -------------------------------------------------------------------------
    // Consultations
    // -------------------------------------------------------------------------

    async fn get_consultations(&self) -> ServiceResult<Vec<Consultation>> {
        let mut consultations = self.load::<Consultation>().await?;
        consultations.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        Ok(consultations)
    }

    async fn create_consultation(&self, consultation: Consultation) -> ServiceResult<Consultation> {
        validate_consultation(&consultation)?;
        self.require_reference::<Patient>(&consultation.patient_id).await?;
        self.insert(&consultation).await?;
        Ok(consultation)
    }

    async fn update_consultation_status(
        &self,
        id: &str,
        status: ConsultationStatus,
    ) -> ServiceResult<Consultation> {
        let mut consultation = self.get::<Consultation>(id).await?;
        consultation.status = status;
        self.replace(&consultation).await?;
        Ok(consultation)
    }

    // -------------------------------------------------------------------------
    // Prescriptions
    // -------------------------------------------------------------------------

    async fn get_prescriptions(&self) -> ServiceResult<Vec<Prescription>> {
        let mut prescriptions = self.load::<Prescription>().await?;
        prescriptions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(prescriptions)
    }

    async fn create_prescription(&self, prescription: Prescription) -> ServiceResult<Prescription> {
        validate_prescription(&prescription)?;
        self.require_reference::<Consultation>(&prescription.consultation_id).await?;
        self.insert(&prescription).await?;
        Ok(prescription)
    }

    // -------------------------------------------------------------------------
    // Inventory
    // -------------------------------------------------------------------------

    async fn get_inventory(&self) -> ServiceResult<Vec<InventoryItem>> {
        let mut items = self.load::<InventoryItem>().await?;
        items.sort_by_key(|i| i.name.to_lowercase());
        Ok(items)
    }

    async fn get_inventory_item(&self, id: &str) -> ServiceResult<InventoryItem> {
        Ok(self.get::<InventoryItem>(id).await?)
    }

    async fn create_inventory_item(&self, item: InventoryItem) -> ServiceResult<InventoryItem> {
        validate_inventory_item(&item)?;
        if let Some(supplier_id) = &item.supplier_id {
            self.require_reference::<Supplier>(supplier_id).await?;
        }
        self.insert(&item).await?;
        Ok(item)
    }

    async fn update_inventory_item(&self, item: InventoryItem) -> ServiceResult<InventoryItem> {
        validate_inventory_item(&item)?;
        let current = self.get::<InventoryItem>(&item.id).await?;

        // Stock only moves through adjustments, invoices and receipts.
        let updated = InventoryItem {
            stock: current.stock,
            updated_at: Utc::now(),
            ..item
        };
        self.replace(&updated).await?;
        Ok(updated)
    }

    async fn adjust_stock(&self, adjustment: StockAdjustment) -> ServiceResult<InventoryItem> {
        validate_stock_adjustment(&adjustment)?;

        let inventory = self.table(InventoryItem::SHEET).await?;
        let adjustments = self.table(StockAdjustment::SHEET).await?;
        let stock = self.stock_row(&inventory, &adjustment.inventory_item_id)?;

        let mut saga = Saga::new(self.transport.as_ref());
        match self
            .write_stock_change(&mut saga, &inventory, &adjustments, &stock, &adjustment)
            .await
        {
            Ok(item) => {
                info!(
                    item_id = %item.id,
                    delta = adjustment.quantity_delta,
                    stock = item.stock,
                    reason = %adjustment.reason,
                    "Stock adjusted"
                );
                Ok(item)
            }
            Err(e) => Err(saga.abort(e).await.into()),
        }
    }

    async fn get_stock_adjustments(&self, range: DateRange) -> ServiceResult<Vec<StockAdjustment>> {
        let mut adjustments: Vec<StockAdjustment> = self
            .load::<StockAdjustment>()
            .await?
            .into_iter()
            .filter(|a| range.contains(a.created_at))
            .collect();
        adjustments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(adjustments)
    }

    // -------------------------------------------------------------------------
    // Staff & Suppliers
    // -------------------------------------------------------------------------

    async fn get_staff(&self) -> ServiceResult<Vec<Staff>> {
        let mut staff = self.load::<Staff>().await?;
        staff.sort_by_key(|s| s.name.to_lowercase());
        Ok(staff)
    }

    async fn create_staff(&self, staff: Staff) -> ServiceResult<Staff> {
        validate_staff(&staff)?;
        let existing = self.load::<Staff>().await?;
        if existing.iter().any(|s| s.email.eq_ignore_ascii_case(staff.email.trim())) {
            return Err(ServiceError::Duplicate {
                entity: "Staff".to_string(),
                detail: format!("email {}", staff.email),
            });
        }
        self.insert(&staff).await?;
        Ok(staff)
    }

    async fn get_suppliers(&self) -> ServiceResult<Vec<Supplier>> {
        let mut suppliers = self.load::<Supplier>().await?;
        suppliers.sort_by_key(|s| s.name.to_lowercase());
        Ok(suppliers)
    }

    async fn create_supplier(&self, supplier: Supplier) -> ServiceResult<Supplier> {
        validate_supplier(&supplier)?;
        self.insert(&supplier).await?;
        Ok(supplier)
    }

    async fn update_supplier(&self, supplier: Supplier) -> ServiceResult<Supplier> {
        validate_supplier(&supplier)?;
        self.replace(&supplier).await?;
        Ok(supplier)
    }

    // -------------------------------------------------------------------------
    // Transactions & Orders
    // -------------------------------------------------------------------------

    async fn get_transactions(&self, range: DateRange) -> ServiceResult<Vec<Transaction>> {
        let mut transactions: Vec<Transaction> = self
            .load::<Transaction>()
            .await?
            .into_iter()
            .filter(|t| range.contains(t.date))
            .collect();
        transactions.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(transactions)
    }

    async fn get_orders(&self) -> ServiceResult<Vec<Order>> {
        let mut orders = self.load::<Order>().await?;
        orders.sort_by(|a, b| b.ordered_on.cmp(&a.ordered_on));
        Ok(orders)
    }

    async fn create_order(&self, order: Order) -> ServiceResult<Order> {
        validate_order(&order)?;
        self.require_reference::<Supplier>(&order.supplier_id).await?;
        self.require_reference::<InventoryItem>(&order.inventory_item_id).await?;
        self.insert(&order).await?;
        Ok(order)
    }

    async fn update_order_status(
        &self,
        id: &str,
        status: OrderStatus,
        changed_by: &str,
    ) -> ServiceResult<Order> {
        let orders = self.table(Order::SHEET).await?;
        let (row, order) = orders
            .find::<Order>(id)?
            .ok_or_else(|| ServiceError::not_found(Order::ENTITY, id))?;

        if !order.status.can_transition_to(status) {
            return Err(CoreError::InvalidStatusTransition {
                entity: "Order".to_string(),
                from: order.status.to_string(),
                to: status.to_string(),
            }
            .into());
        }
        if order.status == status {
            return Ok(order);
        }

        let previous = orders.raw(row).unwrap_or_default();
        let updated = Order { status, ..order.clone() };
        let mut saga = Saga::new(self.transport.as_ref());

        let result = async {
            saga.replace(Order::SHEET, row, previous, orders.layout(&updated.encode())?)
                .await?;

            if status == OrderStatus::Received {
                let inventory = self.table(InventoryItem::SHEET).await?;
                let adjustments = self.table(StockAdjustment::SHEET).await?;
                let stock = self.stock_row(&inventory, &order.inventory_item_id)?;

                let mut adjustment = StockAdjustment::new(
                    &order.inventory_item_id,
                    order.quantity,
                    AdjustmentReason::Purchase,
                    changed_by,
                );
                adjustment.note = Some(format!("Order {} received", order.id));
                self.write_stock_change(&mut saga, &inventory, &adjustments, &stock, &adjustment)
                    .await?;
            }
            Ok::<(), SheetsError>(())
        }
        .await;

        if let Err(e) = result {
            return Err(saga.abort(e).await.into());
        }

        info!(id = %id, from = %order.status, to = %status, "Order status changed");
        Ok(updated)
    }

    // -------------------------------------------------------------------------
    // Roles & Billing
    // -------------------------------------------------------------------------

    async fn get_user_roles(&self, email: &str) -> ServiceResult<Vec<Role>> {
        Ok(self.roles_for(email).await?)
    }

    async fn record_invoice(&self, invoice: Invoice) -> ServiceResult<Invoice> {
        invoice.validate()?;
        self.record(&invoice).await?;
        Ok(invoice)
    }

    fn sheet_rows(&self) -> Option<&dyn SheetRows> {
        Some(self)
    }
}

#[async_trait]
impl SheetRows for SheetsDataService {
    async fn append_row(&self, sheet: &str, values: Vec<String>) -> ServiceResult<String> {
        sheet_name_must_be_set(sheet)?;
        let width = values.len();
        let row = self.transport.append(sheet, values).await?;
        info!(sheet = %sheet, row, "Raw row appended");
        Ok(row_range(sheet, row, width))
    }

    async fn update_row(&self, sheet: &str, row: u32, values: Vec<String>) -> ServiceResult<()> {
        sheet_name_must_be_set(sheet)?;
        row_must_be_data(row)?;
        self.transport.update(sheet, row, values).await?;
        info!(sheet = %sheet, row, "Raw row updated");
        Ok(())
    }

    async fn batch_update(&self, updates: Vec<RowUpdate>) -> ServiceResult<()> {
        for update in &updates {
            sheet_name_must_be_set(&update.sheet)?;
            row_must_be_data(update.row)?;
        }
        let count = updates.len();
        self.transport.batch_update(updates).await?;
        info!(rows = count, "Raw rows updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::TransportOp;
    use chrono::NaiveDate;
    use clinic_core::invoice::{InvoiceDraft, InvoiceItemDraft};
    use clinic_core::{
        generate_id, Gender, InventoryCategory, InvoiceItemType, Money, PaymentMethod,
        PaymentSplit, StaffStatus, SupplierStatus,
    };

    fn service() -> (Arc<MemorySheets>, SheetsDataService) {
        let sheets = Arc::new(MemorySheets::with_clinic_tabs());
        let svc = SheetsDataService::new(sheets.clone());
        (sheets, svc)
    }

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn patient(name: &str) -> Patient {
        Patient {
            id: generate_id(),
            name: name.to_string(),
            age: 34,
            gender: Gender::Female,
            phone: "9822012345".to_string(),
            email: Some("meera@example.in".to_string()),
            district: "Pune".to_string(),
            state: "Maharashtra".to_string(),
            occupation: None,
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
            chief_complaint: "Cough".to_string(),
            diagnosis: "Bronchitis".to_string(),
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
            batch_number: None,
            updated_at: Utc::now(),
        }
    }

    fn supplier() -> Supplier {
        Supplier {
            id: generate_id(),
            name: "Shree Pharma Distributors".to_string(),
            contact_person: "R. Kulkarni".to_string(),
            phone: "020-25671234".to_string(),
            email: None,
            address: None,
            gst_number: None,
            status: SupplierStatus::Active,
        }
    }

    fn staff(email: &str) -> Staff {
        Staff {
            id: generate_id(),
            name: "Anita Rao".to_string(),
            email: email.to_string(),
            phone: "9811122233".to_string(),
            role: Role::Pharmacist,
            status: StaffStatus::Active,
            joined_on: today(),
        }
    }

    /// Consultation line of 500.00 plus `qty` strips at 35.00.
    fn invoice(patient_id: &str, consultation_id: &str, item_id: &str, qty: i64) -> Invoice {
        let draft = InvoiceDraft {
            patient_id: patient_id.to_string(),
            consultation_id: Some(consultation_id.to_string()),
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
            payments: vec![
                PaymentSplit {
                    method: PaymentMethod::Cash,
                    amount: Money::from_rupees(500),
                },
                PaymentSplit {
                    method: PaymentMethod::Upi,
                    amount: Money::from_paise(3500 * qty),
                },
            ],
        };
        Invoice::from_draft(draft, "cashier@clinic.in").unwrap()
    }

    /// Patient, pending consultation and a stocked item.
    async fn billing_fixture(svc: &SheetsDataService) -> (Patient, Consultation, InventoryItem) {
        let p = svc.create_patient(patient("Meera Joshi")).await.unwrap();
        let c = svc.create_consultation(consultation(&p.id)).await.unwrap();
        let i = svc.create_inventory_item(item("Paracetamol 500mg", 10)).await.unwrap();
        (p, c, i)
    }

    #[tokio::test]
    async fn test_patient_rows_round_trip() {
        let (sheets, svc) = service();
        let mut p = patient("Meera Joshi");
        svc.create_patient(p.clone()).await.unwrap();
        assert_eq!(sheets.data_row_count("Patients").await, 1);

        p.allergies = Some("Penicillin".to_string());
        svc.update_patient(p.clone()).await.unwrap();

        let stored = svc.get_patient(&p.id).await.unwrap();
        assert_eq!(stored.name, "Meera Joshi");
        assert_eq!(stored.allergies.as_deref(), Some("Penicillin"));
        assert_eq!(stored.registered_at, p.registered_at);
        assert_eq!(sheets.data_row_count("Patients").await, 1);

        assert!(matches!(
            svc.create_patient(p).await,
            Err(ServiceError::Duplicate { .. })
        ));
        assert!(matches!(
            svc.get_patient("nope").await,
            Err(ServiceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_hand_edited_row_reports_its_number() {
        let (sheets, svc) = service();
        svc.create_patient(patient("Meera Joshi")).await.unwrap();

        let mut rows = sheets.rows("Patients").await;
        let age = rows[0].iter().position(|h| h == "age").unwrap();
        rows[1][age] = "thirty".to_string();
        sheets.put_tab("Patients", rows).await;

        match svc.get_patients().await {
            Err(ServiceError::Backend { backend, message }) => {
                assert_eq!(backend, BackendKind::GoogleSheets);
                assert!(message.contains("row 2"), "{message}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_references_are_checked() {
        let (_, svc) = service();
        assert!(matches!(
            svc.create_consultation(consultation("ghost")).await,
            Err(ServiceError::Invalid(_))
        ));

        let i = svc.create_inventory_item(item("ORS", 5)).await.unwrap();
        let order = Order {
            id: generate_id(),
            supplier_id: "ghost".to_string(),
            inventory_item_id: i.id,
            quantity: 10,
            unit_cost: Money::from_rupees(12),
            total_cost: Money::from_rupees(120),
            ordered_on: today(),
            expected_on: None,
            status: OrderStatus::Pending,
        };
        assert!(matches!(svc.create_order(order).await, Err(ServiceError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_out_of_range_stock_delta_rejected() {
        let (sheets, svc) = service();
        let i = svc.create_inventory_item(item("ORS", 5)).await.unwrap();

        let huge = StockAdjustment::new(&i.id, i64::MAX, AdjustmentReason::Correction, "stock@clinic.in");
        assert!(matches!(svc.adjust_stock(huge).await, Err(ServiceError::Invalid(_))));
        assert_eq!(sheets.data_row_count("StockAdjustments").await, 0);
        assert_eq!(svc.get_inventory_item(&i.id).await.unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_adjust_stock_and_edit_item() {
        let (sheets, svc) = service();
        let i = svc.create_inventory_item(item("Cetirizine", 10)).await.unwrap();

        let adjustment = StockAdjustment::new(&i.id, -3, AdjustmentReason::Damage, "stock@clinic.in");
        assert_eq!(svc.adjust_stock(adjustment).await.unwrap().stock, 7);
        assert_eq!(sheets.data_row_count("StockAdjustments").await, 1);

        let too_many = StockAdjustment::new(&i.id, -8, AdjustmentReason::Expiry, "stock@clinic.in");
        assert!(matches!(
            svc.adjust_stock(too_many).await,
            Err(ServiceError::InsufficientStock { available: 7, requested: 8, .. })
        ));
        assert_eq!(sheets.data_row_count("StockAdjustments").await, 1);

        let mut edited = svc.get_inventory_item(&i.id).await.unwrap();
        edited.stock = 999;
        edited.reorder_level = 2;
        let saved = svc.update_inventory_item(edited).await.unwrap();
        assert_eq!(saved.stock, 7);
        assert_eq!(saved.reorder_level, 2);
    }

    #[tokio::test]
    async fn test_stock_log_failure_restores_item() {
        let (sheets, svc) = service();
        let i = svc.create_inventory_item(item("Cetirizine", 10)).await.unwrap();
        sheets.fail_on(TransportOp::Append, "StockAdjustments", 1).await;

        let adjustment = StockAdjustment::new(&i.id, 5, AdjustmentReason::Return, "stock@clinic.in");
        assert!(matches!(
            svc.adjust_stock(adjustment).await,
            Err(ServiceError::Backend { .. })
        ));
        assert_eq!(svc.get_inventory_item(&i.id).await.unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_staff_email_unique_ignoring_case() {
        let (_, svc) = service();
        svc.create_staff(staff("anita@clinic.in")).await.unwrap();
        assert!(matches!(
            svc.create_staff(staff("Anita@Clinic.in")).await,
            Err(ServiceError::Duplicate { .. })
        ));
    }

    #[tokio::test]
    async fn test_roles_from_user_roles_tab() {
        let (sheets, svc) = service();
        sheets
            .put_tab(
                "UserRoles",
                vec![
                    cells(&["Email", "Role"]),
                    cells(&["Asha@Clinic.in", "doctor"]),
                    cells(&["asha@clinic.in", "Cash Manager"]),
                    cells(&["asha@clinic.in", "janitor"]),
                    cells(&["", ""]),
                    cells(&["ravi@clinic.in", "admin"]),
                ],
            )
            .await;

        let roles = svc.get_user_roles("asha@clinic.in").await.unwrap();
        assert_eq!(roles, vec![Role::Doctor, Role::CashManager]);
        assert!(svc.get_user_roles("nobody@clinic.in").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_order_receipt_restocks_once() {
        let (sheets, svc) = service();
        let s = svc.create_supplier(supplier()).await.unwrap();
        let i = svc.create_inventory_item(item("Amoxicillin", 4)).await.unwrap();
        let order = svc
            .create_order(Order {
                id: generate_id(),
                supplier_id: s.id,
                inventory_item_id: i.id.clone(),
                quantity: 20,
                unit_cost: Money::from_rupees(40),
                total_cost: Money::from_rupees(800),
                ordered_on: today(),
                expected_on: None,
                status: OrderStatus::Pending,
            })
            .await
            .unwrap();

        svc.update_order_status(&order.id, OrderStatus::Ordered, "stock@clinic.in")
            .await
            .unwrap();
        let received = svc
            .update_order_status(&order.id, OrderStatus::Received, "stock@clinic.in")
            .await
            .unwrap();
        assert_eq!(received.status, OrderStatus::Received);
        assert_eq!(svc.get_inventory_item(&i.id).await.unwrap().stock, 24);

        // Same status again is a no-op.
        svc.update_order_status(&order.id, OrderStatus::Received, "stock@clinic.in")
            .await
            .unwrap();
        assert_eq!(svc.get_inventory_item(&i.id).await.unwrap().stock, 24);
        assert_eq!(sheets.data_row_count("StockAdjustments").await, 1);

        assert!(matches!(
            svc.update_order_status(&order.id, OrderStatus::Pending, "stock@clinic.in").await,
            Err(ServiceError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_record_invoice_writes_every_tab() {
        let (sheets, svc) = service();
        let (p, c, i) = billing_fixture(&svc).await;

        svc.record_invoice(invoice(&p.id, &c.id, &i.id, 2)).await.unwrap();

        assert_eq!(sheets.data_row_count("Invoices").await, 1);
        assert_eq!(sheets.data_row_count("InvoicePayments").await, 2);
        assert_eq!(sheets.data_row_count("Transactions").await, 2);
        assert_eq!(svc.get_inventory_item(&i.id).await.unwrap().stock, 8);

        let consultations = svc.get_consultations().await.unwrap();
        assert_eq!(consultations[0].status, ConsultationStatus::Completed);

        let range = DateRange::last_days(today(), 1);
        let sale = svc.get_stock_adjustments(range).await.unwrap();
        assert_eq!(sale.len(), 1);
        assert_eq!(sale[0].quantity_delta, -2);
        assert_eq!(sale[0].reason, AdjustmentReason::Sale);

        let lines = svc.get_transactions(range).await.unwrap();
        let total: i64 = lines.iter().map(|t| t.total.paise()).sum();
        assert_eq!(total, 57000);
    }

    #[tokio::test]
    async fn test_record_invoice_shortfall_writes_nothing() {
        let (sheets, svc) = service();
        let (p, c, i) = billing_fixture(&svc).await;

        assert!(matches!(
            svc.record_invoice(invoice(&p.id, &c.id, &i.id, 11)).await,
            Err(ServiceError::InsufficientStock { available: 10, requested: 11, .. })
        ));
        assert_eq!(sheets.data_row_count("Invoices").await, 0);
        assert_eq!(sheets.data_row_count("Transactions").await, 0);
    }

    #[tokio::test]
    async fn test_record_invoice_for_unknown_patient_writes_nothing() {
        let (sheets, svc) = service();
        let (_, c, i) = billing_fixture(&svc).await;

        assert!(matches!(
            svc.record_invoice(invoice("ghost-patient", &c.id, &i.id, 2)).await,
            Err(ServiceError::Invalid(_))
        ));
        assert_eq!(sheets.data_row_count("Invoices").await, 0);
        assert_eq!(sheets.data_row_count("InvoicePayments").await, 0);
        assert_eq!(sheets.data_row_count("Transactions").await, 0);
        assert_eq!(sheets.data_row_count("StockAdjustments").await, 0);
        assert_eq!(svc.get_inventory_item(&i.id).await.unwrap().stock, 10);
        assert_eq!(
            svc.get_consultations().await.unwrap()[0].status,
            ConsultationStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_record_invoice_rolls_back_on_failure() {
        let (sheets, svc) = service();
        let (p, c, i) = billing_fixture(&svc).await;
        sheets.fail_on(TransportOp::Append, "StockAdjustments", 1).await;

        assert!(matches!(
            svc.record_invoice(invoice(&p.id, &c.id, &i.id, 2)).await,
            Err(ServiceError::Backend { .. })
        ));

        assert_eq!(sheets.data_row_count("Invoices").await, 0);
        assert_eq!(sheets.data_row_count("InvoicePayments").await, 0);
        assert_eq!(sheets.data_row_count("Transactions").await, 0);
        assert_eq!(svc.get_inventory_item(&i.id).await.unwrap().stock, 10);
        assert_eq!(
            svc.get_consultations().await.unwrap()[0].status,
            ConsultationStatus::Pending
        );

        // Cleared rows are reused by the retry.
        svc.record_invoice(invoice(&p.id, &c.id, &i.id, 2)).await.unwrap();
        assert_eq!(sheets.rows("Invoices").await.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_rollback_is_inconsistent() {
        let (sheets, svc) = service();
        let (p, c, i) = billing_fixture(&svc).await;
        sheets.fail_on(TransportOp::Append, "StockAdjustments", 1).await;
        sheets.fail_on(TransportOp::Clear, "Invoices", 1).await;

        match svc.record_invoice(invoice(&p.id, &c.id, &i.id, 2)).await {
            Err(ServiceError::Inconsistent { step, .. }) => assert_eq!(step, "append Invoices row 2"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_raw_row_access() {
        let (sheets, svc) = service();
        sheets.put_tab("Notes", vec![cells(&["id", "text"])]).await;
        let rows = svc.sheet_rows().unwrap();

        assert_eq!(rows.append_row("Notes", cells(&["1", "hello"])).await.unwrap(), "Notes!A2:B2");
        rows.update_row("Notes", 2, cells(&["1", "edited"])).await.unwrap();
        rows.batch_update(vec![RowUpdate {
            sheet: "Notes".to_string(),
            row: 3,
            values: cells(&["2", "added"]),
        }])
        .await
        .unwrap();
        assert_eq!(sheets.data_row_count("Notes").await, 2);

        assert!(matches!(
            rows.update_row("Notes", 1, cells(&["x"])).await,
            Err(ServiceError::Invalid(_))
        ));
        assert!(matches!(
            rows.append_row(" ", cells(&["x"])).await,
            Err(ServiceError::Invalid(_))
        ));
        assert!(svc.user_accounts().is_none());
    }
}

//! # Repository Module
//!
//! One repository per table group. Each holds a clone of the pool.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  SqliteDataService::create_patient(patient)                            │
//! │       │                                                                 │
//! │       │  self.db.patients().insert(&patient)                           │
//! │       ▼                                                                 │
//! │  PatientRepository                                                     │
//! │  ├── list(&self)                                                       │
//! │  ├── get_by_id(&self, id)                                              │
//! │  ├── insert(&self, patient)                                            │
//! │  └── update(&self, patient)                                            │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Multi-table writes (stock, orders, invoices) open one transaction     │
//! │  and pass the connection to the helpers in `inventory`.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`patient::PatientRepository`]
//! - [`consultation::ConsultationRepository`]
//! - [`prescription::PrescriptionRepository`]
//! - [`inventory::InventoryRepository`] - items, guarded stock deltas, adjustments
//! - [`staff::StaffRepository`]
//! - [`supplier::SupplierRepository`]
//! - [`order::OrderRepository`] - receiving restocks inventory
//! - [`invoice::InvoiceRepository`] - invoices, payments, transactions
//! - [`user::UserRepository`] - accounts and role grants

pub mod consultation;
pub mod inventory;
pub mod invoice;
pub mod order;
pub mod patient;
pub mod prescription;
pub mod staff;
pub mod supplier;
pub mod user;

//! # Seed Data Generator
//!
//! Populates a SQLite database with demo data for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./clinic_dev.db with the default admin password
//! cargo run -p clinic-db --bin seed
//!
//! # Specify database path and admin password
//! cargo run -p clinic-db --bin seed -- --db ./data/clinic.db --password 'long secret'
//! ```
//!
//! ## Generated Data
//! - One account per role: `{role}@clinic.local`, admin holds every role
//! - Suppliers with GST numbers
//! - Medicines and consumables with batch numbers and expiry dates;
//!   a few are below their reorder level or close to expiry
//! - Patients with a pending consultation each

use chrono::{Duration, Utc};
use clinic_core::{
    generate_id, Consultation, ConsultationStatus, Gender, InventoryCategory, InventoryItem, Money,
    NewUser, Patient, Role, Supplier, SupplierStatus,
};
use clinic_db::{Database, DbConfig};
use std::env;

/// (name, category, unit, cost paise, selling paise, stock, reorder level, days to expiry)
const ITEMS: &[(&str, InventoryCategory, &str, i64, i64, i64, i64, i64)] = &[
    ("Paracetamol 500mg", InventoryCategory::Medicine, "strip", 1200, 2000, 240, 50, 540),
    ("Amoxicillin 250mg", InventoryCategory::Medicine, "strip", 4500, 6800, 80, 30, 300),
    ("Azithromycin 500mg", InventoryCategory::Medicine, "strip", 7200, 11000, 12, 20, 200),
    ("Cetirizine 10mg", InventoryCategory::Medicine, "strip", 800, 1500, 150, 40, 20),
    ("Metformin 500mg", InventoryCategory::Medicine, "strip", 1500, 2600, 95, 40, 420),
    ("ORS Sachet", InventoryCategory::Medicine, "sachet", 1000, 2100, 300, 60, 700),
    ("Insulin Pen", InventoryCategory::Medicine, "pen", 42000, 55000, 6, 5, 90),
    ("Disposable Syringe 5ml", InventoryCategory::Consumable, "piece", 400, 1000, 500, 100, 900),
    ("Cotton Roll 100g", InventoryCategory::Consumable, "roll", 3000, 4500, 25, 10, 1000),
    ("Digital Thermometer", InventoryCategory::Equipment, "piece", 9000, 15000, 8, 3, 1500),
];

/// (name, contact person, phone, GSTIN)
const SUPPLIERS: &[(&str, &str, &str, &str)] = &[
    ("Shree Pharma Distributors", "R. Kulkarni", "020-25671234", "27ABCDE1234F1Z5"),
    ("MedLine Surgicals", "Anita Rao", "080-41122334", "29FGHIJ5678K1Z2"),
];

/// (name, age, gender, phone, district, state, complaint)
const PATIENTS: &[(&str, i64, Gender, &str, &str, &str, &str)] = &[
    ("Ravi Deshmukh", 41, Gender::Male, "9876543210", "Nagpur", "Maharashtra", "Fever for 3 days"),
    ("Kavita Joshi", 35, Gender::Female, "9822012345", "Pune", "Maharashtra", "Persistent cough"),
    ("Arjun Menon", 8, Gender::Male, "9447001122", "Kochi", "Kerala", "Ear pain"),
    ("Fatima Shaikh", 62, Gender::Female, "9811098110", "Bhopal", "Madhya Pradesh", "Sugar follow-up"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./clinic_dev.db");
    let mut password = String::from("clinic-admin");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--password" | "-p" => {
                if i + 1 < args.len() {
                    password = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Clinic Desk Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>         Database file path (default: ./clinic_dev.db)");
                println!("  -p, --password <PASS>   Password for every seeded account (default: clinic-admin)");
                println!("  -h, --help              Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Clinic Desk Seed Data Generator");
    println!("==================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.patients().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} patients", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Accounts
    println!();
    println!("Creating accounts...");
    for role in Role::ALL {
        let roles = if *role == Role::Admin { Role::ALL.to_vec() } else { vec![*role] };
        let account = db
            .users()
            .create(&NewUser {
                email: format!("{}@clinic.local", role.as_str()),
                name: format!("Demo {}", role),
                password: password.clone(),
                roles,
            })
            .await?;
        println!("  {} ({} roles)", account.email, account.roles.len());
    }

    // Suppliers
    let mut supplier_ids = Vec::new();
    for (name, contact, phone, gst) in SUPPLIERS {
        let supplier = Supplier {
            id: generate_id(),
            name: name.to_string(),
            contact_person: contact.to_string(),
            phone: phone.to_string(),
            email: None,
            address: None,
            gst_number: Some(gst.to_string()),
            status: SupplierStatus::Active,
        };
        db.suppliers().insert(&supplier).await?;
        supplier_ids.push(supplier.id);
    }
    println!("✓ Created {} suppliers", supplier_ids.len());

    // Inventory
    let today = Utc::now().date_naive();
    for (idx, (name, category, unit, cost, selling, stock, reorder, expiry_days)) in ITEMS.iter().enumerate() {
        let item = InventoryItem {
            id: generate_id(),
            name: name.to_string(),
            category: *category,
            stock: *stock,
            unit: unit.to_string(),
            cost_price: Money::from_paise(*cost),
            selling_price: Money::from_paise(*selling),
            supplier_id: supplier_ids.get(idx % supplier_ids.len()).cloned(),
            expiry_date: Some(today + Duration::days(*expiry_days)),
            reorder_level: *reorder,
            batch_number: Some(format!("B-{:04}", 1000 + idx)),
            updated_at: Utc::now(),
        };
        if let Err(e) = db.inventory().insert(&item).await {
            eprintln!("Failed to insert {}: {}", item.name, e);
        }
    }
    println!("✓ Created {} inventory items", db.inventory().count().await?);

    // Patients with one pending consultation each
    for (name, age, gender, phone, district, state, complaint) in PATIENTS {
        let patient = Patient {
            id: generate_id(),
            name: name.to_string(),
            age: *age,
            gender: *gender,
            phone: phone.to_string(),
            email: None,
            district: district.to_string(),
            state: state.to_string(),
            occupation: None,
            allergies: None,
            emergency_contact: None,
            registered_at: Utc::now(),
        };
        db.patients().insert(&patient).await?;

        let consultation = Consultation {
            id: generate_id(),
            patient_id: patient.id.clone(),
            doctor_email: "doctor@clinic.local".to_string(),
            date: today,
            chief_complaint: complaint.to_string(),
            diagnosis: String::new(),
            notes: None,
            fee: Money::from_rupees(500),
            status: ConsultationStatus::Pending,
            created_at: Utc::now(),
        };
        db.consultations().insert(&consultation).await?;
    }
    println!("✓ Created {} patients", db.patients().count().await?);

    println!();
    for (table, count) in db.table_counts().await? {
        if count > 0 {
            println!("  {table:<18} {count:>4}");
        }
    }
    println!();
    println!("✓ Seed complete! Sign in as admin@clinic.local");

    Ok(())
}

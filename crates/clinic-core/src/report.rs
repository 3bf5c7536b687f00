//! # Reports
//!
//! Pure aggregations over records fetched through a `DataService`. The
//! HTTP layer fetches, this module computes, so both backends produce
//! identical numbers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{
    Consultation, ConsultationStatus, InventoryItem, InvoiceItemType, StockAdjustment, Transaction,
    TransactionStatus,
};

/// Stock movement for one item over the adjustments supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockMovement {
    pub inventory_item_id: String,
    pub name: String,
    /// Sum of positive deltas.
    pub inflow: i64,
    /// Sum of negative deltas, as a positive number.
    pub outflow: i64,
    pub net: i64,
    pub current_stock: i64,
}

/// Per-item movement. Items without adjustments are included with zeros;
/// adjustments for unknown items are ignored.
pub fn stock_movements(items: &[InventoryItem], adjustments: &[StockAdjustment]) -> Vec<StockMovement> {
    let mut flows: HashMap<&str, (i64, i64)> = HashMap::new();
    for adj in adjustments {
        let entry = flows.entry(adj.inventory_item_id.as_str()).or_default();
        if adj.quantity_delta >= 0 {
            entry.0 += adj.quantity_delta;
        } else {
            entry.1 += -adj.quantity_delta;
        }
    }

    let mut rows: Vec<StockMovement> = items
        .iter()
        .map(|item| {
            let (inflow, outflow) = flows.get(item.id.as_str()).copied().unwrap_or_default();
            StockMovement {
                inventory_item_id: item.id.clone(),
                name: item.name.clone(),
                inflow,
                outflow,
                net: inflow - outflow,
                current_stock: item.stock,
            }
        })
        .collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    rows
}

/// Items at or below their reorder level, lowest stock first.
pub fn low_stock(items: &[InventoryItem]) -> Vec<&InventoryItem> {
    let mut low: Vec<&InventoryItem> = items.iter().filter(|i| i.is_low_stock()).collect();
    low.sort_by_key(|i| i.stock);
    low
}

/// Items whose expiry date is on or before `today + days`, including
/// those already expired. Soonest first.
pub fn expiring_within(items: &[InventoryItem], today: NaiveDate, days: u32) -> Vec<&InventoryItem> {
    let horizon = today + chrono::Duration::days(i64::from(days));
    let mut expiring: Vec<&InventoryItem> = items
        .iter()
        .filter(|i| i.expiry_date.is_some_and(|d| d <= horizon))
        .collect();
    expiring.sort_by_key(|i| i.expiry_date);
    expiring
}

/// Revenue per line type, counting only `Paid` transactions. Discounts
/// appear as a negative entry.
pub fn revenue_by_item_type(transactions: &[Transaction]) -> BTreeMap<InvoiceItemType, Money> {
    let mut totals = BTreeMap::new();
    for t in transactions.iter().filter(|t| t.status == TransactionStatus::Paid) {
        *totals.entry(t.item_type).or_insert_with(Money::zero) += t.total;
    }
    totals
}

/// Headline numbers for the landing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Dashboard {
    pub patient_count: usize,
    pub pending_consultations: usize,
    pub follow_ups: usize,
    pub revenue: Money,
    pub invoice_count: usize,
    pub low_stock_count: usize,
    pub expiring_soon_count: usize,
}

/// Days ahead the dashboard treats as "expiring soon".
pub const EXPIRY_WARNING_DAYS: u32 = 30;

pub fn dashboard(
    patient_count: usize,
    consultations: &[Consultation],
    transactions: &[Transaction],
    items: &[InventoryItem],
    today: NaiveDate,
) -> Dashboard {
    let paid: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| t.status == TransactionStatus::Paid)
        .collect();
    let mut invoices: Vec<&str> = paid.iter().map(|t| t.invoice_id.as_str()).collect();
    invoices.sort_unstable();
    invoices.dedup();

    Dashboard {
        patient_count,
        pending_consultations: consultations
            .iter()
            .filter(|c| c.status == ConsultationStatus::Pending)
            .count(),
        follow_ups: consultations
            .iter()
            .filter(|c| c.status == ConsultationStatus::FollowUp)
            .count(),
        revenue: paid.iter().map(|t| t.total).sum(),
        invoice_count: invoices.len(),
        low_stock_count: low_stock(items).len(),
        expiring_soon_count: expiring_within(items, today, EXPIRY_WARNING_DAYS).len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{generate_id, AdjustmentReason, InventoryCategory};
    use chrono::Utc;

    fn item(name: &str, stock: i64, reorder: i64, expiry: Option<NaiveDate>) -> InventoryItem {
        InventoryItem {
            id: generate_id(),
            name: name.to_string(),
            category: InventoryCategory::Medicine,
            stock,
            unit: "strip".to_string(),
            cost_price: Money::from_paise(1000),
            selling_price: Money::from_paise(1500),
            supplier_id: None,
            expiry_date: expiry,
            reorder_level: reorder,
            batch_number: None,
            updated_at: Utc::now(),
        }
    }

    fn txn(item_type: InvoiceItemType, invoice: &str, paise: i64, status: TransactionStatus) -> Transaction {
        Transaction {
            id: generate_id(),
            invoice_id: invoice.to_string(),
            date: Utc::now(),
            patient_id: "p".to_string(),
            consultation_id: None,
            item_type,
            category: String::new(),
            description: "line".to_string(),
            quantity: 1,
            amount: Money::from_paise(paise),
            total: Money::from_paise(paise),
            status,
        }
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_stock_movements() {
        let a = item("Amoxicillin", 40, 10, None);
        let b = item("Bandage", 5, 10, None);
        let adjustments = vec![
            StockAdjustment::new(&a.id, 50, AdjustmentReason::Purchase, "sm@clinic.in"),
            StockAdjustment::new(&a.id, -10, AdjustmentReason::Sale, "ph@clinic.in"),
            StockAdjustment::new("ghost", -3, AdjustmentReason::Damage, "sm@clinic.in"),
        ];

        let rows = stock_movements(&[b.clone(), a.clone()], &adjustments);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Amoxicillin");
        assert_eq!((rows[0].inflow, rows[0].outflow, rows[0].net), (50, 10, 40));
        assert_eq!((rows[1].inflow, rows[1].outflow, rows[1].net), (0, 0, 0));
        assert_eq!(rows[1].current_stock, 5);
    }

    #[test]
    fn test_low_stock_and_expiry() {
        let items = vec![
            item("A", 3, 10, Some(d("2026-10-10"))),
            item("B", 50, 10, Some(d("2026-11-15"))),
            item("C", 10, 10, None),
            item("D", 50, 10, Some(d("2027-06-01"))),
        ];
        let low: Vec<&str> = low_stock(&items).iter().map(|i| i.name.as_str()).collect();
        assert_eq!(low, vec!["A", "C"]);

        let expiring: Vec<&str> = expiring_within(&items, d("2026-10-19"), 30)
            .iter()
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(expiring, vec!["A", "B"]);
    }

    #[test]
    fn test_revenue_counts_paid_only() {
        let txns = vec![
            txn(InvoiceItemType::Consultation, "i1", 50000, TransactionStatus::Paid),
            txn(InvoiceItemType::Medicine, "i1", 15000, TransactionStatus::Paid),
            txn(InvoiceItemType::Discount, "i1", -5000, TransactionStatus::Paid),
            txn(InvoiceItemType::Medicine, "i2", 99999, TransactionStatus::Refunded),
        ];
        let revenue = revenue_by_item_type(&txns);
        assert_eq!(revenue[&InvoiceItemType::Medicine].paise(), 15000);
        assert_eq!(revenue[&InvoiceItemType::Discount].paise(), -5000);
        assert!(!revenue.contains_key(&InvoiceItemType::Procedure));

        let dash = dashboard(12, &[], &txns, &[], d("2026-10-19"));
        assert_eq!(dash.revenue.paise(), 60000);
        assert_eq!(dash.invoice_count, 1);
        assert_eq!(dash.patient_count, 12);
    }
}

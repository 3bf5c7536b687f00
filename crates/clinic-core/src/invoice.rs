//! # Invoice Module
//!
//! Invoice lines, payment splits and the rules that must hold before an
//! invoice is persisted.
//!
//! ## Invoice Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Billing Desk Flow                                │
//! │                                                                         │
//! │  InvoiceDraft (from HTTP)                                               │
//! │    items:    [{Consultation, qty 1, 500.00},                            │
//! │               {Medicine,     qty 2,  75.00},                            │
//! │               {Discount,     qty 1,  50.00}]  ◄── stored as -50.00      │
//! │    payments: [{Cash, 400.00}, {UPI, 200.00}]                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Invoice::from_draft                                                    │
//! │    ├── each line: total = quantity × amount (never trusted from input) │
//! │    ├── invoice total = Σ line totals = 600.00                           │
//! │    └── Σ payments == total ?  (exact paise)                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DataService::record_invoice                                            │
//! │    ├── Invoices row + InvoicePayments rows                              │
//! │    ├── one Transaction per line                                         │
//! │    ├── stock -qty per linked inventory item (Sale adjustment)          │
//! │    └── consultation → Completed                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{generate_id, InvoiceItemType, PaymentMethod, Transaction, TransactionStatus};
use crate::validation::{validate_amount, validate_quantity, validate_required};
use crate::{MAX_INVOICE_ITEMS, MAX_NAME_LEN};

/// Category label that marks a whole-invoice adjustment.
pub const OVERALL_CATEGORY: &str = "Overall";

// =============================================================================
// Invoice Item
// =============================================================================

/// One billable line.
///
/// Fields are private-by-convention behind setters so that `total` can
/// never drift from `quantity × amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceItem {
    pub item_type: InvoiceItemType,
    pub category: String,
    pub description: String,
    /// Set for medicine lines sold from stock.
    pub inventory_item_id: Option<String>,
    pub quantity: i64,
    pub amount: Money,
    pub total: Money,
}

impl InvoiceItem {
    /// Creates a line, applying the discount sign rule and computing the
    /// total.
    ///
    /// ## Errors
    /// An amount beyond [`crate::MAX_AMOUNT_PAISE`] or a total that does not fit.
    pub fn new(
        item_type: InvoiceItemType,
        category: impl Into<String>,
        description: impl Into<String>,
        quantity: i64,
        amount: Money,
    ) -> CoreResult<Self> {
        let mut item = InvoiceItem {
            item_type,
            category: category.into(),
            description: description.into(),
            inventory_item_id: None,
            quantity,
            amount: Money::zero(),
            total: Money::zero(),
        };
        item.set_amount(amount)?;
        Ok(item)
    }

    /// Links the line to an inventory item so stock is decremented on
    /// recording.
    pub fn with_inventory_item(mut self, inventory_item_id: impl Into<String>) -> Self {
        self.inventory_item_id = Some(inventory_item_id.into());
        self
    }

    /// Whether this line reduces the bill: a `Discount` type or the
    /// `Overall` category.
    pub fn is_deduction(&self) -> bool {
        self.item_type == InvoiceItemType::Discount
            || self.category.trim().eq_ignore_ascii_case(OVERALL_CATEGORY)
    }

    /// Sets the unit amount. Deductions are stored as `-|amount|`.
    pub fn set_amount(&mut self, amount: Money) -> CoreResult<()> {
        validate_amount("amount", amount)?;
        self.amount = if self.is_deduction() {
            -amount.abs()
        } else {
            amount
        };
        self.recompute()
    }

    pub fn set_quantity(&mut self, quantity: i64) -> CoreResult<()> {
        self.quantity = quantity;
        self.recompute()
    }

    /// Changing the type can flip the sign rule, so the amount is
    /// re-applied.
    pub fn set_item_type(&mut self, item_type: InvoiceItemType) -> CoreResult<()> {
        self.item_type = item_type;
        self.set_amount(self.amount.abs())
    }

    pub fn set_category(&mut self, category: impl Into<String>) -> CoreResult<()> {
        self.category = category.into();
        self.set_amount(self.amount.abs())
    }

    fn recompute(&mut self) -> CoreResult<()> {
        self.total = self.amount.multiply_quantity(self.quantity)?;
        Ok(())
    }

    /// Checks a line that may have come from outside (e.g. deserialized).
    pub fn validate(&self) -> CoreResult<()> {
        validate_required("description", &self.description, MAX_NAME_LEN)?;
        validate_quantity(self.quantity)?;
        validate_amount("amount", self.amount)?;
        if self.is_deduction() && self.amount.is_positive() {
            return Err(ValidationError::invalid("amount", "discount lines must not be positive").into());
        }
        if !self.is_deduction() && self.amount.is_negative() {
            return Err(ValidationError::invalid("amount", "only discount lines may be negative").into());
        }
        if self.amount.checked_mul(self.quantity) != Some(self.total) {
            return Err(ValidationError::invalid("total", "must equal quantity times amount").into());
        }
        Ok(())
    }
}

// =============================================================================
// Payments
// =============================================================================

/// Part of the invoice total paid by one method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentSplit {
    pub method: PaymentMethod,
    pub amount: Money,
}

// =============================================================================
// Draft (untrusted input)
// =============================================================================

/// A line as submitted by the billing desk. The total is not accepted
/// from input.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceItemDraft {
    pub item_type: InvoiceItemType,
    #[serde(default)]
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub inventory_item_id: Option<String>,
    pub quantity: i64,
    pub amount: Money,
}

/// An invoice as submitted by the billing desk.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceDraft {
    pub patient_id: String,
    #[serde(default)]
    pub consultation_id: Option<String>,
    pub items: Vec<InvoiceItemDraft>,
    pub payments: Vec<PaymentSplit>,
}

// =============================================================================
// Invoice
// =============================================================================

/// A validated invoice ready to record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    pub patient_id: String,
    pub consultation_id: Option<String>,
    pub items: Vec<InvoiceItem>,
    pub payments: Vec<PaymentSplit>,
    pub total: Money,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    /// Builds and validates an invoice from a draft.
    ///
    /// ## Errors
    /// - [`CoreError::EmptyInvoice`] with no lines
    /// - [`CoreError::Validation`] for bad quantities, amounts or descriptions
    /// - [`CoreError::Overflow`] when a line or the invoice total does not fit
    /// - [`CoreError::NegativePayment`] for a negative split
    /// - [`CoreError::NegativeInvoiceTotal`] when deductions exceed charges
    /// - [`CoreError::PaymentMismatch`] when splits do not equal the total
    pub fn from_draft(draft: InvoiceDraft, created_by: impl Into<String>) -> CoreResult<Invoice> {
        let items = draft
            .items
            .into_iter()
            .map(|d| -> CoreResult<InvoiceItem> {
                let item = InvoiceItem::new(d.item_type, d.category, d.description, d.quantity, d.amount)?;
                Ok(match d.inventory_item_id.filter(|id| !id.trim().is_empty()) {
                    Some(id) => item.with_inventory_item(id),
                    None => item,
                })
            })
            .collect::<CoreResult<Vec<_>>>()?;

        let invoice = Invoice {
            id: generate_id(),
            total: Self::total_of(&items)?,
            patient_id: draft.patient_id,
            consultation_id: draft.consultation_id.filter(|id| !id.trim().is_empty()),
            items,
            payments: draft.payments,
            created_by: created_by.into(),
            created_at: Utc::now(),
        };
        invoice.validate()?;
        Ok(invoice)
    }

    /// Sum of line totals.
    pub fn total_of(items: &[InvoiceItem]) -> CoreResult<Money> {
        Money::checked_sum(items.iter().map(|i| i.total), "invoice total")
    }

    /// Sum of payment splits.
    pub fn paid(&self) -> CoreResult<Money> {
        Money::checked_sum(self.payments.iter().map(|p| p.amount), "payments")
    }

    /// Checks every rule that must hold before recording.
    pub fn validate(&self) -> CoreResult<()> {
        validate_required("patient_id", &self.patient_id, MAX_NAME_LEN)?;

        if self.items.is_empty() {
            return Err(CoreError::EmptyInvoice);
        }
        if self.items.len() > MAX_INVOICE_ITEMS {
            return Err(ValidationError::OutOfRange {
                field: "items".to_string(),
                min: 1,
                max: MAX_INVOICE_ITEMS as i64,
            }
            .into());
        }
        for item in &self.items {
            item.validate()?;
        }

        let total = Self::total_of(&self.items)?;
        if total != self.total {
            return Err(ValidationError::invalid("total", "must equal the sum of line totals").into());
        }
        if total.is_negative() {
            return Err(CoreError::NegativeInvoiceTotal { total });
        }

        if let Some(p) = self.payments.iter().find(|p| p.amount.is_negative()) {
            return Err(CoreError::NegativePayment {
                method: p.method.to_string(),
            });
        }

        let received = self.paid()?;
        if received != total {
            return Err(CoreError::PaymentMismatch {
                expected: total,
                received,
            });
        }

        Ok(())
    }

    /// One `Paid` transaction per line, all sharing the invoice ID and
    /// timestamp.
    pub fn to_transactions(&self) -> Vec<Transaction> {
        self.items
            .iter()
            .map(|item| Transaction {
                id: generate_id(),
                invoice_id: self.id.clone(),
                date: self.created_at,
                patient_id: self.patient_id.clone(),
                consultation_id: self.consultation_id.clone(),
                item_type: item.item_type,
                category: item.category.clone(),
                description: item.description.clone(),
                quantity: item.quantity,
                amount: item.amount,
                total: item.total,
                status: TransactionStatus::Paid,
            })
            .collect()
    }

    /// Stock to remove per inventory item, merged across lines.
    ///
    /// ## Returns
    /// `(inventory_item_id, quantity)` pairs with positive quantities,
    /// sorted by item ID so every backend applies them in the same order.
    pub fn stock_withdrawals(&self) -> Vec<(String, i64)> {
        let mut merged: BTreeMap<&str, i64> = BTreeMap::new();
        for item in &self.items {
            if let Some(id) = item.inventory_item_id.as_deref() {
                *merged.entry(id).or_default() += item.quantity;
            }
        }
        merged
            .into_iter()
            .map(|(id, qty)| (id.to_string(), qty))
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

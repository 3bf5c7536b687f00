//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Invoice lines: ₹0.10 + ₹0.20                                          │
//! │  As floats:     0.1 + 0.2 = 0.30000000000000004                        │
//! │  Payment:       ₹0.30                                                   │
//! │  Exact float equality check → "payments do not match" ❌               │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Paise                                            │
//! │    10 + 20 = 30 paise, payment 30 paise → equal ✅                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use clinic_core::money::Money;
//!
//! let fee = Money::from_paise(50000);            // ₹500.00
//! let parsed = Money::parse_decimal("500").unwrap();
//! assert_eq!(fee, parsed);
//!
//! let line = fee.multiply_quantity(2).unwrap();  // ₹1000.00
//! assert_eq!(line.to_string(), "₹1000.00");
//! ```
//!
//! ## Overflow
//! Amounts arrive from the billing desk and from spreadsheet cells, so line
//! totals and invoice sums go through [`Money::multiply_quantity`] and
//! [`Money::checked_sum`], which report overflow instead of wrapping. The
//! operator impls saturate and are meant for figures that were already
//! bounded (reports over recorded transactions).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};

/// Paise per rupee.
const MINOR_PER_MAJOR: i64 = 100;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in paise (1/100 of a rupee).
///
/// ## Design Decisions
/// - **i64 (signed)**: discounts and refunds are negative lines
/// - **Transparent**: serializes as a bare integer, stored as INTEGER in SQLite
/// - **No float constructor**: decimal text goes through [`Money::parse_decimal`]
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Consultation.fee ──┐                                                   │
/// │  InventoryItem.     ├──► InvoiceItem.amount × quantity ──► line total   │
/// │    selling_price ───┘                                      │            │
/// │                                                            ▼            │
/// │                         Σ line totals ══ Σ PaymentSplit.amount          │
/// │                         (exact integer equality)                        │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[serde(transparent)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise.
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from whole rupees.
    #[inline]
    pub const fn from_rupees(rupees: i64) -> Self {
        Money(rupees * MINOR_PER_MAJOR)
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion (truncated toward zero).
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / MINOR_PER_MAJOR
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % MINOR_PER_MAJOR).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value, saturating at `i64::MAX` paise.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.saturating_abs())
    }

    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(paise) => Some(Money(paise)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_mul(self, qty: i64) -> Option<Money> {
        match self.0.checked_mul(qty) {
            Some(paise) => Some(Money(paise)),
            None => None,
        }
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use clinic_core::money::Money;
    ///
    /// let strip = Money::from_paise(4550); // ₹45.50
    /// assert_eq!(strip.multiply_quantity(3).unwrap().paise(), 13650);
    /// assert!(Money::from_paise(i64::MAX / 2).multiply_quantity(3).is_err());
    /// ```
    pub fn multiply_quantity(&self, qty: i64) -> CoreResult<Money> {
        self.checked_mul(qty).ok_or_else(|| CoreError::Overflow {
            what: format!("{} x {}", self, qty),
        })
    }

    /// Adds up amounts, failing instead of wrapping. `what` names the sum in
    /// the error ("invoice total", "payments").
    pub fn checked_sum<I>(amounts: I, what: &str) -> CoreResult<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::zero(), Money::checked_add)
            .ok_or_else(|| CoreError::Overflow {
                what: what.to_string(),
            })
    }

    /// Parses decimal text such as `"650"`, `"650.5"`, `"-12.50"`,
    /// `"₹1,250.00"` into paise without touching floating point.
    ///
    /// ## Rules
    /// - Optional leading `-` or `+`, optional `₹`, thousands commas ignored
    /// - At most two fractional digits
    /// - At least one digit
    ///
    /// ## Example
    /// ```rust
    /// use clinic_core::money::Money;
    ///
    /// assert_eq!(Money::parse_decimal("0.1").unwrap().paise(), 10);
    /// assert_eq!(Money::parse_decimal("₹1,250.75").unwrap().paise(), 125075);
    /// assert!(Money::parse_decimal("12.345").is_err());
    /// ```
    pub fn parse_decimal(text: &str) -> Result<Money, ValidationError> {
        let invalid = |reason: &str| ValidationError::invalid("amount", reason);

        let mut s = text.trim();
        let negative = if let Some(rest) = s.strip_prefix('-') {
            s = rest;
            true
        } else {
            if let Some(rest) = s.strip_prefix('+') {
                s = rest;
            }
            false
        };
        let s = s.trim_start_matches('₹').trim();
        let cleaned: String = s.chars().filter(|c| *c != ',').collect();

        let (whole, fraction) = match cleaned.split_once('.') {
            Some((w, f)) => (w, f),
            None => (cleaned.as_str(), ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid("expected a number"));
        }
        if fraction.len() > 2 {
            return Err(invalid("at most two decimal places"));
        }
        if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid("expected digits"));
        }

        let whole_value: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("amount too large"))?
        };
        let fraction_value: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid("expected digits"))? * 10,
            _ => fraction.parse().map_err(|_| invalid("expected digits"))?,
        };

        let paise = whole_value
            .checked_mul(MINOR_PER_MAJOR)
            .and_then(|p| p.checked_add(fraction_value))
            .ok_or_else(|| invalid("amount too large"))?;

        Ok(Money(if negative { -paise } else { paise }))
    }

    /// Formats as plain decimal text (`"-12.50"`), the form written into
    /// spreadsheet cells.
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}.{:02}", sign, self.rupees().abs(), self.paise_part())
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows rupees with the currency sign. For debugging and error
/// messages; the web client formats for locale.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.rupees().abs(), self.paise_part())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(self.0.saturating_neg())
    }
}

/// Multiplication by quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_paise() {
        let money = Money::from_paise(125075);
        assert_eq!(money.paise(), 125075);
        assert_eq!(money.rupees(), 1250);
        assert_eq!(money.paise_part(), 75);
        assert_eq!(Money::from_rupees(500).paise(), 50000);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_paise(1099).to_string(), "₹10.99");
        assert_eq!(Money::from_paise(500).to_string(), "₹5.00");
        assert_eq!(Money::from_paise(-550).to_string(), "-₹5.50");
        assert_eq!(Money::zero().to_string(), "₹0.00");
    }

    #[test]
    fn test_decimal_string() {
        assert_eq!(Money::from_paise(-1250).to_decimal_string(), "-12.50");
        assert_eq!(Money::from_paise(7).to_decimal_string(), "0.07");
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(Money::parse_decimal("650").unwrap().paise(), 65000);
        assert_eq!(Money::parse_decimal("650.5").unwrap().paise(), 65050);
        assert_eq!(Money::parse_decimal(" -12.50 ").unwrap().paise(), -1250);
        assert_eq!(Money::parse_decimal("+3").unwrap().paise(), 300);
        assert_eq!(Money::parse_decimal(".75").unwrap().paise(), 75);
        assert_eq!(Money::parse_decimal("₹1,250.00").unwrap().paise(), 125000);
        assert_eq!(Money::parse_decimal("-₹5").unwrap().paise(), -500);
    }

    #[test]
    fn test_parse_decimal_rejects_garbage() {
        assert!(Money::parse_decimal("").is_err());
        assert!(Money::parse_decimal(".").is_err());
        assert!(Money::parse_decimal("12.345").is_err());
        assert!(Money::parse_decimal("12a").is_err());
        assert!(Money::parse_decimal("1.2.3").is_err());
        assert!(Money::parse_decimal("99999999999999999999").is_err());
    }

    /// The case that broke exact float comparison: 0.1 + 0.2 == 0.3.
    #[test]
    fn test_decimal_sum_is_exact() {
        let a = Money::parse_decimal("0.1").unwrap();
        let b = Money::parse_decimal("0.2").unwrap();
        let c = Money::parse_decimal("0.3").unwrap();
        assert_eq!(a + b, c);
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_paise(1000);
        let b = Money::from_paise(250);

        assert_eq!((a + b).paise(), 1250);
        assert_eq!((a - b).paise(), 750);
        assert_eq!((-a).paise(), -1000);
        assert_eq!((a * 3).paise(), 3000);

        let total: Money = [a, b, -b].iter().sum();
        assert_eq!(total, a);
    }

    #[test]
    fn test_multiply_quantity_reports_overflow() {
        let unit = Money::from_paise((1 << 62) + 50);
        assert!(matches!(unit.multiply_quantity(4), Err(CoreError::Overflow { .. })));
        assert_eq!(Money::from_paise(4550).multiply_quantity(3).unwrap().paise(), 13650);
    }

    #[test]
    fn test_checked_sum() {
        let amounts = [Money::from_paise(100), Money::from_paise(-30), Money::from_paise(5)];
        assert_eq!(Money::checked_sum(amounts, "payments").unwrap().paise(), 75);

        let huge = [Money::from_paise(i64::MAX), Money::from_paise(1)];
        let err = Money::checked_sum(huge, "payments").unwrap_err();
        assert_eq!(err.to_string(), "payments is out of range");
    }

    #[test]
    fn test_operators_saturate() {
        let min = Money::from_paise(i64::MIN);
        assert_eq!(min.abs().paise(), i64::MAX);
        assert_eq!((-min).paise(), i64::MAX);
        assert_eq!((Money::from_paise(i64::MAX) + Money::from_paise(1)).paise(), i64::MAX);
        assert_eq!((Money::from_paise(i64::MAX) * 2).paise(), i64::MAX);
    }

    #[test]
    fn test_serde_is_bare_integer() {
        let json = serde_json::to_string(&Money::from_paise(4550)).unwrap();
        assert_eq!(json, "4550");
        let back: Money = serde_json::from_str("4550").unwrap();
        assert_eq!(back.paise(), 4550);
    }
}

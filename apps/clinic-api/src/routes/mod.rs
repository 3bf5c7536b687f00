//! HTTP routes.
//!
//! ```text
//! /api/health                         public
//! /api/auth/sign-in                   public
//! /api/auth/session                   any session
//! /api/users                          Admin      (backends with accounts)
//! /api/patients[/{id}]                Patients
//! /api/consultations[/{id}/status]    Consultations
//! /api/prescriptions                  Prescriptions
//! /api/inventory[...]                 Inventory
//! /api/suppliers, /api/orders         Procurement
//! /api/staff                          Staff
//! /api/cash/...                       Cash
//! /api/reports/...                    Reports
//! /api/admin/sheets/...               Admin      (Sheets backend)
//! ```

use axum::routing::{get, post, put};
use axum::Router;
use chrono::{NaiveDate, Utc};
use clinic_core::DateRange;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod cash;
pub mod consultations;
pub mod health;
pub mod inventory;
pub mod patients;
pub mod prescriptions;
pub mod procurement;
pub mod reports;
pub mod staff;

/// Days covered by a ledger or report query without `from`.
pub const DEFAULT_RANGE_DAYS: u32 = 30;

/// `?from=YYYY-MM-DD&to=YYYY-MM-DD`, both optional.
#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl RangeQuery {
    /// `to` defaults to today and `from` to 30 days ending on `to`.
    pub fn resolve(&self, today: NaiveDate) -> ApiResult<DateRange> {
        let to = self.to.unwrap_or(today);
        match self.from {
            Some(from) => Ok(DateRange::new(from, to)?),
            None => Ok(DateRange::last_days(to, DEFAULT_RANGE_DAYS)),
        }
    }

    /// Resolves against the current UTC date, matching how timestamps are
    /// filtered (see [`DateRange`]).
    pub fn resolve_now(&self) -> ApiResult<DateRange> {
        self.resolve(Utc::now().date_naive())
    }
}

/// All `/api` routes bound to `state`.
pub fn api_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health::check))
        .route("/auth/sign-in", post(auth::sign_in))
        .route("/auth/session", get(auth::session))
        .route("/users", post(auth::create_user))
        .route("/patients", get(patients::list).post(patients::create))
        .route("/patients/{id}", get(patients::detail).put(patients::update))
        .route("/consultations", get(consultations::list).post(consultations::create))
        .route("/consultations/{id}/status", put(consultations::set_status))
        .route("/prescriptions", get(prescriptions::list).post(prescriptions::create))
        .route("/inventory", get(inventory::list).post(inventory::create))
        .route("/inventory/adjustments", get(inventory::adjustments))
        .route("/inventory/{id}", put(inventory::update))
        .route("/inventory/{id}/adjust", post(inventory::adjust))
        .route("/suppliers", get(procurement::suppliers).post(procurement::create_supplier))
        .route("/suppliers/{id}", put(procurement::update_supplier))
        .route("/orders", get(procurement::orders).post(procurement::create_order))
        .route("/orders/{id}/status", put(procurement::set_order_status))
        .route("/staff", get(staff::list).post(staff::create))
        .route("/cash/invoices", post(cash::record_invoice))
        .route("/cash/transactions", get(cash::transactions))
        .route("/reports/stock-movement", get(reports::stock_movement))
        .route("/reports/dashboard", get(reports::dashboard))
        .route("/admin/sheets/batch", post(admin::batch_update))
        .route("/admin/sheets/{sheet}/rows", post(admin::append_row))
        .route("/admin/sheets/{sheet}/rows/{row}", put(admin::update_row))
        .with_state(state);

    Router::new().nest("/api", api)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_range_defaults_to_thirty_days() {
        let range = RangeQuery::default().resolve(date(2026, 3, 31)).unwrap();
        assert_eq!(range.from, date(2026, 3, 2));
        assert_eq!(range.to, date(2026, 3, 31));
    }

    #[test]
    fn test_range_explicit_and_reversed() {
        let query = RangeQuery {
            from: Some(date(2026, 1, 1)),
            to: Some(date(2026, 1, 31)),
        };
        assert_eq!(query.resolve(date(2026, 6, 1)).unwrap().from, date(2026, 1, 1));

        let reversed = RangeQuery {
            from: Some(date(2026, 2, 1)),
            to: Some(date(2026, 1, 1)),
        };
        assert!(reversed.resolve(date(2026, 6, 1)).is_err());
    }
}

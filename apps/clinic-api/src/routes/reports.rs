//! Report endpoints. The arithmetic lives in `clinic_core::report`; these
//! handlers only gather the inputs.

use std::collections::BTreeMap;

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use clinic_core::report::{self, Dashboard, StockMovement, EXPIRY_WARNING_DAYS};
use clinic_core::{Area, DateRange, InventoryItem, InvoiceItemType, Money};
use serde::Serialize;

use crate::auth::Session;
use crate::error::ApiResult;
use crate::routes::RangeQuery;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StockMovementReport {
    pub range: DateRange,
    pub movements: Vec<StockMovement>,
    pub low_stock: Vec<InventoryItem>,
    pub expiring_soon: Vec<InventoryItem>,
}

#[derive(Debug, Serialize)]
pub struct DashboardReport {
    pub range: DateRange,
    #[serde(flatten)]
    pub summary: Dashboard,
    pub revenue_by_type: BTreeMap<InvoiceItemType, Money>,
}

/// `GET /api/reports/stock-movement?from=&to=`
pub async fn stock_movement(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<StockMovementReport>> {
    session.require(Area::Reports)?;
    let range = query.resolve_now()?;

    let items = state.service.get_inventory().await?;
    let adjustments = state.service.get_stock_adjustments(range).await?;
    let today = Utc::now().date_naive();

    Ok(Json(StockMovementReport {
        range,
        movements: report::stock_movements(&items, &adjustments),
        low_stock: report::low_stock(&items).into_iter().cloned().collect(),
        expiring_soon: report::expiring_within(&items, today, EXPIRY_WARNING_DAYS)
            .into_iter()
            .cloned()
            .collect(),
    }))
}

/// `GET /api/reports/dashboard?from=&to=`
pub async fn dashboard(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<DashboardReport>> {
    session.require(Area::Reports)?;
    let range = query.resolve_now()?;

    let patients = state.service.get_patients().await?;
    let consultations = state.service.get_consultations().await?;
    let transactions = state.service.get_transactions(range).await?;
    let items = state.service.get_inventory().await?;

    let summary = report::dashboard(
        patients.len(),
        &consultations,
        &transactions,
        &items,
        Utc::now().date_naive(),
    );

    Ok(Json(DashboardReport {
        range,
        summary,
        revenue_by_type: report::revenue_by_item_type(&transactions),
    }))
}

//! Billing endpoints.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use clinic_core::{Area, Invoice, InvoiceDraft, Transaction};
use tracing::info;

use crate::auth::Session;
use crate::error::ApiResult;
use crate::routes::RangeQuery;
use crate::state::AppState;

/// `POST /api/cash/invoices`
///
/// Totals are computed server-side from the draft lines; the payment
/// splits must add up to them exactly.
pub async fn record_invoice(
    State(state): State<AppState>,
    session: Session,
    Json(draft): Json<InvoiceDraft>,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    session.require(Area::Cash)?;

    let invoice = Invoice::from_draft(draft, &session.email)?;
    let recorded = state.service.record_invoice(invoice).await?;
    info!(
        id = %recorded.id,
        total = %recorded.total,
        by = %session.email,
        "Invoice accepted"
    );
    Ok((StatusCode::CREATED, Json(recorded)))
}

/// `GET /api/cash/transactions?from=&to=`
pub async fn transactions(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<Vec<Transaction>>> {
    session.require(Area::Cash)?;
    let range = query.resolve_now()?;
    Ok(Json(state.service.get_transactions(range).await?))
}

//! Inventory endpoints.
//!
//! Stock never changes through `PUT /api/inventory/{id}`; it moves only
//! through `/adjust`, invoices and received orders, each leaving a
//! `StockAdjustment` behind.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use clinic_core::{
    generate_id, AdjustmentReason, Area, InventoryCategory, InventoryItem, Money, StockAdjustment,
};
use serde::Deserialize;

use crate::auth::Session;
use crate::error::ApiResult;
use crate::routes::RangeQuery;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NewInventoryItem {
    pub name: String,
    pub category: InventoryCategory,
    /// Opening stock.
    #[serde(default)]
    pub stock: i64,
    pub unit: String,
    pub cost_price: Money,
    pub selling_price: Money,
    pub supplier_id: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub reorder_level: i64,
    pub batch_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    pub quantity_delta: i64,
    pub reason: AdjustmentReason,
    pub note: Option<String>,
}

/// `GET /api/inventory`
pub async fn list(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<Json<Vec<InventoryItem>>> {
    session.require(Area::Inventory)?;
    Ok(Json(state.service.get_inventory().await?))
}

/// `POST /api/inventory`
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    Json(input): Json<NewInventoryItem>,
) -> ApiResult<(StatusCode, Json<InventoryItem>)> {
    session.require(Area::Inventory)?;

    let item = InventoryItem {
        id: generate_id(),
        name: input.name,
        category: input.category,
        stock: input.stock,
        unit: input.unit,
        cost_price: input.cost_price,
        selling_price: input.selling_price,
        supplier_id: input.supplier_id,
        expiry_date: input.expiry_date,
        reorder_level: input.reorder_level,
        batch_number: input.batch_number,
        updated_at: Utc::now(),
    };

    let created = state.service.create_inventory_item(item).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /api/inventory/{id}`
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Json(mut item): Json<InventoryItem>,
) -> ApiResult<Json<InventoryItem>> {
    session.require(Area::Inventory)?;
    item.id = id;
    Ok(Json(state.service.update_inventory_item(item).await?))
}

/// `POST /api/inventory/{id}/adjust`
pub async fn adjust(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Json(input): Json<AdjustRequest>,
) -> ApiResult<Json<InventoryItem>> {
    session.require(Area::Inventory)?;

    let mut adjustment = StockAdjustment::new(id, input.quantity_delta, input.reason, &session.email);
    adjustment.note = input.note;
    Ok(Json(state.service.adjust_stock(adjustment).await?))
}

/// `GET /api/inventory/adjustments?from=&to=`
pub async fn adjustments(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<Vec<StockAdjustment>>> {
    session.require(Area::Inventory)?;
    let range = query.resolve_now()?;
    Ok(Json(state.service.get_stock_adjustments(range).await?))
}

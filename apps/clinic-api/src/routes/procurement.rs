//! Supplier and purchase-order endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use clinic_core::{generate_id, Area, Money, Order, OrderStatus, Supplier, SupplierStatus};
use serde::Deserialize;

use crate::auth::Session;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NewSupplier {
    pub name: String,
    pub contact_person: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub gst_number: Option<String>,
    /// Defaults to `Active`.
    pub status: Option<SupplierStatus>,
}

/// New order. The total is computed from quantity and unit cost.
#[derive(Debug, Deserialize)]
pub struct NewOrder {
    pub supplier_id: String,
    pub inventory_item_id: String,
    pub quantity: i64,
    pub unit_cost: Money,
    /// Defaults to today.
    pub ordered_on: Option<NaiveDate>,
    pub expected_on: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}

/// `GET /api/suppliers`
pub async fn suppliers(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<Json<Vec<Supplier>>> {
    session.require(Area::Procurement)?;
    Ok(Json(state.service.get_suppliers().await?))
}

/// `POST /api/suppliers`
pub async fn create_supplier(
    State(state): State<AppState>,
    session: Session,
    Json(input): Json<NewSupplier>,
) -> ApiResult<(StatusCode, Json<Supplier>)> {
    session.require(Area::Procurement)?;

    let supplier = Supplier {
        id: generate_id(),
        name: input.name,
        contact_person: input.contact_person,
        phone: input.phone,
        email: input.email,
        address: input.address,
        gst_number: input.gst_number,
        status: input.status.unwrap_or(SupplierStatus::Active),
    };

    let created = state.service.create_supplier(supplier).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /api/suppliers/{id}`
pub async fn update_supplier(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Json(mut supplier): Json<Supplier>,
) -> ApiResult<Json<Supplier>> {
    session.require(Area::Procurement)?;
    supplier.id = id;
    Ok(Json(state.service.update_supplier(supplier).await?))
}

/// `GET /api/orders`
pub async fn orders(State(state): State<AppState>, session: Session) -> ApiResult<Json<Vec<Order>>> {
    session.require(Area::Procurement)?;
    Ok(Json(state.service.get_orders().await?))
}

/// `POST /api/orders`
pub async fn create_order(
    State(state): State<AppState>,
    session: Session,
    Json(input): Json<NewOrder>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    session.require(Area::Procurement)?;

    let order = Order {
        id: generate_id(),
        supplier_id: input.supplier_id,
        inventory_item_id: input.inventory_item_id,
        quantity: input.quantity,
        unit_cost: input.unit_cost,
        total_cost: input.unit_cost.multiply_quantity(input.quantity)?,
        ordered_on: input.ordered_on.unwrap_or_else(|| Utc::now().date_naive()),
        expected_on: input.expected_on,
        status: OrderStatus::Pending,
    };

    let created = state.service.create_order(order).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /api/orders/{id}/status`
///
/// Moving to `Received` restocks the item, attributed to the caller.
pub async fn set_order_status(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Json(update): Json<OrderStatusUpdate>,
) -> ApiResult<Json<Order>> {
    session.require(Area::Procurement)?;
    Ok(Json(
        state
            .service
            .update_order_status(&id, update.status, &session.email)
            .await?,
    ))
}

//! Raw spreadsheet row access for administrators.
//!
//! Only backends exposing `sheet_rows()` serve these; the rest answer
//! 501 `UNSUPPORTED`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use clinic_core::{Area, RowUpdate, ServiceError, SheetRows};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::Session;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RowValues {
    pub values: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub updates: Vec<RowUpdate>,
}

#[derive(Debug, Serialize)]
pub struct AppendResponse {
    /// A1 range written, e.g. `Patients!A7:L7`.
    pub range: String,
}

fn rows<'a>(state: &'a AppState, operation: &'static str) -> Result<&'a dyn SheetRows, ServiceError> {
    state.service.sheet_rows().ok_or(ServiceError::Unsupported {
        operation,
        backend: state.service.backend(),
    })
}

/// `POST /api/admin/sheets/{sheet}/rows`
pub async fn append_row(
    State(state): State<AppState>,
    session: Session,
    Path(sheet): Path<String>,
    Json(body): Json<RowValues>,
) -> ApiResult<(StatusCode, Json<AppendResponse>)> {
    session.require(Area::Admin)?;
    let range = rows(&state, "append_row")?
        .append_row(&sheet, body.values)
        .await?;
    info!(by = %session.email, range = %range, "Admin row append");
    Ok((StatusCode::CREATED, Json(AppendResponse { range })))
}

/// `PUT /api/admin/sheets/{sheet}/rows/{row}`
pub async fn update_row(
    State(state): State<AppState>,
    session: Session,
    Path((sheet, row)): Path<(String, u32)>,
    Json(body): Json<RowValues>,
) -> ApiResult<StatusCode> {
    session.require(Area::Admin)?;
    rows(&state, "update_row")?
        .update_row(&sheet, row, body.values)
        .await?;
    info!(by = %session.email, sheet = %sheet, row, "Admin row update");
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/admin/sheets/batch`
pub async fn batch_update(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<BatchRequest>,
) -> ApiResult<StatusCode> {
    session.require(Area::Admin)?;
    let count = body.updates.len();
    rows(&state, "batch_update")?.batch_update(body.updates).await?;
    info!(by = %session.email, rows = count, "Admin batch update");
    Ok(StatusCode::NO_CONTENT)
}

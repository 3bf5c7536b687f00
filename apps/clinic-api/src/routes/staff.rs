//! Staff directory endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use clinic_core::{generate_id, Area, Role, Staff, StaffStatus};
use serde::Deserialize;

use crate::auth::Session;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NewStaff {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub status: Option<StaffStatus>,
    pub joined_on: Option<NaiveDate>,
}

/// `GET /api/staff`
pub async fn list(State(state): State<AppState>, session: Session) -> ApiResult<Json<Vec<Staff>>> {
    session.require(Area::Staff)?;
    Ok(Json(state.service.get_staff().await?))
}

/// `POST /api/staff`
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    Json(input): Json<NewStaff>,
) -> ApiResult<(StatusCode, Json<Staff>)> {
    session.require(Area::Staff)?;

    let staff = Staff {
        id: generate_id(),
        name: input.name,
        email: input.email.trim().to_lowercase(),
        phone: input.phone,
        role: input.role,
        status: input.status.unwrap_or(StaffStatus::Active),
        joined_on: input.joined_on.unwrap_or_else(|| Utc::now().date_naive()),
    };

    let created = state.service.create_staff(staff).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

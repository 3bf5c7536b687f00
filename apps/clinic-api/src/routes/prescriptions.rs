//! Prescription endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use clinic_core::{generate_id, Area, MedicineDosage, Money, Prescription};
use serde::Deserialize;

use crate::auth::Session;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NewPrescription {
    pub consultation_id: String,
    pub medicines: Vec<MedicineDosage>,
    pub total_cost: Money,
}

/// `GET /api/prescriptions`
pub async fn list(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<Json<Vec<Prescription>>> {
    session.require(Area::Prescriptions)?;
    Ok(Json(state.service.get_prescriptions().await?))
}

/// `POST /api/prescriptions`
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    Json(input): Json<NewPrescription>,
) -> ApiResult<(StatusCode, Json<Prescription>)> {
    session.require(Area::Prescriptions)?;

    let prescription = Prescription {
        id: generate_id(),
        consultation_id: input.consultation_id,
        medicines: input.medicines,
        total_cost: input.total_cost,
        created_at: Utc::now(),
    };

    let created = state.service.create_prescription(prescription).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

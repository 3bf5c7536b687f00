//! Consultation endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use clinic_core::{generate_id, Area, Consultation, ConsultationStatus, Money};
use serde::Deserialize;

use crate::auth::Session;
use crate::error::ApiResult;
use crate::state::AppState;

/// New consultation. The signed-in user is recorded as the doctor.
#[derive(Debug, Deserialize)]
pub struct NewConsultation {
    pub patient_id: String,
    /// Defaults to today.
    pub date: Option<NaiveDate>,
    pub chief_complaint: String,
    pub diagnosis: String,
    pub notes: Option<String>,
    pub fee: Money,
    /// Defaults to `Pending`.
    pub status: Option<ConsultationStatus>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: ConsultationStatus,
}

/// `GET /api/consultations`
pub async fn list(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<Json<Vec<Consultation>>> {
    session.require(Area::Consultations)?;
    Ok(Json(state.service.get_consultations().await?))
}

/// `POST /api/consultations`
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    Json(input): Json<NewConsultation>,
) -> ApiResult<(StatusCode, Json<Consultation>)> {
    session.require(Area::Consultations)?;

    let now = Utc::now();
    let consultation = Consultation {
        id: generate_id(),
        patient_id: input.patient_id,
        doctor_email: session.email.clone(),
        date: input.date.unwrap_or_else(|| now.date_naive()),
        chief_complaint: input.chief_complaint,
        diagnosis: input.diagnosis,
        notes: input.notes,
        fee: input.fee,
        status: input.status.unwrap_or(ConsultationStatus::Pending),
        created_at: now,
    };

    let created = state.service.create_consultation(consultation).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /api/consultations/{id}/status`
pub async fn set_status(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Json(update): Json<StatusUpdate>,
) -> ApiResult<Json<Consultation>> {
    session.require(Area::Consultations)?;
    Ok(Json(
        state
            .service
            .update_consultation_status(&id, update.status)
            .await?,
    ))
}

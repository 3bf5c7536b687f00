//! Patient endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use clinic_core::{generate_id, Area, Gender, Patient};
use serde::Deserialize;

use crate::auth::Session;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NewPatient {
    pub name: String,
    pub age: i64,
    pub gender: Gender,
    pub phone: String,
    pub email: Option<String>,
    pub district: String,
    pub state: String,
    pub occupation: Option<String>,
    pub allergies: Option<String>,
    pub emergency_contact: Option<String>,
}

impl NewPatient {
    fn into_patient(self) -> Patient {
        Patient {
            id: generate_id(),
            name: self.name,
            age: self.age,
            gender: self.gender,
            phone: self.phone,
            email: self.email,
            district: self.district,
            state: self.state,
            occupation: self.occupation,
            allergies: self.allergies,
            emergency_contact: self.emergency_contact,
            registered_at: Utc::now(),
        }
    }
}

/// `GET /api/patients`
pub async fn list(State(state): State<AppState>, session: Session) -> ApiResult<Json<Vec<Patient>>> {
    session.require(Area::Patients)?;
    Ok(Json(state.service.get_patients().await?))
}

/// `GET /api/patients/{id}`
pub async fn detail(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> ApiResult<Json<Patient>> {
    session.require(Area::Patients)?;
    Ok(Json(state.service.get_patient(&id).await?))
}

/// `POST /api/patients`
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    Json(input): Json<NewPatient>,
) -> ApiResult<(StatusCode, Json<Patient>)> {
    session.require(Area::Patients)?;
    let patient = state.service.create_patient(input.into_patient()).await?;
    Ok((StatusCode::CREATED, Json(patient)))
}

/// `PUT /api/patients/{id}`
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Json(mut patient): Json<Patient>,
) -> ApiResult<Json<Patient>> {
    session.require(Area::Patients)?;
    patient.id = id;
    Ok(Json(state.service.update_patient(patient).await?))
}

//! `GET /api/health`

use axum::extract::State;
use axum::Json;
use clinic_core::BackendKind;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub backend: BackendKind,
    pub version: &'static str,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        backend: state.service.backend(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

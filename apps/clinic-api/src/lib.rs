//! # Clinic Desk API
//!
//! JSON HTTP server for the clinic back office.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Clinic API Server                              │
//! │                                                                         │
//! │  Browser ──► TraceLayer ──► /api router ──► Session ──► handler        │
//! │                                              (JWT +      │              │
//! │                                               area)      ▼              │
//! │                                             Arc<dyn DataService>        │
//! │                                                   │                     │
//! │                               ┌───────────────────┴──────────┐          │
//! │                               ▼                              ▼          │
//! │                      SqliteDataService             SheetsDataService    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables (see [`config`]):
//! - `CLINIC_HTTP_PORT` - listen port (default: 8080)
//! - `CLINIC_DATA_BACKEND` - `sqlite` or `google-sheets` (default: sqlite)
//! - `CLINIC_SQLITE_PATH` - SQLite file (default: ./clinic.db)
//! - `GOOGLE_SHEETS_SPREADSHEET_ID`, `GOOGLE_SERVICE_ACCOUNT_EMAIL`,
//!   `GOOGLE_PRIVATE_KEY` - required for google-sheets
//! - `CLINIC_JWT_SECRET` - session signing secret
//! - `CLINIC_SESSION_LIFETIME_SECS` - session lifetime (default: 28800)
//! - `CLINIC_TRUST_FORWARDED_IDENTITY` - believe the proxy identity header
//! - `CLINIC_IDENTITY_HEADER` - that header (default: x-forwarded-email)

pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::Method;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

// Re-exports
pub use backend::connect_backend;
pub use config::{ApiConfig, BackendConfig, ConfigError};
pub use error::ApiError;
pub use state::AppState;

/// The complete application: routes plus tracing and CORS layers.
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    routes::api_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

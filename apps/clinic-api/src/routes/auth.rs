//! Sign-in, session and account endpoints.
//!
//! ## Sign-in
//! ```text
//! POST /api/auth/sign-in { email, password? }
//!   │
//!   ├── backend has accounts (SQLite)
//!   │     password required, checked against the argon2 hash
//!   │
//!   └── backend without accounts (Sheets)
//!         email must match the proxy identity header, and only when
//!         CLINIC_TRUST_FORWARDED_IDENTITY is on
//!   │
//!   ▼
//! get_user_roles(email)  ── empty ──► 403 NO_ROLES
//!   │
//!   ▼
//! session token (sub, roles, iat, exp, jti)
//! ```

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use clinic_core::{Area, NewUser, Role, ServiceError, UserAccount};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::Session;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub email: String,
    pub roles: Vec<Role>,
    pub areas: Vec<Area>,
    pub expires_at: i64,
}

impl From<&Session> for SessionResponse {
    fn from(session: &Session) -> Self {
        SessionResponse {
            email: session.email.clone(),
            roles: session.roles.clone(),
            areas: session.areas(),
            expires_at: session.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub token: String,
    #[serde(flatten)]
    pub session: SessionResponse,
}

/// `POST /api/auth/sign-in`
pub async fn sign_in(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SignInRequest>,
) -> ApiResult<Json<SignInResponse>> {
    let email = request.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ApiError::BadRequest("email is required".to_string()));
    }

    match state.service.user_accounts() {
        Some(accounts) => {
            let password = request
                .password
                .as_deref()
                .filter(|p| !p.is_empty())
                .ok_or_else(|| ApiError::BadRequest("password is required".to_string()))?;
            if accounts.authenticate_user(&email, password).await?.is_none() {
                return Err(ApiError::SignInFailed(format!("bad credentials for {email}")));
            }
        }
        None => {
            if !state.identity.trust_forwarded {
                return Err(ApiError::SignInFailed(
                    "backend has no accounts and proxy identity is not trusted".to_string(),
                ));
            }
            let asserted = headers
                .get(state.identity.header.as_str())
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_lowercase());
            if asserted.as_deref() != Some(email.as_str()) {
                return Err(ApiError::SignInFailed(format!(
                    "proxy identity {asserted:?} does not match {email}"
                )));
            }
        }
    }

    let roles = state.service.get_user_roles(&email).await?;
    if roles.is_empty() {
        info!(email = %email, "Sign-in refused: no roles");
        return Err(ApiError::NoRoles(email));
    }

    let (token, claims) = state.sessions.issue(&email, &roles)?;
    let session = Session::from(claims);
    info!(email = %email, roles = ?roles, "Signed in");

    Ok(Json(SignInResponse {
        token,
        session: SessionResponse::from(&session),
    }))
}

/// `GET /api/auth/session`
pub async fn session(session: Session) -> Json<SessionResponse> {
    Json(SessionResponse::from(&session))
}

/// `POST /api/users`
pub async fn create_user(
    State(state): State<AppState>,
    session: Session,
    Json(user): Json<NewUser>,
) -> ApiResult<(StatusCode, Json<UserAccount>)> {
    session.require(Area::Admin)?;

    let accounts = state.service.user_accounts().ok_or(ServiceError::Unsupported {
        operation: "create_user",
        backend: state.service.backend(),
    })?;

    let account = accounts.create_user(user).await?;
    info!(by = %session.email, email = %account.email, "User account created");
    Ok((StatusCode::CREATED, Json(account)))
}

//! Session tokens.
//!
//! Sign-in hands out an HS256 JWT carrying the user's email and roles.
//! Every protected handler takes a [`Session`] extractor, which rejects
//! missing, forged and expired tokens before the handler runs, then checks
//! the route's [`Area`] with [`Session::require`].

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use clinic_core::{can_access, reachable_areas, Area, Role};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// JWT claims structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (lowercased email)
    pub sub: String,

    /// Roles resolved at sign-in
    pub roles: Vec<Role>,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,
}

/// Issues and checks session tokens.
pub struct SessionManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime_secs: i64,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("lifetime_secs", &self.lifetime_secs)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(secret: &str, lifetime_secs: i64) -> Self {
        SessionManager {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime_secs,
        }
    }

    /// Signs a token for `email` holding `roles`.
    pub fn issue(&self, email: &str, roles: &[Role]) -> ApiResult<(String, Claims)> {
        let now = Utc::now();
        let claims = Claims {
            sub: email.to_string(),
            roles: roles.to_vec(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.lifetime_secs)).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("Failed to sign session token: {e}")))?;
        Ok((token, claims))
    }

    /// Validate and decode a token.
    pub fn validate(&self, token: &str) -> ApiResult<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => ApiError::TokenExpired,
                _ => {
                    tracing::debug!(error = %e, "Rejected session token");
                    ApiError::Unauthorized
                }
            })
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// The signed-in user of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub email: String,
    pub roles: Vec<Role>,
    pub expires_at: i64,
}

impl Session {
    /// Fails with 403 unless one of the session's roles reaches `area`.
    pub fn require(&self, area: Area) -> ApiResult<()> {
        if can_access(&self.roles, area) {
            Ok(())
        } else {
            tracing::info!(email = %self.email, area = %area, "Access denied");
            Err(ApiError::Forbidden(area.to_string()))
        }
    }

    /// Areas shown in the user's menu.
    pub fn areas(&self) -> Vec<Area> {
        reachable_areas(&self.roles)
    }
}

impl From<Claims> for Session {
    fn from(claims: Claims) -> Self {
        Session {
            email: claims.sub,
            roles: claims.roles,
            expires_at: claims.exp,
        }
    }
}

impl FromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(extract_bearer_token)
            .ok_or(ApiError::Unauthorized)?;

        Ok(state.sessions.validate(token)?.into())
    }
}

//! API error types with structured JSON responses.
//!
//! Every failure leaves the server as
//! `{ "error": { "code": "...", "message": "..." } }`.
//!
//! ```text
//! ServiceError::Invalid            → 400 INVALID
//! Unauthorized / TokenExpired      → 401
//! Forbidden / NoRoles              → 403
//! ServiceError::NotFound           → 404 NOT_FOUND
//! Duplicate / InsufficientStock    → 409
//! ServiceError::Unsupported        → 501 UNSUPPORTED
//! Backend / Inconsistent / Internal→ 500 (details logged, not returned)
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use clinic_core::{CoreError, ServiceError, ValidationError};
use serde::Serialize;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Session expired")]
    TokenExpired,

    #[error("Sign-in failed: {0}")]
    SignInFailed(String),

    #[error("No roles assigned to {0}")]
    NoRoles(String),

    #[error("Access to {0} denied")]
    Forbidden(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REQUIRED",
                "Authentication required".to_string(),
            ),
            ApiError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "TOKEN_EXPIRED",
                "Session expired, sign in again".to_string(),
            ),
            ApiError::SignInFailed(detail) => {
                tracing::warn!(detail = %detail, "Sign-in rejected");
                (
                    StatusCode::UNAUTHORIZED,
                    "SIGN_IN_FAILED",
                    "Email or password is incorrect".to_string(),
                )
            }
            err @ ApiError::NoRoles(_) => (StatusCode::FORBIDDEN, "NO_ROLES", err.to_string()),
            err @ ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN", err.to_string()),
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail),
            ApiError::Internal(detail) => {
                tracing::error!(detail = %detail, "API internal error");
                internal()
            }
            ApiError::Service(err) => service_parts(err),
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL",
        "An internal error occurred".to_string(),
    )
}

fn service_parts(err: ServiceError) -> (StatusCode, &'static str, String) {
    match err {
        ServiceError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
        ServiceError::Duplicate { .. } => (StatusCode::CONFLICT, "DUPLICATE", err.to_string()),
        ServiceError::InsufficientStock { .. } => {
            (StatusCode::CONFLICT, "INSUFFICIENT_STOCK", err.to_string())
        }
        ServiceError::Invalid(detail) => (StatusCode::BAD_REQUEST, "INVALID", detail),
        ServiceError::Unsupported { .. } => {
            (StatusCode::NOT_IMPLEMENTED, "UNSUPPORTED", err.to_string())
        }
        ServiceError::Backend { backend, message } => {
            tracing::error!(backend = %backend, error = %message, "Backend failure");
            internal()
        }
        ServiceError::Inconsistent { step, message } => {
            tracing::error!(step = %step, error = %message, "Backend left inconsistent");
            internal()
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::Service(err.into())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Service(err.into())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use clinic_core::BackendKind;

    async fn body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), 4096).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn unauthorized_returns_401() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body(response).await["error"]["code"], "AUTH_REQUIRED");
    }

    #[tokio::test]
    async fn service_errors_map_to_statuses() {
        let cases = [
            (ServiceError::not_found("Patient", "p1"), StatusCode::NOT_FOUND),
            (
                ServiceError::Duplicate {
                    entity: "Staff".to_string(),
                    detail: "email a@b.in".to_string(),
                },
                StatusCode::CONFLICT,
            ),
            (
                ServiceError::InsufficientStock {
                    item: "ORS".to_string(),
                    available: 1,
                    requested: 3,
                },
                StatusCode::CONFLICT,
            ),
            (ServiceError::Invalid("phone".to_string()), StatusCode::BAD_REQUEST),
            (
                ServiceError::Unsupported {
                    operation: "create_user",
                    backend: BackendKind::GoogleSheets,
                },
                StatusCode::NOT_IMPLEMENTED,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn backend_details_are_hidden() {
        let err = ServiceError::backend(BackendKind::GoogleSheets, "403 from sheets.googleapis.com");
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body(response).await;
        assert_eq!(json["error"]["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn sign_in_failure_does_not_say_why() {
        let response = ApiError::SignInFailed("unknown email".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body(response).await["error"]["message"], "Email or password is incorrect");
    }
}

//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};
use vouch_core::auth::AuthError;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upstream error: {0}")]
    BadGateway(String),

    /// OAuth2 token-endpoint error (`invalid_client`, `invalid_grant`,
    /// `invalid_request`).
    #[error("{code}: {message}")]
    OAuth {
        status: StatusCode,
        code: &'static str,
        message: String,
    },

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    /// Map a password-login failure. Unknown emails are only told apart
    /// from bad passwords when `reveal_unknown_user` is set.
    pub fn from_login(e: AuthError, reveal_unknown_user: bool) -> Self {
        match e {
            AuthError::UserNotFound if reveal_unknown_user => {
                AppError::NotFound("User not found".into())
            }
            other => AppError::from(other),
        }
    }

    /// Map a code-exchange failure to an OAuth2 error body.
    pub fn oauth(e: AuthError) -> Self {
        let (status, code, message) = match &e {
            AuthError::InvalidClient => (
                StatusCode::UNAUTHORIZED,
                "invalid_client",
                "Client authentication failed",
            ),
            AuthError::InvalidGrant => (
                StatusCode::BAD_REQUEST,
                "invalid_grant",
                "Authorization code is invalid",
            ),
            AuthError::ExpiredGrant => (
                StatusCode::BAD_REQUEST,
                "invalid_grant",
                "Authorization code has expired",
            ),
            AuthError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "invalid_request",
                "Malformed token request",
            ),
            _ => return AppError::from(e),
        };
        warn!(reason = e.kind(), "code exchange rejected");
        AppError::OAuth {
            status,
            code,
            message: message.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str()),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.as_str()),
            AppError::Conflict(m) => (StatusCode::CONFLICT, "conflict", m.as_str()),
            AppError::BadGateway(_) => (
                StatusCode::BAD_GATEWAY,
                "upstream_error",
                "Identity provider unavailable",
            ),
            AppError::OAuth {
                status,
                code,
                message,
            } => (*status, *code, message.as_str()),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error",
            ),
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        let kind = e.kind();
        match e {
            AuthError::InvalidCredentials | AuthError::UserNotFound => {
                warn!(reason = kind, "credential check failed");
                AppError::Unauthorized("Invalid credentials".into())
            }
            AuthError::TokenExpired
            | AuthError::TokenRevoked
            | AuthError::TokenStale
            | AuthError::TokenMalformed(_)
            | AuthError::PrincipalNotFound => {
                warn!(reason = kind, "token rejected");
                AppError::Unauthorized("Invalid or expired token".into())
            }
            AuthError::InvalidClient => AppError::Unauthorized("Invalid client".into()),
            AuthError::AccountDisabled => AppError::Forbidden("Account is disabled".into()),
            AuthError::Forbidden(msg) => AppError::Forbidden(msg),
            AuthError::InvalidGrant => AppError::Validation("Invalid grant".into()),
            AuthError::ExpiredGrant => AppError::Validation("Authorization code expired".into()),
            AuthError::Validation(msg) => AppError::Validation(msg),
            AuthError::NotFound(msg) => AppError::NotFound(msg),
            AuthError::Conflict(msg) => AppError::Conflict(msg),
            AuthError::Upstream(msg) => {
                warn!(error = %msg, "identity provider failure");
                AppError::BadGateway(msg)
            }
            AuthError::Configuration(msg) | AuthError::Store(msg) | AuthError::Internal(msg) => {
                error!(reason = kind, error = %msg, "internal failure");
                AppError::Internal(msg)
            }
        }
    }
}

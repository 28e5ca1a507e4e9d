//! Authentication and authorization logic.
//!
//! Key material, token issuance and verification, revocation, the
//! authorization-code broker and the credential authenticators. Everything
//! here talks to persistence through the repository traits in
//! [`crate::store`].

pub mod accounts;
pub mod authenticator;
pub mod authorization_code;
pub mod bootstrap;
pub mod clients;
pub mod federated_state;
pub mod issuer;
pub mod keys;
pub mod linkedin;
pub mod password;
pub mod revocation;
pub mod tokens;
pub mod verifier;

use thiserror::Error;

use crate::store::StoreError;

/// Authentication errors.
///
/// Variants are precise so they can be logged; the HTTP layer decides how
/// much of the distinction a caller gets to see.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error("Account disabled")]
    AccountDisabled,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token revoked")]
    TokenRevoked,

    #[error("Token version is stale")]
    TokenStale,

    #[error("Malformed token: {0}")]
    TokenMalformed(String),

    #[error("Token subject no longer exists")]
    PrincipalNotFound,

    #[error("Invalid client")]
    InvalidClient,

    #[error("Invalid grant")]
    InvalidGrant,

    #[error("Authorization code expired")]
    ExpiredGrant,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upstream identity provider error: {0}")]
    Upstream(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Short machine-readable name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::Configuration(_) => "configuration",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::UserNotFound => "user_not_found",
            AuthError::AccountDisabled => "account_disabled",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenRevoked => "token_revoked",
            AuthError::TokenStale => "token_stale",
            AuthError::TokenMalformed(_) => "token_malformed",
            AuthError::PrincipalNotFound => "principal_not_found",
            AuthError::InvalidClient => "invalid_client",
            AuthError::InvalidGrant => "invalid_grant",
            AuthError::ExpiredGrant => "expired_grant",
            AuthError::NotFound(_) => "not_found",
            AuthError::Conflict(_) => "conflict",
            AuthError::Forbidden(_) => "forbidden",
            AuthError::Validation(_) => "validation",
            AuthError::Upstream(_) => "upstream",
            AuthError::Store(_) => "store",
            AuthError::Internal(_) => "internal",
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(msg) => AuthError::Conflict(msg),
            other => AuthError::Store(other.to_string()),
        }
    }
}

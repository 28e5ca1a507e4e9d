//! Authentication middleware: Bearer token extraction, verification and
//! role checks.

use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use vouch_core::auth::verifier::AudiencePolicy;
use vouch_core::models::auth::{Principal, Role, TokenClaims, User};

use crate::AppState;
use crate::error::AppError;

/// Verified caller, stored in request extensions by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub principal: Principal,
    pub claims: TokenClaims,
    pub user: User,
    /// The raw bearer token, needed to blacklist it on logout.
    pub token: String,
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AppError> {
    let header =
        header.ok_or_else(|| AppError::Unauthorized("Missing authorization header".into()))?;
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization scheme".into()))
}

/// Axum middleware: verifies the bearer token against the first-party
/// audience and injects [`AuthenticatedUser`] into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let token = bearer_token(header)?.to_string();

    let verified = state
        .authority
        .verifier
        .verify_with(&token, AudiencePolicy::Server)
        .await?;

    request.extensions_mut().insert(AuthenticatedUser {
        principal: verified.principal,
        claims: verified.claims,
        user: verified.user,
        token,
    });

    Ok(next.run(request).await)
}

/// Capability check called at the top of role-restricted handlers.
pub fn require_role(user: &AuthenticatedUser, role: Role) -> Result<&Principal, AppError> {
    if user.principal.role == role {
        Ok(&user.principal)
    } else {
        Err(AppError::Forbidden(format!("{role} role required")))
    }
}

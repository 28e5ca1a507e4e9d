//! OAuth2 authorization-code exchange for third-party clients.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use tracing::debug;
use vouch_core::auth::AuthError;
use vouch_core::models::auth::TokenPair;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{ClientCredentials, CodeQuery};

/// `POST /api/callback?code=...`: trade a code plus client credentials for
/// tokens whose audience is the client.
pub async fn exchange_handler(
    State(state): State<AppState>,
    Query(query): Query<CodeQuery>,
    body: Result<Json<ClientCredentials>, JsonRejection>,
) -> AppResult<Json<TokenPair>> {
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::oauth(AuthError::Validation("code is required".into())))?;
    let Json(body) = body.map_err(|e| {
        debug!(error = %e, "unreadable code exchange body");
        AppError::oauth(AuthError::Validation(e.body_text()))
    })?;
    if body.client_id.is_empty() || body.client_secret.is_empty() {
        return Err(AppError::oauth(AuthError::InvalidClient));
    }

    let pair = state
        .authority
        .codes
        .exchange(&code, &body.client_id, &body.client_secret)
        .await
        .map_err(AppError::oauth)?;
    Ok(Json(pair))
}

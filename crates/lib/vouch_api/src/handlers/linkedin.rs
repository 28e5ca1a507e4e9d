//! LinkedIn login: redirect out, then handle the provider callback.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Redirect;
use tracing::{info, warn};
use url::Url;
use vouch_core::auth::AuthError;
use vouch_core::auth::authenticator::Authenticator;
use vouch_core::auth::federated_state::FederatedContext;
use vouch_core::auth::issuer::IssueOptions;
use vouch_core::auth::linkedin::IdentityProvider;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{FederatedCallbackQuery, FederatedStartQuery};

/// Frontend page that receives the outcome of a first-party federated login.
const FRONTEND_CALLBACK_PATH: &str = "/auth/callback";

fn provider(state: &AppState) -> AppResult<&Arc<dyn IdentityProvider>> {
    state
        .identity_provider
        .as_ref()
        .ok_or_else(|| AppError::NotFound("Federated login is not configured".into()))
}

/// `GET /auth/linkedin`: send the browser to LinkedIn.
///
/// `client_id`/`redirect_uri`/`state` start the login on behalf of a
/// third-party client; they are checked here so a bad client never reaches
/// the provider.
pub async fn start_handler(
    State(state): State<AppState>,
    Query(query): Query<FederatedStartQuery>,
) -> AppResult<Redirect> {
    let provider = provider(&state)?;

    let client_id = query.client_id.filter(|c| !c.is_empty());
    if let Some(client_id) = client_id.as_deref() {
        let client = state.authority.clients.find_active(client_id).await?;
        if let Some(uri) = query.redirect_uri.as_deref()
            && uri != client.redirect_uri
        {
            return Err(AppError::Validation(
                "redirect_uri does not match the registered client".into(),
            ));
        }
    }

    let csrf_state = state.federated_states.begin(FederatedContext {
        client_id,
        redirect_uri: query.redirect_uri,
        client_state: query.state,
    });
    let url = provider.authorize_url(&csrf_state)?;
    Ok(Redirect::to(&url))
}

/// `GET /auth/linkedin/callback`: always answers with a redirect.
///
/// Success lands on the client redirect (with a code) or on the frontend
/// (with tokens); any failure lands on the frontend with `error=<kind>`.
pub async fn callback_handler(
    State(state): State<AppState>,
    Query(query): Query<FederatedCallbackQuery>,
) -> AppResult<Redirect> {
    match complete_login(&state, query).await {
        Ok(url) => Ok(Redirect::to(&url)),
        Err(e) => {
            warn!(reason = e.kind(), error = %e, "federated login failed");
            let url = frontend_url(&state, &[("error", e.kind())])?;
            Ok(Redirect::to(&url))
        }
    }
}

async fn complete_login(state: &AppState, query: FederatedCallbackQuery) -> Result<String, AuthError> {
    if let Some(error) = query.error {
        return Err(AuthError::Upstream(format!("provider denied login: {error}")));
    }
    let pending = query
        .state
        .as_deref()
        .and_then(|s| state.federated_states.take(s))
        .ok_or_else(|| AuthError::Validation("unknown or expired state".into()))?;
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AuthError::Validation("provider code is missing".into()))?;

    let provider = state
        .identity_provider
        .as_ref()
        .ok_or_else(|| AuthError::NotFound("federated login is not configured".into()))?;
    let profile = provider.profile_from_code(&code).await?;
    let user = state.authority.federated.authenticate(&profile).await?;

    let context = pending.context;
    if let Some(client_id) = context.client_id.as_deref() {
        let url = state
            .authority
            .codes
            .authorize_redirect(
                user.id,
                client_id,
                context.redirect_uri.as_deref(),
                context.client_state.as_deref(),
            )
            .await?;
        info!(user_id = %user.id, client_id, "federated login for client");
        return Ok(url);
    }

    let pair = state
        .authority
        .issuer
        .issue(&user, IssueOptions::default())
        .await?;
    info!(user_id = %user.id, "federated login");
    frontend_url(
        state,
        &[
            ("accessToken", pair.access_token.as_str()),
            ("refreshToken", pair.refresh_token.as_str()),
        ],
    )
    .map_err(|e| AuthError::Internal(e.to_string()))
}

fn frontend_url(state: &AppState, params: &[(&str, &str)]) -> AppResult<String> {
    let mut url = Url::parse(&state.config.frontend_url)
        .and_then(|base| base.join(FRONTEND_CALLBACK_PATH))
        .map_err(|e| AppError::Internal(format!("FRONTEND_URL: {e}")))?;
    url.query_pairs_mut().extend_pairs(params);
    Ok(url.into())
}

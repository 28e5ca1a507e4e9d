//! Authentication request handlers.

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use tracing::info;
use vouch_core::auth::accounts::Registration;
use vouch_core::auth::authenticator::{Authenticator, PasswordCredentials};
use vouch_core::auth::issuer::IssueOptions;
use vouch_core::auth::keys::JsonWebKeySet;
use vouch_core::auth::verifier::Introspection;
use vouch_core::models::auth::TokenPair;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    AuthenticateRequest, ChangePasswordRequest, IntrospectRequest, LogoutRequest, LogoutScope,
    MessageResponse, RedirectResponse, RefreshRequest, RegisterRequest, UserResponse,
};

/// `POST /auth/authenticate`: email + password login.
///
/// With a `client_id` the login happens on behalf of that client: instead of
/// tokens the caller gets the client redirect carrying an authorization code.
pub async fn authenticate_handler(
    State(state): State<AppState>,
    Json(body): Json<AuthenticateRequest>,
) -> AppResult<Response> {
    let reveal = state.config.auth.reveal_unknown_user;
    let user = state
        .authority
        .passwords
        .authenticate(&PasswordCredentials {
            email: body.email,
            password: body.password,
        })
        .await
        .map_err(|e| AppError::from_login(e, reveal))?;

    if let Some(client_id) = body.client_id.as_deref().filter(|c| !c.is_empty()) {
        let redirect_url = state
            .authority
            .codes
            .authorize_redirect(
                user.id,
                client_id,
                body.redirect_uri.as_deref(),
                body.state.as_deref(),
            )
            .await?;
        return Ok(Json(RedirectResponse { redirect_url }).into_response());
    }

    let pair = state
        .authority
        .issuer
        .issue(&user, IssueOptions::default())
        .await?;
    info!(user_id = %user.id, "password login");
    Ok(Json(pair).into_response())
}

/// `POST /auth/register`: create a password account.
pub async fn register_handler(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<Json<TokenPair>> {
    let (_, pair) = state
        .authority
        .accounts
        .register(Registration {
            email: body.email,
            password: body.password,
            name: body.name,
        })
        .await?;
    Ok(Json(pair))
}

/// `POST /auth/refresh`: rotate a refresh token.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> AppResult<Json<TokenPair>> {
    let pair = state.authority.accounts.refresh(&body.refresh_token).await?;
    Ok(Json(pair))
}

/// `POST /auth/logout`: end this session (`single`) or every session (`all`).
pub async fn logout_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    body: Option<Json<LogoutRequest>>,
) -> AppResult<Json<MessageResponse>> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let revocation = &state.authority.revocation;
    match body.scope {
        LogoutScope::Single => {
            revocation
                .logout_device(
                    &user.token,
                    &user.claims,
                    user.principal.id,
                    body.device_label.as_deref(),
                    body.refresh_token.as_deref(),
                )
                .await?;
            Ok(Json(MessageResponse::new("Logged out")))
        }
        LogoutScope::All => {
            revocation.logout_all(user.principal.id).await?;
            Ok(Json(MessageResponse::new("Logged out of all devices")))
        }
    }
}

/// `GET /auth/me`: the authenticated principal.
pub async fn me_handler(
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
) -> Json<UserResponse> {
    Json(user.user.into())
}

/// `POST /auth/password`: change the caller's password.
pub async fn change_password_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Json(body): Json<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    state
        .authority
        .accounts
        .change_password(user.principal.id, &body.current_password, &body.new_password)
        .await?;
    Ok(Json(MessageResponse::new("Password changed")))
}

/// `POST /auth/introspect`: never fails for bad tokens, reports them
/// inactive instead.
pub async fn introspect_handler(
    State(state): State<AppState>,
    Json(body): Json<IntrospectRequest>,
) -> Json<Introspection> {
    Json(state.authority.verifier.introspect(&body.token).await)
}

/// `GET /auth/jwks`: public verification keys.
pub async fn jwks_handler(State(state): State<AppState>) -> Json<JsonWebKeySet> {
    Json(state.authority.keys.public_jwk())
}

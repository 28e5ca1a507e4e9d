//! User administration (admin only).

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;
use vouch_core::models::auth::Role;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthenticatedUser, require_role};
use crate::models::{SetRoleRequest, SetStatusRequest, UserListResponse, UserResponse};

fn parse_user_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::Validation(format!("invalid user id '{raw}'")))
}

/// `GET /users`
pub async fn list_users_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
) -> AppResult<Json<UserListResponse>> {
    require_role(&user, Role::Admin)?;
    let users = state.authority.accounts.list_users().await?;
    Ok(Json(UserListResponse {
        users: users.into_iter().map(UserResponse::from).collect(),
    }))
}

/// `PATCH /users/{id}/role`: bumps the target's token version on change.
pub async fn set_role_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    Json(body): Json<SetRoleRequest>,
) -> AppResult<Json<UserResponse>> {
    let actor = require_role(&user, Role::Admin)?;
    let target = parse_user_id(&id)?;
    let updated = state
        .authority
        .accounts
        .set_role(actor, target, body.role)
        .await?;
    Ok(Json(updated.into()))
}

/// `PATCH /users/{id}/status`: deactivation logs the target out everywhere.
pub async fn set_status_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    Json(body): Json<SetStatusRequest>,
) -> AppResult<Json<UserResponse>> {
    let actor = require_role(&user, Role::Admin)?;
    let target = parse_user_id(&id)?;
    let updated = state
        .authority
        .accounts
        .set_status(actor, target, body.is_active, body.reason.as_deref())
        .await?;
    Ok(Json(updated.into()))
}

//! Third-party client management (admin only).

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use vouch_core::models::auth::Role;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::{AuthenticatedUser, require_role};
use crate::models::{
    ClientListResponse, ClientResponse, CreateClientRequest, CreatedClientResponse,
    SetClientStatusRequest,
};

/// `POST /clients`: the plaintext secret appears in this response only.
pub async fn create_client_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Json(body): Json<CreateClientRequest>,
) -> AppResult<(StatusCode, Json<CreatedClientResponse>)> {
    require_role(&user, Role::Admin)?;
    let registered = state
        .authority
        .clients
        .register(&body.name, &body.redirect_uri, body.allowed_origins)
        .await?;
    state.origins.reload(&state.authority.clients).await;
    Ok((
        StatusCode::CREATED,
        Json(CreatedClientResponse {
            client_id: registered.client.client_id,
            client_secret: registered.client_secret,
            name: registered.client.name,
            redirect_uri: registered.client.redirect_uri,
        }),
    ))
}

/// `GET /clients`
pub async fn list_clients_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
) -> AppResult<Json<ClientListResponse>> {
    require_role(&user, Role::Admin)?;
    let clients = state.authority.clients.list().await?;
    Ok(Json(ClientListResponse {
        clients: clients.into_iter().map(ClientResponse::from).collect(),
    }))
}

/// `PATCH /clients/{client_id}/status`
pub async fn set_client_status_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path(client_id): Path<String>,
    Json(body): Json<SetClientStatusRequest>,
) -> AppResult<Json<ClientResponse>> {
    require_role(&user, Role::Admin)?;
    let status = body.parse()?;
    let client = state
        .authority
        .clients
        .set_status(&client_id, status)
        .await?;
    state.origins.reload(&state.authority.clients).await;
    Ok(Json(client.into()))
}

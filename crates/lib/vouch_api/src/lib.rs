//! # vouch_api
//!
//! HTTP API library for Vouch.

pub mod config;
pub mod cors;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use sqlx::PgPool;
use tower_http::trace::TraceLayer;
use vouch_core::Authority;
use vouch_core::auth::federated_state::FederatedStateStore;
use vouch_core::auth::linkedin::IdentityProvider;

use crate::config::ApiConfig;
use crate::cors::AllowedOrigins;
use crate::handlers::{auth, clients, linkedin, oauth, users};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub authority: Authority,
    /// API configuration.
    pub config: Arc<ApiConfig>,
    /// Pending federated logins keyed by CSRF state.
    pub federated_states: Arc<FederatedStateStore>,
    /// `None` when federated login is not configured.
    pub identity_provider: Option<Arc<dyn IdentityProvider>>,
    /// Browser origins accepted by the CORS layer.
    pub origins: AllowedOrigins,
}

/// Run embedded database migrations.
///
/// Delegates to `vouch_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    vouch_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = state.origins.layer();

    // Public routes (no auth required)
    let public = Router::new()
        .route(routes::POST_AUTH_AUTHENTICATE, post(auth::authenticate_handler))
        .route(routes::POST_AUTH_REGISTER, post(auth::register_handler))
        .route(routes::POST_AUTH_REFRESH, post(auth::refresh_handler))
        .route(routes::POST_AUTH_INTROSPECT, post(auth::introspect_handler))
        .route(routes::GET_AUTH_JWKS, get(auth::jwks_handler))
        .route(routes::GET_AUTH_LINKEDIN, get(linkedin::start_handler))
        .route(routes::GET_AUTH_LINKEDIN_CALLBACK, get(linkedin::callback_handler))
        .route(routes::POST_API_CALLBACK, post(oauth::exchange_handler));

    // Protected routes (require auth)
    let protected = Router::new()
        .route(routes::POST_AUTH_LOGOUT, post(auth::logout_handler))
        .route(routes::GET_AUTH_ME, get(auth::me_handler))
        .route(routes::POST_AUTH_PASSWORD, post(auth::change_password_handler))
        .route(routes::GET_USERS, get(users::list_users_handler))
        .route(routes::PATCH_USERS_ID_ROLE, patch(users::set_role_handler))
        .route(routes::PATCH_USERS_ID_STATUS, patch(users::set_status_handler))
        .route(
            routes::CLIENTS,
            post(clients::create_client_handler).get(clients::list_clients_handler),
        )
        .route(
            routes::PATCH_CLIENTS_ID_STATUS,
            patch(clients::set_client_status_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

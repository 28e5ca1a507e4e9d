//! Vouch API server binary.
//!
//! Loads configuration, fails fast on missing or malformed signing keys,
//! migrates the database, reconciles the bootstrap admin, then serves the
//! API until interrupted.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use vouch_api::config::ApiConfig;
use vouch_api::cors::AllowedOrigins;
use vouch_core::Authority;
use vouch_core::auth::bootstrap::{BootstrapOutcome, ensure_bootstrap_admin};
use vouch_core::auth::federated_state::FederatedStateStore;
use vouch_core::auth::keys::KeyProvider;
use vouch_core::auth::linkedin::{IdentityProvider, LinkedInClient};
use vouch_core::config::load_private_key_pem;
use vouch_core::maintenance::spawn_sweep_task;
use vouch_core::notify::LogNotifier;
use vouch_core::store::{PgStore, Store, UserRepo, connect_options};

/// CLI arguments for the API server. Everything else comes from the
/// environment (see `ApiConfig::from_env`).
#[derive(Parser, Debug)]
#[command(name = "vouch_api_server", about = "Vouch identity provider API server")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:3100")]
    bind_addr: String,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/vouch"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 10)]
    max_connections: u32,

    /// Seconds to wait for a pooled connection before failing the request.
    #[arg(long, default_value_t = 10)]
    acquire_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,vouch_api=debug,vouch_core=debug")
            }),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env()?;
    config.bind_addr = args.bind_addr;
    config.database_url = args.database_url;

    // Signing keys are mandatory; refuse to start without them.
    let pem = load_private_key_pem()?;
    let keys = Arc::new(KeyProvider::from_pem(&config.auth.key_id, &pem)?);
    info!(kid = keys.kid(), "signing key loaded");

    info!(
        max_connections = args.max_connections,
        statement_timeout_secs = config.statement_timeout.as_secs(),
        "connecting to database"
    );
    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(Duration::from_secs(args.acquire_timeout_secs))
        .connect_with(connect_options(&config.database_url, config.statement_timeout)?)
        .await?;

    info!("running database migrations");
    vouch_api::migrate(&pool).await?;

    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));

    match &config.bootstrap_admin {
        Some(admin) => match ensure_bootstrap_admin(store.as_ref(), admin).await? {
            BootstrapOutcome::AlreadyPresent => info!("active admin present"),
            BootstrapOutcome::Promoted(id) => info!(user_id = %id, "bootstrap admin promoted"),
            BootstrapOutcome::Created(id) => info!(user_id = %id, "bootstrap admin created"),
        },
        None => {
            if !store.active_admin_exists().await? {
                warn!("no active admin and BOOTSTRAP_ADMIN_* not set");
            }
        }
    }

    let identity_provider: Option<Arc<dyn IdentityProvider>> = match config.linkedin.clone() {
        Some(linkedin) => {
            info!("LinkedIn login enabled");
            Some(Arc::new(LinkedInClient::new(linkedin)?))
        }
        None => {
            info!("LinkedIn login disabled");
            None
        }
    };

    let authority = Authority::new(
        Arc::clone(&store),
        keys,
        &config.auth,
        Arc::new(LogNotifier),
    );
    let federated_states = Arc::new(FederatedStateStore::new());

    let shutdown = CancellationToken::new();
    let sweep_handle = spawn_sweep_task(Arc::clone(&store), config.maintenance_interval);
    let cleanup_handle = federated_states.spawn_cleanup_task();

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let local_addr = listener.local_addr()?;

    let origins = AllowedOrigins::new(&config.frontend_url);
    origins.reload(&authority.clients).await;

    let state = vouch_api::AppState {
        authority,
        origins,
        config: Arc::new(config),
        federated_states,
        identity_provider,
    };
    let app = vouch_api::router(state);

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, shutting down");
            }
            shutdown.cancel();
        }
    });

    info!(addr = %local_addr, "REST API listening");
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await;

    sweep_handle.abort();
    cleanup_handle.abort();

    result?;
    Ok(())
}

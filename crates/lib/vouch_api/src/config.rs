//! API server configuration.

use std::time::Duration;

use vouch_core::auth::AuthError;
use vouch_core::auth::linkedin::LinkedInConfig;
use vouch_core::config::{AuthConfig, BootstrapAdmin, env_or, env_parse};

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Browser landing page after a federated login.
    pub frontend_url: String,
    /// Period of the expired-row sweep.
    pub maintenance_interval: Duration,
    /// Server-side limit on any single SQL statement.
    pub statement_timeout: Duration,
    pub auth: AuthConfig,
    /// `None` disables the LinkedIn routes.
    pub linkedin: Option<LinkedInConfig>,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3100".into(),
            database_url: "postgres://localhost:5432/vouch".into(),
            frontend_url: "http://localhost:3000".into(),
            maintenance_interval: Duration::from_secs(3600),
            statement_timeout: Duration::from_secs(5),
            auth: AuthConfig::default(),
            linkedin: None,
            bootstrap_admin: None,
        }
    }
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                    | Default                           |
    /// |-----------------------------|-----------------------------------|
    /// | `BIND_ADDR`                 | `127.0.0.1:3100`                  |
    /// | `DATABASE_URL`              | `postgres://localhost:5432/vouch` |
    /// | `FRONTEND_URL`              | `http://localhost:3000`           |
    /// | `MAINTENANCE_INTERVAL_SECS` | `3600`                            |
    /// | `DB_STATEMENT_TIMEOUT_SECS` | `5`                               |
    ///
    /// Token policy, LinkedIn and bootstrap-admin variables are read by
    /// their own types in `vouch_core`.
    pub fn from_env() -> Result<Self, AuthError> {
        let defaults = Self::default();
        let interval = env_parse("MAINTENANCE_INTERVAL_SECS", 3600u64)?;
        if interval == 0 {
            return Err(AuthError::Configuration(
                "MAINTENANCE_INTERVAL_SECS must be positive".into(),
            ));
        }
        let statement_timeout = env_parse("DB_STATEMENT_TIMEOUT_SECS", 5u64)?;
        if statement_timeout == 0 {
            return Err(AuthError::Configuration(
                "DB_STATEMENT_TIMEOUT_SECS must be positive".into(),
            ));
        }
        Ok(Self {
            bind_addr: env_or("BIND_ADDR", &defaults.bind_addr),
            database_url: env_or("DATABASE_URL", &defaults.database_url),
            frontend_url: env_or("FRONTEND_URL", &defaults.frontend_url),
            maintenance_interval: Duration::from_secs(interval),
            statement_timeout: Duration::from_secs(statement_timeout),
            auth: AuthConfig::from_env()?,
            linkedin: LinkedInConfig::from_env()?,
            bootstrap_admin: BootstrapAdmin::from_env(),
        })
    }
}

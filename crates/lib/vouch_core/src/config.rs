//! Token policy configuration.
//!
//! Values come from the environment; anything unparsable is a
//! [`AuthError::Configuration`] so the process refuses to start rather than
//! running with a silently substituted default.

use std::str::FromStr;

use chrono::Duration;

use crate::auth::AuthError;

/// Default access-token lifetime: 1 hour.
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 60 * 60;

/// Default refresh-token lifetime: 30 days.
pub const DEFAULT_REFRESH_TOKEN_TTL_DAYS: i64 = 30;

/// Default authorization-code lifetime: 5 minutes.
pub const DEFAULT_AUTH_CODE_TTL_SECS: i64 = 5 * 60;

/// Token issuance and verification policy.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// `iss` claim written and expected.
    pub issuer: String,
    /// Default `aud` claim for first-party tokens.
    pub audience: String,
    /// `kid` of the signing key.
    pub key_id: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub auth_code_ttl: Duration,
    /// Report unknown emails on password login as 404 instead of a generic
    /// credentials failure.
    pub reveal_unknown_user: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "vouch".into(),
            audience: "vouch-api".into(),
            key_id: "vouch-key-1".into(),
            access_token_ttl: Duration::seconds(DEFAULT_ACCESS_TOKEN_TTL_SECS),
            refresh_token_ttl: Duration::days(DEFAULT_REFRESH_TOKEN_TTL_DAYS),
            auth_code_ttl: Duration::seconds(DEFAULT_AUTH_CODE_TTL_SECS),
            reveal_unknown_user: false,
        }
    }
}

impl AuthConfig {
    /// Reads the token policy from environment variables.
    ///
    /// | Variable                    | Default       |
    /// |-----------------------------|---------------|
    /// | `JWT_ISSUER`                | `vouch`       |
    /// | `JWT_AUDIENCE`              | `vouch-api`   |
    /// | `JWT_KEY_ID`                | `vouch-key-1` |
    /// | `ACCESS_TOKEN_TTL_SECS`     | `3600`        |
    /// | `REFRESH_TOKEN_TTL_DAYS`    | `30`          |
    /// | `AUTH_CODE_TTL_SECS`        | `300`         |
    /// | `LOGIN_REVEAL_UNKNOWN_USER` | `false`       |
    pub fn from_env() -> Result<Self, AuthError> {
        let defaults = Self::default();
        let config = Self {
            issuer: env_or("JWT_ISSUER", &defaults.issuer),
            audience: env_or("JWT_AUDIENCE", &defaults.audience),
            key_id: env_or("JWT_KEY_ID", &defaults.key_id),
            access_token_ttl: Duration::seconds(env_parse(
                "ACCESS_TOKEN_TTL_SECS",
                DEFAULT_ACCESS_TOKEN_TTL_SECS,
            )?),
            refresh_token_ttl: Duration::days(env_parse(
                "REFRESH_TOKEN_TTL_DAYS",
                DEFAULT_REFRESH_TOKEN_TTL_DAYS,
            )?),
            auth_code_ttl: Duration::seconds(env_parse(
                "AUTH_CODE_TTL_SECS",
                DEFAULT_AUTH_CODE_TTL_SECS,
            )?),
            reveal_unknown_user: env_parse("LOGIN_REVEAL_UNKNOWN_USER", false)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject non-positive lifetimes and empty identifiers.
    pub fn validate(&self) -> Result<(), AuthError> {
        for (name, ttl) in [
            ("access token ttl", self.access_token_ttl),
            ("refresh token ttl", self.refresh_token_ttl),
            ("authorization code ttl", self.auth_code_ttl),
        ] {
            if ttl <= Duration::zero() {
                return Err(AuthError::Configuration(format!("{name} must be positive")));
            }
        }
        for (name, value) in [
            ("issuer", &self.issuer),
            ("audience", &self.audience),
            ("key id", &self.key_id),
        ] {
            if value.trim().is_empty() {
                return Err(AuthError::Configuration(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }
}

/// Resolve the signing key PEM: `JWT_PRIVATE_KEY` (inline) → `JWT_PRIVATE_KEY_PATH`.
pub fn load_private_key_pem() -> Result<String, AuthError> {
    if let Ok(pem) = std::env::var("JWT_PRIVATE_KEY")
        && !pem.trim().is_empty()
    {
        return Ok(pem.replace("\\n", "\n"));
    }
    let path = std::env::var("JWT_PRIVATE_KEY_PATH").map_err(|_| {
        AuthError::Configuration("JWT_PRIVATE_KEY or JWT_PRIVATE_KEY_PATH must be set".into())
    })?;
    std::fs::read_to_string(&path)
        .map_err(|e| AuthError::Configuration(format!("cannot read signing key '{path}': {e}")))
}

/// Credentials for the startup admin reconciliation.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

impl BootstrapAdmin {
    /// `BOOTSTRAP_ADMIN_EMAIL` + `BOOTSTRAP_ADMIN_PASSWORD` (+ optional
    /// `BOOTSTRAP_ADMIN_NAME`). Returns `None` when either is unset.
    pub fn from_env() -> Option<Self> {
        let email = non_empty_env("BOOTSTRAP_ADMIN_EMAIL")?;
        let password = non_empty_env("BOOTSTRAP_ADMIN_PASSWORD")?;
        Some(Self {
            email,
            password,
            name: non_empty_env("BOOTSTRAP_ADMIN_NAME"),
        })
    }
}

/// Read an environment variable, treating empty as unset.
pub fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Read an environment variable or fall back to `default`.
pub fn env_or(name: &str, default: &str) -> String {
    non_empty_env(name).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
pub fn env_parse<T>(name: &str, default: T) -> Result<T, AuthError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty_env(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AuthError::Configuration(format!("{name}={raw}: {e}"))),
    }
}

//! Third-party client and authorization code models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthError;

/// Whether a client may take part in the authorization-code flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    Active,
    Inactive,
}

impl ClientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Active => "active",
            ClientStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClientStatus {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ClientStatus::Active),
            "inactive" => Ok(ClientStatus::Inactive),
            other => Err(AuthError::Validation(format!(
                "unknown client status '{other}'"
            ))),
        }
    }
}

/// Registered third-party application.
#[derive(Debug, Clone, PartialEq)]
pub struct Client {
    pub id: Uuid,
    /// Public identifier.
    pub client_id: String,
    pub name: String,
    /// SHA-256 of the client secret.
    pub client_secret_hash: String,
    pub redirect_uri: String,
    pub allowed_origins: Vec<String>,
    pub status: ClientStatus,
    pub created_at: DateTime<Utc>,
}

/// Fields required to register a client.
#[derive(Debug, Clone)]
pub struct NewClient {
    pub client_id: String,
    pub name: String,
    pub client_secret_hash: String,
    pub redirect_uri: String,
    pub allowed_origins: Vec<String>,
}

/// One-time authorization code bound to a (user, client) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationCode {
    pub code: String,
    pub user_id: Uuid,
    pub client_id: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl AuthorizationCode {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

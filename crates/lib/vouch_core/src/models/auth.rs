//! Authentication domain models.
//!
//! These are internal domain models, distinct from the API request/response
//! bodies (which use camelCase field names).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthError;

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(AuthError::Validation(format!("unknown role '{other}'"))),
        }
    }
}

/// Domain user (principal).
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    /// bcrypt hash; `None` for accounts that only ever signed in through a
    /// federated provider.
    pub password_hash: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub status_reason: Option<String>,
    /// Monotonic counter copied into every access token at issuance.
    pub token_version: i64,
    pub linkedin_id: Option<String>,
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub role: Role,
    pub linkedin_id: Option<String>,
    pub profile_picture: Option<String>,
}

/// Minimal trusted identity extracted from a verified access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

/// JWT claims embedded in access tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: user ID.
    pub sub: String,
    pub role: Role,
    /// User's token version at issuance.
    #[serde(rename = "tokenVersion")]
    pub token_version: i64,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
    pub iss: String,
    /// Server audience, or the client id for delegated tokens.
    pub aud: String,
    /// Unique per token, so two tokens minted in the same second differ.
    #[serde(default)]
    pub jti: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Authorization code consumed to obtain this token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_code: Option<String>,
}

/// Refresh token record stored in the database. Only the hash is kept.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub revoked: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// An individually revoked access token.
#[derive(Debug, Clone)]
pub struct BlacklistedToken {
    /// SHA-256 of the raw access token.
    pub token_hash: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub device_label: Option<String>,
}

/// Access + refresh token pair handed to a caller exactly once.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub token_type: String,
}

/// Verified profile returned by a federated identity provider.
#[derive(Debug, Clone, PartialEq)]
pub struct FederatedProfile {
    /// Provider-scoped subject identifier.
    pub provider_id: String,
    pub email: Option<String>,
    /// Whether the provider vouches for `email`.
    pub email_verified: bool,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(Role::User.to_string(), "user");
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn claims_use_camel_case_token_version_and_omit_empty_delegation() {
        let claims = TokenClaims {
            sub: "u".into(),
            role: Role::User,
            token_version: 3,
            iat: 1,
            exp: 2,
            iss: "vouch".into(),
            aud: "vouch-api".into(),
            jti: "j".into(),
            client_id: None,
            auth_code: None,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["tokenVersion"], 3);
        assert_eq!(json["role"], "user");
        assert!(json.get("client_id").is_none());
        assert!(json.get("auth_code").is_none());
    }
}

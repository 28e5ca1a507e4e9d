//! Single-token blacklist and per-user token versions.
//!
//! Logging out one device blacklists that access token until it would have
//! expired anyway. Logging out everywhere bumps the user's token version,
//! which stales every access token issued before it without enumerating
//! them, and revokes the user's stored refresh tokens.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use super::AuthError;
use super::tokens::hash_token;
use crate::models::auth::{BlacklistedToken, TokenClaims};
use crate::store::{BlacklistRepo, RefreshTokenRepo, Store, UserRepo};

#[derive(Clone)]
pub struct RevocationRegistry {
    store: Arc<dyn Store>,
}

impl RevocationRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Deny-list one raw access token until `expires_at`.
    pub async fn blacklist(
        &self,
        raw_token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
        device_label: Option<&str>,
    ) -> Result<(), AuthError> {
        self.store
            .blacklist_token(BlacklistedToken {
                token_hash: hash_token(raw_token),
                user_id,
                expires_at,
                device_label: device_label.map(str::to_string),
            })
            .await?;
        Ok(())
    }

    pub async fn is_blacklisted(&self, raw_token: &str) -> Result<bool, AuthError> {
        Ok(self.store.is_blacklisted(&hash_token(raw_token)).await?)
    }

    /// Increment the user's token version, returning the new value.
    pub async fn bump_version(&self, user_id: Uuid) -> Result<i64, AuthError> {
        let version = self
            .store
            .bump_token_version(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        info!(user_id = %user_id, token_version = version, "token version bumped");
        Ok(version)
    }

    /// Log out the device holding `raw_token`.
    ///
    /// Also revokes `refresh_token` when the client hands it over.
    pub async fn logout_device(
        &self,
        raw_token: &str,
        claims: &TokenClaims,
        user_id: Uuid,
        device_label: Option<&str>,
        refresh_token: Option<&str>,
    ) -> Result<(), AuthError> {
        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0)
            .ok_or_else(|| AuthError::TokenMalformed("exp out of range".into()))?;
        self.blacklist(raw_token, user_id, expires_at, device_label)
            .await?;
        if let Some(refresh_token) = refresh_token {
            self.store
                .revoke_refresh_token_by_hash(&hash_token(refresh_token))
                .await?;
        }
        info!(user_id = %user_id, device = device_label, "logged out single device");
        Ok(())
    }

    /// Log the user out of every device.
    pub async fn logout_all(&self, user_id: Uuid) -> Result<i64, AuthError> {
        let version = self.bump_version(user_id).await?;
        let revoked = self.store.revoke_all_refresh_tokens(user_id).await?;
        info!(user_id = %user_id, revoked_refresh_tokens = revoked, "logged out all devices");
        Ok(version)
    }
}

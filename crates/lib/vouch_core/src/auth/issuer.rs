//! Access and refresh token minting.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use super::AuthError;
use super::keys::KeyProvider;
use super::tokens::{generate_token, hash_token};
use crate::config::AuthConfig;
use crate::models::auth::{TokenClaims, TokenPair, User};
use crate::store::{RefreshTokenRepo, Store};

/// Delegation context for tokens minted on behalf of a third-party client.
#[derive(Debug, Clone, Copy, Default)]
pub struct IssueOptions<'a> {
    /// When set, the access token's audience is this client id.
    pub client_id: Option<&'a str>,
    /// Authorization code consumed to obtain the tokens.
    pub auth_code: Option<&'a str>,
}

impl<'a> IssueOptions<'a> {
    pub fn for_client(client_id: &'a str, auth_code: &'a str) -> Self {
        Self {
            client_id: Some(client_id),
            auth_code: Some(auth_code),
        }
    }
}

/// Mints access tokens (signed, self-contained) and refresh tokens (opaque,
/// stored hashed).
#[derive(Clone)]
pub struct TokenIssuer {
    keys: Arc<KeyProvider>,
    store: Arc<dyn Store>,
    issuer: String,
    audience: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(keys: Arc<KeyProvider>, store: Arc<dyn Store>, config: &AuthConfig) -> Self {
        Self {
            keys,
            store,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            access_ttl: config.access_token_ttl,
            refresh_ttl: config.refresh_token_ttl,
        }
    }

    /// Access token lifetime in seconds.
    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    /// Build the claims for `user` as of now.
    pub fn claims_for(&self, user: &User, options: IssueOptions<'_>) -> TokenClaims {
        let now = Utc::now();
        TokenClaims {
            sub: user.id.to_string(),
            role: user.role,
            token_version: user.token_version,
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
            iss: self.issuer.clone(),
            aud: options
                .client_id
                .map(str::to_string)
                .unwrap_or_else(|| self.audience.clone()),
            jti: Uuid::new_v4().to_string(),
            client_id: options.client_id.map(str::to_string),
            auth_code: options.auth_code.map(str::to_string),
        }
    }

    /// Sign an access token for `user` without creating a refresh token.
    pub fn mint_access_token(
        &self,
        user: &User,
        options: IssueOptions<'_>,
    ) -> Result<String, AuthError> {
        self.keys.sign(&self.claims_for(user, options))
    }

    /// Issue a fresh access + refresh token pair.
    ///
    /// Persists exactly one refresh-token row (hash only); the plaintext is
    /// returned here and nowhere else.
    pub async fn issue(
        &self,
        user: &User,
        options: IssueOptions<'_>,
    ) -> Result<TokenPair, AuthError> {
        let access_token = self.mint_access_token(user, options)?;

        let refresh_token = generate_token();
        let expires_at = Utc::now() + self.refresh_ttl;
        self.store
            .store_refresh_token(&hash_token(&refresh_token), user.id, expires_at)
            .await?;

        debug!(
            user_id = %user.id,
            token_version = user.token_version,
            client_id = options.client_id,
            "issued token pair"
        );

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.access_ttl_secs(),
            token_type: "Bearer".to_string(),
        })
    }
}

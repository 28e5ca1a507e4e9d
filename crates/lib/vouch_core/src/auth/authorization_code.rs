//! OAuth2 authorization-code broker.
//!
//! Codes are short-lived, bound to one (user, client) pair and consumed
//! exactly once. Consumption is a conditional delete in the store, so two
//! concurrent exchanges of the same code yield one success and one
//! `InvalidGrant`, and a code is unusable from the moment it is consumed
//! even if token issuance fails afterwards.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use super::AuthError;
use super::clients::ClientRegistry;
use super::issuer::{IssueOptions, TokenIssuer};
use super::tokens::generate_url_safe;
use crate::config::AuthConfig;
use crate::models::auth::TokenPair;
use crate::models::client::AuthorizationCode;
use crate::store::{AuthCodeRepo, Store, UserRepo};

/// Bytes of entropy in an authorization code.
const CODE_BYTES: usize = 32;

#[derive(Clone)]
pub struct AuthorizationCodeBroker {
    store: Arc<dyn Store>,
    clients: ClientRegistry,
    issuer: TokenIssuer,
    code_ttl: Duration,
}

impl AuthorizationCodeBroker {
    pub fn new(
        store: Arc<dyn Store>,
        clients: ClientRegistry,
        issuer: TokenIssuer,
        config: &AuthConfig,
    ) -> Self {
        Self {
            store,
            clients,
            issuer,
            code_ttl: config.auth_code_ttl,
        }
    }

    /// Issue a one-time code for `user_id` on behalf of an active client.
    pub async fn issue_code(&self, user_id: Uuid, client_id: &str) -> Result<String, AuthError> {
        let client = self.clients.find_active(client_id).await?;
        let now = Utc::now();
        let code = AuthorizationCode {
            code: generate_url_safe(CODE_BYTES),
            user_id,
            client_id: client.client_id,
            expires_at: now + self.code_ttl,
            created_at: now,
        };
        self.store.store_auth_code(&code).await?;
        info!(user_id = %user_id, client_id, "issued authorization code");
        Ok(code.code)
    }

    /// Issue a code and build the client redirect carrying it.
    ///
    /// `redirect_uri`, when supplied, must equal the registered one.
    pub async fn authorize_redirect(
        &self,
        user_id: Uuid,
        client_id: &str,
        redirect_uri: Option<&str>,
        state: Option<&str>,
    ) -> Result<String, AuthError> {
        let client = self.clients.find_active(client_id).await?;
        if let Some(uri) = redirect_uri
            && uri != client.redirect_uri
        {
            warn!(client_id, "redirect_uri does not match registration");
            return Err(AuthError::Validation(
                "redirect_uri does not match the registered client".into(),
            ));
        }

        let mut url = Url::parse(&client.redirect_uri)
            .map_err(|e| AuthError::Internal(format!("stored redirect_uri: {e}")))?;
        let code = self.issue_code(user_id, client_id).await?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("code", &code);
            if let Some(state) = state {
                query.append_pair("state", state);
            }
        }
        Ok(url.into())
    }

    /// Exchange a code plus client credentials for tokens scoped to that
    /// client.
    pub async fn exchange(
        &self,
        code: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenPair, AuthError> {
        if code.is_empty() {
            return Err(AuthError::Validation("authorization code is required".into()));
        }
        let client = self.clients.authenticate(client_id, client_secret).await?;

        let stored = self
            .store
            .find_auth_code(code)
            .await?
            .ok_or(AuthError::InvalidGrant)?;
        if stored.client_id != client.client_id {
            warn!(client_id, "authorization code presented by the wrong client");
            return Err(AuthError::InvalidGrant);
        }
        // Left in place for the maintenance sweep.
        if stored.is_expired(Utc::now()) {
            return Err(AuthError::ExpiredGrant);
        }

        if !self.store.consume_auth_code(code, &client.client_id).await? {
            warn!(client_id, "authorization code already consumed");
            return Err(AuthError::InvalidGrant);
        }

        let user = self
            .store
            .find_user_by_id(stored.user_id)
            .await?
            .ok_or(AuthError::InvalidGrant)?;
        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        let pair = self
            .issuer
            .issue(&user, IssueOptions::for_client(&client.client_id, code))
            .await?;
        info!(user_id = %user.id, client_id, "authorization code exchanged");
        Ok(pair)
    }
}

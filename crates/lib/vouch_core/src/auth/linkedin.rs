//! LinkedIn (OpenID Connect) identity provider client.
//!
//! Only the two HTTP legs the callback needs: trading the provider-issued
//! code for an access token, then reading the userinfo profile with it.
//! Every call is bounded by the client timeout and fails as
//! [`AuthError::Upstream`].

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::AuthError;
use crate::config::{env_or, env_parse, non_empty_env};
use crate::models::auth::FederatedProfile;

const AUTHORIZE_URL: &str = "https://www.linkedin.com/oauth/v2/authorization";
const TOKEN_URL: &str = "https://www.linkedin.com/oauth/v2/accessToken";
const USERINFO_URL: &str = "https://api.linkedin.com/v2/userinfo";
const SCOPE: &str = "openid profile email";

/// An upstream OAuth2 identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Where to send the browser, carrying our CSRF `state`.
    fn authorize_url(&self, state: &str) -> Result<String, AuthError>;

    /// Trade the provider-issued code for a verified profile.
    async fn profile_from_code(&self, code: &str) -> Result<FederatedProfile, AuthError>;
}

#[derive(Debug, Clone)]
pub struct LinkedInConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub timeout: Duration,
}

impl LinkedInConfig {
    pub fn new(client_id: &str, client_secret: &str, redirect_uri: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri: redirect_uri.to_string(),
            authorize_url: AUTHORIZE_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            userinfo_url: USERINFO_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    /// `None` when `LINKEDIN_CLIENT_ID` is unset; federated login is then
    /// disabled. A partial configuration is an error.
    pub fn from_env() -> Result<Option<Self>, AuthError> {
        let Some(client_id) = non_empty_env("LINKEDIN_CLIENT_ID") else {
            return Ok(None);
        };
        let client_secret = non_empty_env("LINKEDIN_CLIENT_SECRET").ok_or_else(|| {
            AuthError::Configuration("LINKEDIN_CLIENT_SECRET is required".into())
        })?;
        let redirect_uri = non_empty_env("LINKEDIN_REDIRECT_URI").ok_or_else(|| {
            AuthError::Configuration("LINKEDIN_REDIRECT_URI is required".into())
        })?;

        let mut config = Self::new(&client_id, &client_secret, &redirect_uri);
        config.timeout = Duration::from_secs(env_parse("HTTP_TIMEOUT_SECS", 10u64)?);
        config.authorize_url = env_or("LINKEDIN_AUTHORIZE_URL", AUTHORIZE_URL);
        config.token_url = env_or("LINKEDIN_TOKEN_URL", TOKEN_URL);
        config.userinfo_url = env_or("LINKEDIN_USERINFO_URL", USERINFO_URL);
        Ok(Some(config))
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// OpenID Connect userinfo document.
#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    name: Option<String>,
    picture: Option<String>,
}

pub struct LinkedInClient {
    config: LinkedInConfig,
    http: reqwest::Client,
}

impl LinkedInClient {
    pub fn new(config: LinkedInConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AuthError::Configuration(format!("HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    async fn exchange_code(&self, code: &str) -> Result<String, AuthError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];
        let resp = self
            .http
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::Upstream(format!("token exchange failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(%status, "LinkedIn token endpoint rejected code");
            return Err(AuthError::Upstream(format!(
                "token exchange HTTP {status}: {body}"
            )));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::Upstream(format!("token response parse error: {e}")))?;
        Ok(token.access_token)
    }

    async fn userinfo(&self, access_token: &str) -> Result<UserInfo, AuthError> {
        let resp = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::Upstream(format!("userinfo request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            warn!(%status, "LinkedIn userinfo request failed");
            return Err(AuthError::Upstream(format!("userinfo HTTP {status}")));
        }

        resp.json()
            .await
            .map_err(|e| AuthError::Upstream(format!("userinfo parse error: {e}")))
    }
}

#[async_trait]
impl IdentityProvider for LinkedInClient {
    fn authorize_url(&self, state: &str) -> Result<String, AuthError> {
        let mut url = Url::parse(&self.config.authorize_url)
            .map_err(|e| AuthError::Configuration(format!("LinkedIn authorize URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("scope", SCOPE)
            .append_pair("state", state);
        Ok(url.into())
    }

    async fn profile_from_code(&self, code: &str) -> Result<FederatedProfile, AuthError> {
        if code.is_empty() {
            return Err(AuthError::Validation("provider code is required".into()));
        }
        let access_token = self.exchange_code(code).await?;
        let info = self.userinfo(&access_token).await?;
        debug!("fetched LinkedIn profile");
        Ok(FederatedProfile {
            provider_id: info.sub,
            email: info.email,
            email_verified: info.email_verified,
            name: info.name,
            picture: info.picture,
        })
    }
}

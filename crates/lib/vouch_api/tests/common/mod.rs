//! Shared harness: the full router over an in-memory store.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use tower::ServiceExt;
use vouch_api::config::ApiConfig;
use vouch_api::cors::AllowedOrigins;
use vouch_api::{AppState, router};
use vouch_core::Authority;
use vouch_core::auth::AuthError;
use vouch_core::auth::federated_state::FederatedStateStore;
use vouch_core::auth::keys::KeyProvider;
use vouch_core::auth::linkedin::IdentityProvider;
use vouch_core::auth::password::hash_password;
use vouch_core::models::auth::{FederatedProfile, NewUser, Role, User};
use vouch_core::notify::LogNotifier;
use vouch_core::store::{MemoryStore, UserRepo};

pub const TEST_KEY_PEM: &str = include_str!("../fixtures/test_rsa_key.pem");
pub const PASSWORD: &str = "password1";

/// Identity provider that accepts `good-code` and rejects everything else.
pub struct FakeProvider;

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn authorize_url(&self, state: &str) -> Result<String, AuthError> {
        Ok(format!("https://provider.example/authorize?state={state}"))
    }

    async fn profile_from_code(&self, code: &str) -> Result<FederatedProfile, AuthError> {
        if code != "good-code" {
            return Err(AuthError::Upstream("bad code".into()));
        }
        Ok(FederatedProfile {
            provider_id: "li-42".into(),
            email: Some("ada@example.com".into()),
            email_verified: true,
            name: Some("Ada".into()),
            picture: None,
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub authority: Authority,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(ApiConfig::default(), true)
    }

    pub fn with_config(config: ApiConfig, federated: bool) -> Self {
        let store = Arc::new(MemoryStore::default());
        let keys = Arc::new(KeyProvider::from_pem(&config.auth.key_id, TEST_KEY_PEM).unwrap());
        let authority = Authority::new(store.clone(), keys, &config.auth, Arc::new(LogNotifier));
        let identity_provider: Option<Arc<dyn IdentityProvider>> = if federated {
            Some(Arc::new(FakeProvider))
        } else {
            None
        };
        let state = AppState {
            authority: authority.clone(),
            origins: AllowedOrigins::new(&config.frontend_url),
            config: Arc::new(config),
            federated_states: Arc::new(FederatedStateStore::new()),
            identity_provider,
        };
        Self {
            router: router(state),
            store,
            authority,
        }
    }

    pub async fn user(&self, email: &str, role: Role) -> User {
        self.store
            .create_user(NewUser {
                email: email.into(),
                name: None,
                password_hash: Some(hash_password(PASSWORD).unwrap()),
                role,
                linkedin_id: None,
                profile_picture: None,
            })
            .await
            .unwrap()
    }

    /// Log in through the API and return the access token.
    pub async fn login(&self, email: &str) -> String {
        let (status, body) = self
            .json(
                "POST",
                "/auth/authenticate",
                None,
                Some(serde_json::json!({"email": email, "password": PASSWORD})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["accessToken"].as_str().unwrap().to_string()
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.router.clone().oneshot(req).await.unwrap()
    }

    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let resp = self.request(method, uri, token, body).await;
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}

/// `Location` header of a redirect.
pub fn location(resp: &Response<Body>) -> url::Url {
    let raw = resp.headers()[header::LOCATION].to_str().unwrap();
    url::Url::parse(raw).unwrap()
}

pub fn query_param(url: &url::Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

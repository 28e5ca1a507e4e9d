//! Shared fixtures for unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use uuid::Uuid;

use crate::Authority;
use crate::auth::keys::KeyProvider;
use crate::auth::password::hash_password;
use crate::config::AuthConfig;
use crate::models::auth::{NewUser, Role, TokenClaims, User};
use crate::notify::{Notification, Notifier};
use crate::store::{MemoryStore, UserRepo};

pub const TEST_KEY_PEM: &str = include_str!("../tests/fixtures/test_rsa_key.pem");
pub const OTHER_KEY_PEM: &str = include_str!("../tests/fixtures/other_rsa_key.pem");

/// Collects notifications instead of sending them.
#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    /// Wait until at least `n` notifications arrived (dispatch is spawned).
    pub async fn wait_for(&self, n: usize) -> Vec<Notification> {
        for _ in 0..100 {
            let seen = self.seen.lock().unwrap().clone();
            if seen.len() >= n {
                return seen;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {n} notifications");
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), String> {
        self.seen.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

pub struct TestEnv {
    pub store: Arc<MemoryStore>,
    pub keys: Arc<KeyProvider>,
    pub notifier: Arc<RecordingNotifier>,
    pub authority: Authority,
}

impl TestEnv {
    pub fn config() -> AuthConfig {
        AuthConfig {
            key_id: "test-key".into(),
            ..AuthConfig::default()
        }
    }

    pub fn new() -> Self {
        Self::with_config(Self::config())
    }

    pub fn with_config(config: AuthConfig) -> Self {
        let store = Arc::new(MemoryStore::default());
        let keys = Arc::new(KeyProvider::from_pem(&config.key_id, TEST_KEY_PEM).unwrap());
        let notifier = Arc::new(RecordingNotifier::default());
        let authority = Authority::new(store.clone(), keys.clone(), &config, notifier.clone());
        Self {
            store,
            keys,
            notifier,
            authority,
        }
    }

    async fn create(&self, email: &str, role: Role, password_hash: Option<String>) -> User {
        self.store
            .create_user(NewUser {
                email: email.into(),
                name: None,
                password_hash,
                role,
                linkedin_id: None,
                profile_picture: None,
            })
            .await
            .unwrap()
    }

    pub async fn user(&self, email: &str) -> User {
        self.create(email, Role::User, None).await
    }

    pub async fn admin(&self, email: &str) -> User {
        self.create(email, Role::Admin, None).await
    }

    pub async fn user_with_password(&self, email: &str, password: &str) -> User {
        self.create(email, Role::User, Some(hash_password(password).unwrap()))
            .await
    }

    /// A user whose token version has been bumped to `version`.
    pub async fn user_with_version(&self, email: &str, version: i64) -> User {
        let user = self.user(email).await;
        for _ in 0..version {
            self.store.bump_token_version(user.id).await.unwrap();
        }
        self.store_user(user.id).await
    }

    pub async fn store_user(&self, id: Uuid) -> User {
        self.store.find_user_by_id(id).await.unwrap().unwrap()
    }
}

/// Claims of a token without checking anything.
pub fn decode_unverified(token: &str) -> TokenClaims {
    let payload = token.split('.').nth(1).unwrap();
    serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap()
}

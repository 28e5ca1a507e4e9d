//! Repository interfaces over the durable store.
//!
//! One trait per entity. [`Store`] bundles them so callers can hold a single
//! `Arc<dyn Store>`. Two implementations ship: [`pg::PgStore`] for
//! PostgreSQL and [`memory::MemoryStore`] for tests and local development.
//! Both give the same atomicity guarantees for token-version bumps and
//! authorization-code consumption.

pub mod memory;
pub mod pg;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::auth::{BlacklistedToken, NewUser, RefreshTokenRecord, Role, User};
use crate::models::client::{AuthorizationCode, Client, ClientStatus, NewClient};

pub use memory::MemoryStore;
pub use pg::{PgStore, connect_options};

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Result type for repository operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Principals.
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User>;

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Lookup by (already normalised) email.
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_user_by_linkedin_id(&self, linkedin_id: &str) -> StoreResult<Option<User>>;

    /// Attach a LinkedIn identity to an existing account.
    async fn link_linkedin(
        &self,
        id: Uuid,
        linkedin_id: &str,
        profile_picture: Option<&str>,
    ) -> StoreResult<Option<User>>;

    async fn list_users(&self) -> StoreResult<Vec<User>>;

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<bool>;

    /// Change the role and bump the token version in one write.
    async fn set_role(&self, id: Uuid, role: Role) -> StoreResult<Option<User>>;

    /// Set the active flag. Deactivating an active user bumps the token
    /// version in the same write.
    async fn set_status(
        &self,
        id: Uuid,
        is_active: bool,
        status_reason: Option<&str>,
    ) -> StoreResult<Option<User>>;

    /// Make the user an active admin and bump the token version in one write.
    async fn promote_admin(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Atomically increment the user's token version, returning the new value.
    async fn bump_token_version(&self, id: Uuid) -> StoreResult<Option<i64>>;

    async fn active_admin_exists(&self) -> StoreResult<bool>;
}

/// Hashed refresh tokens.
#[async_trait]
pub trait RefreshTokenRepo: Send + Sync {
    async fn store_refresh_token(
        &self,
        token_hash: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Find a non-revoked, non-expired refresh token by hash.
    async fn find_valid_refresh_token(
        &self,
        token_hash: &str,
    ) -> StoreResult<Option<RefreshTokenRecord>>;

    /// Revoke by id. Returns `false` if the token was already revoked, so
    /// that only one concurrent rotation wins.
    async fn revoke_refresh_token(&self, id: Uuid) -> StoreResult<bool>;

    async fn revoke_refresh_token_by_hash(&self, token_hash: &str) -> StoreResult<()>;

    /// Revoke every live refresh token for a user, returning how many.
    async fn revoke_all_refresh_tokens(&self, user_id: Uuid) -> StoreResult<u64>;

    async fn purge_expired_refresh_tokens(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

/// Individually revoked access tokens.
#[async_trait]
pub trait BlacklistRepo: Send + Sync {
    /// Idempotent: blacklisting the same token twice is not an error.
    async fn blacklist_token(&self, entry: BlacklistedToken) -> StoreResult<()>;

    async fn is_blacklisted(&self, token_hash: &str) -> StoreResult<bool>;

    async fn purge_expired_blacklist(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

/// Third-party clients.
#[async_trait]
pub trait ClientRepo: Send + Sync {
    async fn create_client(&self, new_client: NewClient) -> StoreResult<Client>;

    async fn find_client(&self, client_id: &str) -> StoreResult<Option<Client>>;

    async fn list_clients(&self) -> StoreResult<Vec<Client>>;

    async fn set_client_status(
        &self,
        client_id: &str,
        status: ClientStatus,
    ) -> StoreResult<Option<Client>>;
}

/// One-time authorization codes.
#[async_trait]
pub trait AuthCodeRepo: Send + Sync {
    async fn store_auth_code(&self, code: &AuthorizationCode) -> StoreResult<()>;

    async fn find_auth_code(&self, code: &str) -> StoreResult<Option<AuthorizationCode>>;

    /// Delete the code if it is still bound to `client_id`. Returns `true`
    /// for exactly one caller per code.
    async fn consume_auth_code(&self, code: &str, client_id: &str) -> StoreResult<bool>;

    async fn purge_expired_auth_codes(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

/// Every repository the authority needs.
pub trait Store: UserRepo + RefreshTokenRepo + BlacklistRepo + ClientRepo + AuthCodeRepo {}

impl<T> Store for T where T: UserRepo + RefreshTokenRepo + BlacklistRepo + ClientRepo + AuthCodeRepo
{}

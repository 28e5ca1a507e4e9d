//! In-memory store backed by `DashMap`.
//!
//! Unique indexes (email, LinkedIn id, client name) are kept in side maps and
//! claimed through the entry API so concurrent inserts see the same conflicts
//! PostgreSQL would report. No map guard is held across an `.await`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use super::{
    AuthCodeRepo, BlacklistRepo, ClientRepo, RefreshTokenRepo, StoreError, StoreResult, UserRepo,
};
use crate::models::auth::{BlacklistedToken, NewUser, RefreshTokenRecord, Role, User};
use crate::models::client::{AuthorizationCode, Client, ClientStatus, NewClient};

/// Volatile store for tests and local development.
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<Uuid, User>,
    emails: DashMap<String, Uuid>,
    linkedin_ids: DashMap<String, Uuid>,
    refresh_tokens: DashMap<Uuid, RefreshTokenRecord>,
    refresh_by_hash: DashMap<String, Uuid>,
    blacklist: DashMap<String, BlacklistedToken>,
    clients: DashMap<String, Client>,
    client_names: DashMap<String, String>,
    auth_codes: DashMap<String, AuthorizationCode>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn update_user<F>(&self, id: Uuid, f: F) -> Option<User>
    where
        F: FnOnce(&mut User),
    {
        self.users.get_mut(&id).map(|mut user| {
            f(user.value_mut());
            user.updated_at = Utc::now();
            user.clone()
        })
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        let id = Uuid::now_v7();
        let now = Utc::now();

        let email_slot = match self.emails.entry(new_user.email.clone()) {
            Entry::Occupied(_) => {
                return Err(StoreError::Conflict(format!(
                    "email '{}' is already registered",
                    new_user.email
                )));
            }
            Entry::Vacant(slot) => slot,
        };
        if let Some(linkedin_id) = &new_user.linkedin_id {
            match self.linkedin_ids.entry(linkedin_id.clone()) {
                Entry::Occupied(_) => {
                    return Err(StoreError::Conflict(
                        "LinkedIn account is already linked".into(),
                    ));
                }
                Entry::Vacant(slot) => {
                    slot.insert(id);
                }
            }
        }
        email_slot.insert(id);

        let user = User {
            id,
            email: new_user.email,
            name: new_user.name,
            password_hash: new_user.password_hash,
            role: new_user.role,
            is_active: true,
            status_reason: None,
            token_version: 0,
            linkedin_id: new_user.linkedin_id,
            profile_picture: new_user.profile_picture,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let id = self.emails.get(email).map(|id| *id);
        Ok(id.and_then(|id| self.users.get(&id).map(|u| u.clone())))
    }

    async fn find_user_by_linkedin_id(&self, linkedin_id: &str) -> StoreResult<Option<User>> {
        let id = self.linkedin_ids.get(linkedin_id).map(|id| *id);
        Ok(id.and_then(|id| self.users.get(&id).map(|u| u.clone())))
    }

    async fn link_linkedin(
        &self,
        id: Uuid,
        linkedin_id: &str,
        profile_picture: Option<&str>,
    ) -> StoreResult<Option<User>> {
        if !self.users.contains_key(&id) {
            return Ok(None);
        }
        match self.linkedin_ids.entry(linkedin_id.to_string()) {
            Entry::Occupied(existing) if *existing.get() != id => {
                return Err(StoreError::Conflict(
                    "LinkedIn account is already linked".into(),
                ));
            }
            Entry::Occupied(_) => {}
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }
        Ok(self.update_user(id, |user| {
            user.linkedin_id = Some(linkedin_id.to_string());
            if let Some(picture) = profile_picture {
                user.profile_picture = Some(picture.to_string());
            }
        }))
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.users.iter().map(|u| u.clone()).collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<bool> {
        Ok(self
            .update_user(id, |user| user.password_hash = Some(password_hash.to_string()))
            .is_some())
    }

    async fn set_role(&self, id: Uuid, role: Role) -> StoreResult<Option<User>> {
        Ok(self.update_user(id, |user| {
            user.role = role;
            user.token_version += 1;
        }))
    }

    async fn set_status(
        &self,
        id: Uuid,
        is_active: bool,
        status_reason: Option<&str>,
    ) -> StoreResult<Option<User>> {
        Ok(self.update_user(id, |user| {
            if user.is_active && !is_active {
                user.token_version += 1;
            }
            user.is_active = is_active;
            user.status_reason = status_reason.map(str::to_string);
        }))
    }

    async fn promote_admin(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.update_user(id, |user| {
            user.role = Role::Admin;
            user.is_active = true;
            user.status_reason = None;
            user.token_version += 1;
        }))
    }

    async fn bump_token_version(&self, id: Uuid) -> StoreResult<Option<i64>> {
        Ok(self
            .update_user(id, |user| user.token_version += 1)
            .map(|user| user.token_version))
    }

    async fn active_admin_exists(&self) -> StoreResult<bool> {
        Ok(self
            .users
            .iter()
            .any(|u| u.role == Role::Admin && u.is_active))
    }
}

#[async_trait]
impl RefreshTokenRepo for MemoryStore {
    async fn store_refresh_token(
        &self,
        token_hash: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let id = Uuid::now_v7();
        match self.refresh_by_hash.entry(token_hash.to_string()) {
            Entry::Occupied(_) => {
                return Err(StoreError::Conflict("refresh token already stored".into()));
            }
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }
        self.refresh_tokens.insert(
            id,
            RefreshTokenRecord {
                id,
                user_id,
                token_hash: token_hash.to_string(),
                revoked: false,
                expires_at,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn find_valid_refresh_token(
        &self,
        token_hash: &str,
    ) -> StoreResult<Option<RefreshTokenRecord>> {
        let Some(id) = self.refresh_by_hash.get(token_hash).map(|id| *id) else {
            return Ok(None);
        };
        let now = Utc::now();
        Ok(self
            .refresh_tokens
            .get(&id)
            .filter(|r| !r.revoked && r.expires_at > now)
            .map(|r| r.clone()))
    }

    async fn revoke_refresh_token(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self
            .refresh_tokens
            .get_mut(&id)
            .map(|mut record| !std::mem::replace(&mut record.revoked, true))
            .unwrap_or(false))
    }

    async fn revoke_refresh_token_by_hash(&self, token_hash: &str) -> StoreResult<()> {
        if let Some(id) = self.refresh_by_hash.get(token_hash).map(|id| *id) {
            self.revoke_refresh_token(id).await?;
        }
        Ok(())
    }

    async fn revoke_all_refresh_tokens(&self, user_id: Uuid) -> StoreResult<u64> {
        let mut revoked = 0;
        for mut record in self.refresh_tokens.iter_mut() {
            if record.user_id == user_id && !record.revoked {
                record.revoked = true;
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn purge_expired_refresh_tokens(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let expired: Vec<(Uuid, String)> = self
            .refresh_tokens
            .iter()
            .filter(|r| r.expires_at <= now)
            .map(|r| (r.id, r.token_hash.clone()))
            .collect();
        for (id, hash) in &expired {
            self.refresh_tokens.remove(id);
            self.refresh_by_hash.remove(hash);
        }
        Ok(expired.len() as u64)
    }
}

#[async_trait]
impl BlacklistRepo for MemoryStore {
    async fn blacklist_token(&self, entry: BlacklistedToken) -> StoreResult<()> {
        self.blacklist.entry(entry.token_hash.clone()).or_insert(entry);
        Ok(())
    }

    async fn is_blacklisted(&self, token_hash: &str) -> StoreResult<bool> {
        Ok(self.blacklist.contains_key(token_hash))
    }

    async fn purge_expired_blacklist(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let before = self.blacklist.len();
        self.blacklist.retain(|_, entry| entry.expires_at > now);
        Ok(before.saturating_sub(self.blacklist.len()) as u64)
    }
}

#[async_trait]
impl ClientRepo for MemoryStore {
    async fn create_client(&self, new_client: NewClient) -> StoreResult<Client> {
        let name_slot = match self.client_names.entry(new_client.name.clone()) {
            Entry::Occupied(_) => {
                return Err(StoreError::Conflict(format!(
                    "client name '{}' is already taken",
                    new_client.name
                )));
            }
            Entry::Vacant(slot) => slot,
        };
        let client = Client {
            id: Uuid::now_v7(),
            client_id: new_client.client_id,
            name: new_client.name,
            client_secret_hash: new_client.client_secret_hash,
            redirect_uri: new_client.redirect_uri,
            allowed_origins: new_client.allowed_origins,
            status: ClientStatus::Active,
            created_at: Utc::now(),
        };
        match self.clients.entry(client.client_id.clone()) {
            Entry::Occupied(_) => {
                return Err(StoreError::Conflict(format!(
                    "client id '{}' is already taken",
                    client.client_id
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(client.clone());
            }
        }
        name_slot.insert(client.client_id.clone());
        Ok(client)
    }

    async fn find_client(&self, client_id: &str) -> StoreResult<Option<Client>> {
        Ok(self.clients.get(client_id).map(|c| c.clone()))
    }

    async fn list_clients(&self) -> StoreResult<Vec<Client>> {
        let mut clients: Vec<Client> = self.clients.iter().map(|c| c.clone()).collect();
        clients.sort_by_key(|c| c.created_at);
        Ok(clients)
    }

    async fn set_client_status(
        &self,
        client_id: &str,
        status: ClientStatus,
    ) -> StoreResult<Option<Client>> {
        Ok(self.clients.get_mut(client_id).map(|mut client| {
            client.status = status;
            client.clone()
        }))
    }
}

#[async_trait]
impl AuthCodeRepo for MemoryStore {
    async fn store_auth_code(&self, code: &AuthorizationCode) -> StoreResult<()> {
        match self.auth_codes.entry(code.code.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict("authorization code collision".into())),
            Entry::Vacant(slot) => {
                slot.insert(code.clone());
                Ok(())
            }
        }
    }

    async fn find_auth_code(&self, code: &str) -> StoreResult<Option<AuthorizationCode>> {
        Ok(self.auth_codes.get(code).map(|c| c.clone()))
    }

    async fn consume_auth_code(&self, code: &str, client_id: &str) -> StoreResult<bool> {
        Ok(self
            .auth_codes
            .remove_if(code, |_, stored| stored.client_id == client_id)
            .is_some())
    }

    async fn purge_expired_auth_codes(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let before = self.auth_codes.len();
        self.auth_codes.retain(|_, code| !code.is_expired(now));
        Ok(before.saturating_sub(self.auth_codes.len()) as u64)
    }
}

//! Account lifecycle: registration, refresh rotation, password change and
//! the admin-driven role and status changes.
//!
//! Every mass-invalidation event goes through [`RevocationRegistry`] so the
//! token version moves forward, and the account holder is notified after
//! the change has committed.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::AuthError;
use super::authenticator::normalize_email;
use super::issuer::{IssueOptions, TokenIssuer};
use super::password::{hash_password_blocking, validate_password, verify_password_blocking};
use super::revocation::RevocationRegistry;
use super::tokens::hash_token;
use crate::models::auth::{NewUser, Principal, Role, TokenPair, User};
use crate::notify::{Notification, Notifier, dispatch};
use crate::store::{RefreshTokenRepo, Store, UserRepo};

/// Input for self-service registration.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
    issuer: TokenIssuer,
    revocation: RevocationRegistry,
    notifier: Arc<dyn Notifier>,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn Store>,
        issuer: TokenIssuer,
        revocation: RevocationRegistry,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            issuer,
            revocation,
            notifier,
        }
    }

    /// Create a password account and log it in.
    pub async fn register(&self, registration: Registration) -> Result<(User, TokenPair), AuthError> {
        let email = normalize_email(&registration.email);
        validate_email(&email)?;
        validate_password(&registration.password)?;
        let password_hash = hash_password_blocking(&registration.password).await?;

        let user = self
            .store
            .create_user(NewUser {
                email,
                name: registration
                    .name
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty()),
                password_hash: Some(password_hash),
                role: Role::User,
                linkedin_id: None,
                profile_picture: None,
            })
            .await?;
        info!(user_id = %user.id, "registered account");

        let tokens = self.issuer.issue(&user, IssueOptions::default()).await?;
        Ok((user, tokens))
    }

    /// Trade a refresh token for a new pair. The presented token is revoked,
    /// so each refresh token works once.
    pub async fn refresh(&self, raw_refresh_token: &str) -> Result<TokenPair, AuthError> {
        let record = self
            .store
            .find_valid_refresh_token(&hash_token(raw_refresh_token))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if !self.store.revoke_refresh_token(record.id).await? {
            warn!(user_id = %record.user_id, "refresh token already rotated");
            return Err(AuthError::InvalidCredentials);
        }

        let user = self
            .store
            .find_user_by_id(record.user_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }
        self.issuer.issue(&user, IssueOptions::default()).await
    }

    /// Change the caller's own password. Every other session ends.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let user = self.get_user(user_id).await?;
        let Some(hash) = user.password_hash.as_deref() else {
            return Err(AuthError::Validation("account has no local password".into()));
        };
        if !verify_password_blocking(current_password, hash).await? {
            warn!(user_id = %user_id, "password change with wrong current password");
            return Err(AuthError::InvalidCredentials);
        }
        validate_password(new_password)?;

        let new_hash = hash_password_blocking(new_password).await?;
        if !self.store.update_password_hash(user_id, &new_hash).await? {
            return Err(AuthError::UserNotFound);
        }
        self.revocation.logout_all(user_id).await?;
        info!(user_id = %user_id, "password changed");

        dispatch(
            &self.notifier,
            Notification::PasswordChanged {
                user_id,
                email: user.email,
            },
        );
        Ok(())
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<User, AuthError> {
        self.store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AuthError> {
        Ok(self.store.list_users().await?)
    }

    /// Change another user's role. A real change bumps the token version so
    /// tokens carrying the old role stop verifying.
    pub async fn set_role(
        &self,
        actor: &Principal,
        target: Uuid,
        role: Role,
    ) -> Result<User, AuthError> {
        if actor.id == target {
            return Err(AuthError::Forbidden("cannot change your own role".into()));
        }
        let current = self.get_user(target).await?;
        if current.role == role {
            return Ok(current);
        }

        let user = self
            .store
            .set_role(target, role)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        info!(
            actor = %actor.id,
            user_id = %target,
            role = %role,
            token_version = user.token_version,
            "role changed"
        );

        dispatch(
            &self.notifier,
            Notification::RoleChanged {
                user_id: target,
                email: user.email.clone(),
                role,
            },
        );
        Ok(user)
    }

    /// Activate or deactivate another user. Deactivation logs the user out
    /// everywhere.
    pub async fn set_status(
        &self,
        actor: &Principal,
        target: Uuid,
        is_active: bool,
        reason: Option<&str>,
    ) -> Result<User, AuthError> {
        if actor.id == target {
            return Err(AuthError::Forbidden("cannot change your own status".into()));
        }
        let before = self.get_user(target).await?;

        let user = self
            .store
            .set_status(target, is_active, reason)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if before.is_active && !is_active {
            let revoked = self.store.revoke_all_refresh_tokens(target).await?;
            debug!(user_id = %target, revoked, "refresh tokens revoked on deactivation");
        }
        info!(actor = %actor.id, user_id = %target, is_active, "status changed");

        if before.is_active != is_active {
            dispatch(
                &self.notifier,
                Notification::StatusChanged {
                    user_id: target,
                    email: user.email.clone(),
                    is_active,
                    reason: reason.map(str::to_string),
                },
            );
        }
        Ok(user)
    }
}

fn validate_email(email: &str) -> Result<(), AuthError> {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if valid {
        Ok(())
    } else {
        Err(AuthError::Validation("a valid email is required".into()))
    }
}

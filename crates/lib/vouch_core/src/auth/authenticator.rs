//! Credential authenticators.
//!
//! Two explicit variants behind one trait: [`PasswordAuthenticator`] for
//! email + password and [`FederatedAuthenticator`] for a profile already
//! verified by an upstream identity provider. Routes pick one directly.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::AuthError;
use super::password::{verify_dummy_password, verify_password_blocking};
use crate::models::auth::{FederatedProfile, NewUser, Role, User};
use crate::store::{Store, UserRepo};

/// Resolve some credentials to a principal.
#[async_trait]
pub trait Authenticator: Send + Sync {
    type Credentials: Send + Sync;

    async fn authenticate(&self, credentials: &Self::Credentials) -> Result<User, AuthError>;
}

/// Emails are compared case-insensitively and without surrounding blanks.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Clone)]
pub struct PasswordCredentials {
    pub email: String,
    pub password: String,
}

/// Email + password login.
///
/// An unknown email yields [`AuthError::UserNotFound`] and a wrong password
/// [`AuthError::InvalidCredentials`]; the HTTP layer decides whether the
/// distinction is exposed. The active flag is only checked after the
/// password, so a disabled account does not reveal itself to a guesser.
#[derive(Clone)]
pub struct PasswordAuthenticator {
    store: Arc<dyn Store>,
}

impl PasswordAuthenticator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Authenticator for PasswordAuthenticator {
    type Credentials = PasswordCredentials;

    async fn authenticate(&self, credentials: &PasswordCredentials) -> Result<User, AuthError> {
        let email = normalize_email(&credentials.email);
        let Some(user) = self.store.find_user_by_email(&email).await? else {
            debug!("password login for unknown email");
            verify_dummy_password(&credentials.password).await;
            return Err(AuthError::UserNotFound);
        };

        // Federated-only accounts have no password to compare against.
        let Some(hash) = user.password_hash.as_deref() else {
            debug!(user_id = %user.id, "password login for federated-only account");
            verify_dummy_password(&credentials.password).await;
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password_blocking(&credentials.password, hash).await? {
            warn!(user_id = %user.id, "password mismatch");
            return Err(AuthError::InvalidCredentials);
        }
        if !user.is_active {
            warn!(user_id = %user.id, "login attempt on disabled account");
            return Err(AuthError::AccountDisabled);
        }
        Ok(user)
    }
}

/// Find-or-create a principal from a verified federated profile.
///
/// Lookup order: by provider id, then by email (linking the provider id to
/// the existing account), then create. The last two require the provider to
/// have verified the email. A concurrent first login for the
/// same identity loses the insert race with `Conflict` and is retried once
/// as a lookup.
#[derive(Clone)]
pub struct FederatedAuthenticator {
    store: Arc<dyn Store>,
}

impl FederatedAuthenticator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn resolve(&self, profile: &FederatedProfile, email: &str) -> Result<User, AuthError> {
        if let Some(user) = self
            .store
            .find_user_by_linkedin_id(&profile.provider_id)
            .await?
        {
            return Ok(user);
        }

        // Linking or creating by email needs a verified address.
        if !profile.email_verified {
            warn!("federated profile email is not verified");
            return Err(AuthError::Forbidden(
                "email address not verified by the identity provider".into(),
            ));
        }

        if let Some(existing) = self.store.find_user_by_email(email).await? {
            let linked = self
                .store
                .link_linkedin(existing.id, &profile.provider_id, profile.picture.as_deref())
                .await?
                .ok_or(AuthError::UserNotFound)?;
            info!(user_id = %linked.id, "linked federated identity to existing account");
            return Ok(linked);
        }

        let user = self
            .store
            .create_user(NewUser {
                email: email.to_string(),
                name: profile.name.clone(),
                password_hash: None,
                role: Role::User,
                linkedin_id: Some(profile.provider_id.clone()),
                profile_picture: profile.picture.clone(),
            })
            .await?;
        info!(user_id = %user.id, "created account from federated profile");
        Ok(user)
    }
}

#[async_trait]
impl Authenticator for FederatedAuthenticator {
    type Credentials = FederatedProfile;

    async fn authenticate(&self, profile: &FederatedProfile) -> Result<User, AuthError> {
        if profile.provider_id.trim().is_empty() {
            return Err(AuthError::Upstream("profile has no subject".into()));
        }
        let email = profile
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AuthError::Upstream("profile has no email".into()))?;

        let user = match self.resolve(profile, &email).await {
            Err(AuthError::Conflict(_)) => self.resolve(profile, &email).await?,
            other => other?,
        };
        if !user.is_active {
            warn!(user_id = %user.id, "federated login on disabled account");
            return Err(AuthError::AccountDisabled);
        }
        Ok(user)
    }
}

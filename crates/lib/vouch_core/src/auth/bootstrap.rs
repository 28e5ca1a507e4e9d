//! Startup reconciliation guaranteeing at least one active admin.
//!
//! Called once by the entry point (or the CLI). Running it again is a
//! no-op as long as an active admin exists.

use tracing::info;
use uuid::Uuid;

use super::AuthError;
use super::authenticator::normalize_email;
use super::password::{hash_password_blocking, validate_password};
use crate::config::BootstrapAdmin;
use crate::models::auth::{NewUser, Role};
use crate::store::{Store, UserRepo};

/// What [`ensure_bootstrap_admin`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// An active admin already existed; nothing changed.
    AlreadyPresent,
    /// The configured account existed and was made an active admin.
    Promoted(Uuid),
    /// The configured account was created as an admin.
    Created(Uuid),
}

pub async fn ensure_bootstrap_admin(
    store: &dyn Store,
    admin: &BootstrapAdmin,
) -> Result<BootstrapOutcome, AuthError> {
    if store.active_admin_exists().await? {
        return Ok(BootstrapOutcome::AlreadyPresent);
    }

    let email = normalize_email(&admin.email);
    if let Some(existing) = store.find_user_by_email(&email).await? {
        store
            .promote_admin(existing.id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        info!(user_id = %existing.id, "promoted bootstrap admin");
        return Ok(BootstrapOutcome::Promoted(existing.id));
    }

    validate_password(&admin.password)?;
    let password_hash = hash_password_blocking(&admin.password).await?;
    let user = store
        .create_user(NewUser {
            email,
            name: admin.name.clone(),
            password_hash: Some(password_hash),
            role: Role::Admin,
            linkedin_id: None,
            profile_picture: None,
        })
        .await?;
    info!(user_id = %user.id, "created bootstrap admin");
    Ok(BootstrapOutcome::Created(user.id))
}

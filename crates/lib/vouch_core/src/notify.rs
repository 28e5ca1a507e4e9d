//! Account notifications.
//!
//! State changes that the account holder should hear about are handed to a
//! [`Notifier`] after they commit. Delivery is fire-and-forget: a failed
//! notification is logged and never undoes the change it reports.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::auth::Role;

/// Something that happened to an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    RoleChanged {
        user_id: Uuid,
        email: String,
        role: Role,
    },
    StatusChanged {
        user_id: Uuid,
        email: String,
        is_active: bool,
        reason: Option<String>,
    },
    PasswordChanged {
        user_id: Uuid,
        email: String,
    },
}

impl Notification {
    pub fn user_id(&self) -> Uuid {
        match self {
            Notification::RoleChanged { user_id, .. }
            | Notification::StatusChanged { user_id, .. }
            | Notification::PasswordChanged { user_id, .. } => *user_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Notification::RoleChanged { .. } => "role_changed",
            Notification::StatusChanged { .. } => "status_changed",
            Notification::PasswordChanged { .. } => "password_changed",
        }
    }
}

/// Notification sink.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), String>;
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), String> {
        info!(
            user_id = %notification.user_id(),
            kind = notification.kind(),
            "account notification"
        );
        Ok(())
    }
}

/// Deliver `notification` in the background, logging failure.
pub fn dispatch(notifier: &Arc<dyn Notifier>, notification: Notification) {
    let notifier = Arc::clone(notifier);
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(&notification).await {
            warn!(
                user_id = %notification.user_id(),
                kind = notification.kind(),
                error = %e,
                "notification delivery failed"
            );
        }
    });
}

//! CSRF state for the federated (LinkedIn) login round trip.
//!
//! A state value is minted when the browser is sent to the provider and
//! must come back on the callback. Each value is single-use and expires
//! after ten minutes. When the login was started on behalf of a client the
//! pending entry also remembers where to send the authorization code.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::tokens::generate_url_safe;

/// Lifetime of a pending state entry.
const STATE_TTL: Duration = Duration::from_secs(600);

/// Entropy of a state value in bytes.
const STATE_BYTES: usize = 24;

/// Client context carried through a federated login.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FederatedContext {
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    /// Opaque state supplied by the client, echoed back on its redirect.
    pub client_state: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PendingFederatedLogin {
    pub context: FederatedContext,
    pub created_at: Instant,
}

/// In-memory store of pending federated logins keyed by state value.
pub struct FederatedStateStore {
    states: DashMap<String, PendingFederatedLogin>,
    ttl: Duration,
}

impl FederatedStateStore {
    pub fn new() -> Self {
        Self::with_ttl(STATE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            states: DashMap::new(),
            ttl,
        }
    }

    /// Mint a fresh state value and remember `context` under it.
    pub fn begin(&self, context: FederatedContext) -> String {
        let state = generate_url_safe(STATE_BYTES);
        self.states.insert(
            state.clone(),
            PendingFederatedLogin {
                context,
                created_at: Instant::now(),
            },
        );
        state
    }

    /// Take (remove and return) a pending entry.
    /// Returns `None` if not found or expired.
    pub fn take(&self, state: &str) -> Option<PendingFederatedLogin> {
        let (_, pending) = self.states.remove(state)?;
        if pending.created_at.elapsed() > self.ttl {
            return None;
        }
        Some(pending)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Evict expired entries.
    pub fn cleanup(&self) {
        let ttl = self.ttl;
        self.states.retain(|_, v| v.created_at.elapsed() <= ttl);
    }

    /// Spawn a periodic cleanup task.
    pub fn spawn_cleanup_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                store.cleanup();
            }
        })
    }
}

impl Default for FederatedStateStore {
    fn default() -> Self {
        Self::new()
    }
}

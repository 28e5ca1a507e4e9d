//! Periodic purge of rows past their expiry.
//!
//! Expired blacklist entries, authorization codes and refresh tokens are
//! already rejected on read; the sweep only bounds storage growth.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::store::{AuthCodeRepo, BlacklistRepo, RefreshTokenRepo, Store, StoreResult};

/// Rows deleted by one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub blacklist: u64,
    pub auth_codes: u64,
    pub refresh_tokens: u64,
}

impl SweepReport {
    pub fn total(&self) -> u64 {
        self.blacklist + self.auth_codes + self.refresh_tokens
    }
}

/// Delete everything that expired at or before `now`.
pub async fn sweep(store: &dyn Store, now: DateTime<Utc>) -> StoreResult<SweepReport> {
    let report = SweepReport {
        blacklist: store.purge_expired_blacklist(now).await?,
        auth_codes: store.purge_expired_auth_codes(now).await?,
        refresh_tokens: store.purge_expired_refresh_tokens(now).await?,
    };
    info!(
        blacklist = report.blacklist,
        auth_codes = report.auth_codes,
        refresh_tokens = report.refresh_tokens,
        "maintenance sweep complete"
    );
    Ok(report)
}

/// Run [`sweep`] every `period`. Failures are logged and retried next tick.
pub fn spawn_sweep_task(store: Arc<dyn Store>, period: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            if let Err(e) = sweep(store.as_ref(), Utc::now()).await {
                error!(error = %e, "maintenance sweep failed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use super::*;
    use crate::models::auth::BlacklistedToken;
    use crate::models::client::AuthorizationCode;
    use crate::store::{AuthCodeRepo, BlacklistRepo, RefreshTokenRepo};
    use crate::test_support::TestEnv;

    #[tokio::test]
    async fn sweep_removes_only_expired_rows() {
        let env = TestEnv::new();
        let user = env.user("a@example.com").await;
        let client = env
            .authority
            .clients
            .register("Acme", "https://acme.example/cb", vec![])
            .await
            .unwrap();
        let now = Utc::now();
        let past = now - ChronoDuration::minutes(1);
        let future = now + ChronoDuration::minutes(10);

        for (hash, expires_at) in [("old", past), ("live", future)] {
            env.store
                .blacklist_token(BlacklistedToken {
                    token_hash: hash.into(),
                    user_id: user.id,
                    expires_at,
                    device_label: None,
                })
                .await
                .unwrap();
            env.store
                .store_refresh_token(hash, user.id, expires_at)
                .await
                .unwrap();
            env.store
                .store_auth_code(&AuthorizationCode {
                    code: hash.into(),
                    user_id: user.id,
                    client_id: client.client.client_id.clone(),
                    expires_at,
                    created_at: now,
                })
                .await
                .unwrap();
        }

        let report = sweep(env.store.as_ref(), now).await.unwrap();
        assert_eq!(
            report,
            SweepReport {
                blacklist: 1,
                auth_codes: 1,
                refresh_tokens: 1
            }
        );
        assert!(env.store.is_blacklisted("live").await.unwrap());
        assert!(!env.store.is_blacklisted("old").await.unwrap());
        assert!(env.store.find_auth_code("live").await.unwrap().is_some());

        let again = sweep(env.store.as_ref(), now).await.unwrap();
        assert_eq!(again.total(), 0);
    }
}

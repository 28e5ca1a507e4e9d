//! CORS allow-list built from the frontend URL and the origins registered by
//! active clients.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use axum::http::HeaderValue;
use axum::http::request::Parts;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{debug, warn};
use vouch_core::auth::clients::{ClientRegistry, origin_of};

/// Origins allowed to call the API from a browser.
///
/// Cloned handles share one set; [`AllowedOrigins::reload`] swaps it after
/// client registrations change.
#[derive(Clone, Default)]
pub struct AllowedOrigins {
    frontend: Option<String>,
    clients: Arc<RwLock<HashSet<String>>>,
}

impl AllowedOrigins {
    pub fn new(frontend_url: &str) -> Self {
        Self {
            frontend: origin_of(frontend_url),
            clients: Arc::default(),
        }
    }

    pub fn allows(&self, origin: &str) -> bool {
        if self.frontend.as_deref() == Some(origin) {
            return true;
        }
        self.clients
            .read()
            .map(|set| set.contains(origin))
            .unwrap_or(false)
    }

    /// Re-read active client origins. On failure the previous set is kept.
    pub async fn reload(&self, registry: &ClientRegistry) {
        match registry.allowed_origins().await {
            Ok(origins) => {
                debug!(count = origins.len(), "client origins reloaded");
                if let Ok(mut set) = self.clients.write() {
                    *set = origins;
                }
            }
            Err(e) => warn!(error = %e, "could not reload client origins"),
        }
    }

    pub fn layer(&self) -> CorsLayer {
        let origins = self.clone();
        CorsLayer::new()
            .allow_origin(AllowOrigin::predicate(
                move |origin: &HeaderValue, _: &Parts| {
                    origin.to_str().is_ok_and(|o| origins.allows(o))
                },
            ))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontend_origin_is_always_allowed() {
        let origins = AllowedOrigins::new("http://localhost:3000/app");
        assert!(origins.allows("http://localhost:3000"));
        assert!(!origins.allows("http://localhost:3001"));
    }
}

//! # vouch_core
//!
//! Token and session authority for Vouch: key material, token issuance and
//! verification, revocation, the OAuth2 authorization-code broker, and the
//! credential authenticators that sit in front of them.

pub mod auth;
pub mod authority;
pub mod config;
pub mod maintenance;
pub mod migrate;
pub mod models;
pub mod notify;
pub mod store;

pub use authority::Authority;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
pub(crate) mod test_support;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}

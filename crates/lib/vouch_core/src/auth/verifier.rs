//! Access token verification.
//!
//! Checks run in a fixed order and stop at the first failure: signature and
//! algorithm, expiry/issuer/audience, blacklist, principal lookup, token
//! version.

use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Validation, decode, decode_header};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::AuthError;
use super::keys::{KeyProvider, SIGNING_ALGORITHM};
use super::tokens::hash_token;
use crate::config::AuthConfig;
use crate::models::auth::{Principal, TokenClaims, User};
use crate::store::{BlacklistRepo, Store, UserRepo};

/// Which audiences a verification accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudiencePolicy {
    /// Only first-party tokens (`aud` = server audience).
    Server,
    /// First-party tokens or client-delegated tokens whose `aud` equals
    /// their own `client_id` claim.
    ServerOrDelegated,
}

/// A token that passed every check.
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub principal: Principal,
    pub claims: TokenClaims,
    pub user: User,
}

/// Introspection answer. Inactive tokens carry no claims.
#[derive(Debug, Clone, Serialize)]
pub struct Introspection {
    pub active: bool,
    #[serde(flatten)]
    pub claims: Option<TokenClaims>,
}

/// Validates access tokens and resolves the trusted principal.
#[derive(Clone)]
pub struct TokenVerifier {
    keys: Arc<KeyProvider>,
    store: Arc<dyn Store>,
    issuer: String,
    audience: String,
}

impl TokenVerifier {
    pub fn new(keys: Arc<KeyProvider>, store: Arc<dyn Store>, config: &AuthConfig) -> Self {
        Self {
            keys,
            store,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
        }
    }

    /// Verify a first-party access token.
    pub async fn verify(&self, raw_token: &str) -> Result<Principal, AuthError> {
        self.verify_with(raw_token, AudiencePolicy::Server)
            .await
            .map(|verified| verified.principal)
    }

    /// Verify under an explicit audience policy, returning the full context.
    pub async fn verify_with(
        &self,
        raw_token: &str,
        policy: AudiencePolicy,
    ) -> Result<VerifiedToken, AuthError> {
        let claims = self.decode_claims(raw_token, policy)?;

        if self.store.is_blacklisted(&hash_token(raw_token)).await? {
            return Err(AuthError::TokenRevoked);
        }

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AuthError::TokenMalformed("subject is not a user id".into()))?;
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::PrincipalNotFound)?;

        if claims.token_version != user.token_version {
            debug!(
                user_id = %user.id,
                claim_version = claims.token_version,
                current_version = user.token_version,
                "rejecting stale token"
            );
            return Err(AuthError::TokenStale);
        }

        Ok(VerifiedToken {
            principal: Principal {
                id: user.id,
                role: user.role,
            },
            claims,
            user,
        })
    }

    /// RFC 7662-style introspection: never fails, invalid tokens are inactive.
    pub async fn introspect(&self, raw_token: &str) -> Introspection {
        match self
            .verify_with(raw_token, AudiencePolicy::ServerOrDelegated)
            .await
        {
            Ok(verified) => Introspection {
                active: true,
                claims: Some(verified.claims),
            },
            Err(e) => {
                debug!(reason = e.kind(), "introspected inactive token");
                Introspection {
                    active: false,
                    claims: None,
                }
            }
        }
    }

    /// Signature, algorithm, expiry, issuer and audience.
    fn decode_claims(
        &self,
        raw_token: &str,
        policy: AudiencePolicy,
    ) -> Result<TokenClaims, AuthError> {
        let header = decode_header(raw_token)
            .map_err(|e| AuthError::TokenMalformed(format!("header: {e}")))?;
        if header.alg != SIGNING_ALGORITHM {
            return Err(AuthError::TokenMalformed(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        if let Some(kid) = &header.kid
            && kid != self.keys.kid()
        {
            return Err(AuthError::TokenMalformed(format!("unknown key id '{kid}'")));
        }

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iat", "sub", "iss", "aud"]);
        match policy {
            AudiencePolicy::Server => validation.set_audience(&[&self.audience]),
            AudiencePolicy::ServerOrDelegated => validation.validate_aud = false,
        }

        let claims = decode::<TokenClaims>(raw_token, self.keys.decoding_key(), &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenMalformed(e.to_string()),
            })?;

        if policy == AudiencePolicy::ServerOrDelegated
            && claims.aud != self.audience
            && claims.client_id.as_deref() != Some(claims.aud.as_str())
        {
            return Err(AuthError::TokenMalformed("audience mismatch".into()));
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};

    use super::*;
    use crate::auth::issuer::IssueOptions;
    use crate::auth::keys::KeyProvider;
    use crate::models::auth::Role;
    use crate::test_support::{OTHER_KEY_PEM, TestEnv};

    fn claims_for(user: &User, exp_offset: i64) -> TokenClaims {
        let now = Utc::now().timestamp();
        TokenClaims {
            sub: user.id.to_string(),
            role: user.role,
            token_version: user.token_version,
            iat: now,
            exp: now + exp_offset,
            iss: "vouch".into(),
            aud: "vouch-api".into(),
            jti: "t".into(),
            client_id: None,
            auth_code: None,
        }
    }

    #[tokio::test]
    async fn issued_token_verifies_to_same_principal() {
        let env = TestEnv::new();
        let user = env.user("a@example.com").await;
        let admin = env.admin("root@example.com").await;

        for u in [&user, &admin] {
            let pair = env.authority.issuer.issue(u, IssueOptions::default()).await.unwrap();
            let principal = env.authority.verifier.verify(&pair.access_token).await.unwrap();
            assert_eq!(principal.id, u.id);
            assert_eq!(principal.role, u.role);
        }
        assert_eq!(admin.role, Role::Admin);
    }

    #[tokio::test]
    async fn expired_token_is_rejected_without_leeway() {
        let env = TestEnv::new();
        let user = env.user("a@example.com").await;
        let token = env.keys.sign(&claims_for(&user, -1)).unwrap();

        let err = env.authority.verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired), "{err:?}");
    }

    #[tokio::test]
    async fn wrong_issuer_or_audience_is_malformed() {
        let env = TestEnv::new();
        let user = env.user("a@example.com").await;

        let mut wrong_iss = claims_for(&user, 60);
        wrong_iss.iss = "someone-else".into();
        let mut wrong_aud = claims_for(&user, 60);
        wrong_aud.aud = "other-api".into();

        for claims in [wrong_iss, wrong_aud] {
            let token = env.keys.sign(&claims).unwrap();
            let err = env.authority.verifier.verify(&token).await.unwrap_err();
            assert!(matches!(err, AuthError::TokenMalformed(_)), "{err:?}");
        }
    }

    #[tokio::test]
    async fn token_signed_by_other_key_is_malformed() {
        let env = TestEnv::new();
        let user = env.user("a@example.com").await;
        let impostor = KeyProvider::from_pem("test-key", OTHER_KEY_PEM).unwrap();
        let token = impostor.sign(&claims_for(&user, 60)).unwrap();

        let err = env.authority.verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenMalformed(_)), "{err:?}");
    }

    #[tokio::test]
    async fn hs256_substitution_is_rejected() {
        let env = TestEnv::new();
        let user = env.user("a@example.com").await;
        // Attacker signs with the public modulus as an HMAC secret.
        let secret = env.keys.public_jwk().keys[0].n.clone();
        let token = encode(
            &Header::default(),
            &claims_for(&user, 60),
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();

        let err = env.authority.verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenMalformed(_)), "{err:?}");
    }

    #[tokio::test]
    async fn garbage_is_malformed() {
        let env = TestEnv::new();
        let err = env.authority.verifier.verify("not.a.jwt").await.unwrap_err();
        assert!(matches!(err, AuthError::TokenMalformed(_)));
    }

    #[tokio::test]
    async fn unknown_subject_is_principal_not_found() {
        let env = TestEnv::new();
        let mut ghost = env.user("a@example.com").await;
        ghost.id = Uuid::now_v7();
        let token = env.keys.sign(&claims_for(&ghost, 60)).unwrap();

        let err = env.authority.verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::PrincipalNotFound));
    }

    #[tokio::test]
    async fn delegated_token_is_rejected_by_first_party_verify_but_introspects_active() {
        let env = TestEnv::new();
        let user = env.user("a@example.com").await;
        let pair = env
            .authority
            .issuer
            .issue(&user, IssueOptions::for_client("abc", "XYZ"))
            .await
            .unwrap();

        assert!(env.authority.verifier.verify(&pair.access_token).await.is_err());

        let introspection = env.authority.verifier.introspect(&pair.access_token).await;
        assert!(introspection.active);
        assert_eq!(introspection.claims.unwrap().aud, "abc");
    }

    #[tokio::test]
    async fn introspection_of_invalid_token_is_inactive_without_claims() {
        let env = TestEnv::new();
        let introspection = env.authority.verifier.introspect("garbage").await;
        assert!(!introspection.active);
        let json = serde_json::to_value(&introspection).unwrap();
        assert_eq!(json, serde_json::json!({"active": false}));
    }
}

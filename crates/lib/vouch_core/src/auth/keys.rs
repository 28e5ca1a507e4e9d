//! Signing key material and JWKS publication.
//!
//! One RSA keypair (RS256) identified by a configured `kid`. The decoding
//! key is rebuilt from the published JWK components, so a token that
//! verifies here verifies for any relying party holding the JWK set.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, encode};
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};

use super::AuthError;

/// The only algorithm tokens are signed or accepted with.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::RS256;

/// Smallest accepted modulus, in bits.
pub const MIN_RSA_BITS: usize = 2048;

/// JWK (JSON Web Key) representation for the JWKS endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonWebKey {
    /// Key type (always "RSA").
    pub kty: String,
    /// Public key use (always "sig").
    #[serde(rename = "use")]
    pub key_use: String,
    pub kid: String,
    pub alg: String,
    /// RSA modulus (base64url).
    pub n: String,
    /// RSA exponent (base64url).
    pub e: String,
}

/// JWKS (JSON Web Key Set) container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonWebKeySet {
    pub keys: Vec<JsonWebKey>,
}

/// Holds the signing keypair.
pub struct KeyProvider {
    kid: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    jwk: JsonWebKey,
}

impl std::fmt::Debug for KeyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyProvider")
            .field("kid", &self.kid)
            .finish_non_exhaustive()
    }
}

impl KeyProvider {
    /// Load from a PKCS#8 (`PRIVATE KEY`) or PKCS#1 (`RSA PRIVATE KEY`) PEM.
    ///
    /// Any failure is a [`AuthError::Configuration`]: the service must not
    /// start without usable keys.
    pub fn from_pem(kid: &str, pem: &str) -> Result<Self, AuthError> {
        if kid.trim().is_empty() {
            return Err(AuthError::Configuration("signing key id is empty".into()));
        }
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| AuthError::Configuration(format!("unreadable RSA private key: {e}")))?;
        Self::from_private_key(kid, &private_key)
    }

    fn from_private_key(kid: &str, private_key: &RsaPrivateKey) -> Result<Self, AuthError> {
        let bits = private_key.size() * 8;
        if bits < MIN_RSA_BITS {
            return Err(AuthError::Configuration(format!(
                "RSA key is {bits} bits, at least {MIN_RSA_BITS} required"
            )));
        }

        let der = private_key
            .to_pkcs1_der()
            .map_err(|e| AuthError::Configuration(format!("RSA key encode: {e}")))?;
        let encoding_key = EncodingKey::from_rsa_der(der.as_bytes());

        let public_key = RsaPublicKey::from(private_key);
        let jwk = JsonWebKey {
            kty: "RSA".to_string(),
            key_use: "sig".to_string(),
            kid: kid.to_string(),
            alg: "RS256".to_string(),
            n: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
            e: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
        };
        let decoding_key = decoding_key_from_jwk(&jwk)?;

        Ok(Self {
            kid: kid.to_string(),
            encoding_key,
            decoding_key,
            jwk,
        })
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Sign claims as an RS256 JWT carrying this key's `kid`.
    pub fn sign<T: Serialize>(&self, claims: &T) -> Result<String, AuthError> {
        let mut header = Header::new(SIGNING_ALGORITHM);
        header.kid = Some(self.kid.clone());
        encode(&header, claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// Public verification material for relying parties.
    pub fn public_jwk(&self) -> JsonWebKeySet {
        JsonWebKeySet {
            keys: vec![self.jwk.clone()],
        }
    }
}

/// Build a verification key from a published JWK.
pub fn decoding_key_from_jwk(jwk: &JsonWebKey) -> Result<DecodingKey, AuthError> {
    if jwk.kty != "RSA" {
        return Err(AuthError::Configuration(format!(
            "unsupported key type '{}'",
            jwk.kty
        )));
    }
    DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
        .map_err(|e| AuthError::Configuration(format!("invalid JWK components: {e}")))
}

/// A freshly generated keypair as PEM text.
pub struct GeneratedKeyPair {
    pub private_pem: String,
    pub public_pem: String,
}

/// Generate an RSA keypair (PKCS#8 private, SPKI public).
pub fn generate_rsa_keypair(bits: usize) -> Result<GeneratedKeyPair, AuthError> {
    if bits < MIN_RSA_BITS {
        return Err(AuthError::Validation(format!(
            "key size must be at least {MIN_RSA_BITS} bits"
        )));
    }
    let mut rng = rsa::rand_core::OsRng;
    let private_key = RsaPrivateKey::new(&mut rng, bits)
        .map_err(|e| AuthError::Internal(format!("RSA key generation: {e}")))?;
    let private_pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| AuthError::Internal(format!("PEM encode: {e}")))?
        .to_string();
    let public_pem = RsaPublicKey::from(&private_key)
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| AuthError::Internal(format!("PEM encode: {e}")))?;
    Ok(GeneratedKeyPair {
        private_pem,
        public_pem,
    })
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{Validation, decode, decode_header};

    use super::*;
    use crate::test_support::{OTHER_KEY_PEM, TEST_KEY_PEM};

    #[derive(Debug, Serialize, Deserialize)]
    struct Probe {
        sub: String,
        exp: i64,
    }

    fn probe() -> Probe {
        Probe {
            sub: "42".into(),
            exp: chrono::Utc::now().timestamp() + 60,
        }
    }

    #[test]
    fn missing_or_garbage_key_is_a_configuration_error() {
        let err = KeyProvider::from_pem("k1", "not a pem").unwrap_err();
        assert!(matches!(err, AuthError::Configuration(_)));
        let err = KeyProvider::from_pem("", TEST_KEY_PEM).unwrap_err();
        assert!(matches!(err, AuthError::Configuration(_)));
    }

    #[test]
    fn published_jwk_verifies_signed_token() {
        let keys = KeyProvider::from_pem("k1", TEST_KEY_PEM).unwrap();
        let token = keys.sign(&probe()).unwrap();

        let header = decode_header(&token).unwrap();
        let jwks = keys.public_jwk();
        assert_eq!(jwks.keys.len(), 1);
        let jwk = &jwks.keys[0];
        assert_eq!(header.kid.as_deref(), Some(jwk.kid.as_str()));
        assert_eq!(header.alg, SIGNING_ALGORITHM);
        assert_eq!(jwk.alg, "RS256");
        assert_eq!(jwk.key_use, "sig");

        let key = decoding_key_from_jwk(jwk).unwrap();
        let data = decode::<Probe>(&token, &key, &Validation::new(SIGNING_ALGORITHM)).unwrap();
        assert_eq!(data.claims.sub, "42");
    }

    #[test]
    fn jwk_of_another_key_rejects_token() {
        let keys = KeyProvider::from_pem("k1", TEST_KEY_PEM).unwrap();
        let other = KeyProvider::from_pem("k2", OTHER_KEY_PEM).unwrap();
        let token = keys.sign(&probe()).unwrap();

        let key = decoding_key_from_jwk(&other.public_jwk().keys[0]).unwrap();
        assert!(decode::<Probe>(&token, &key, &Validation::new(SIGNING_ALGORITHM)).is_err());
    }

    #[test]
    fn jwks_serializes_use_field() {
        let keys = KeyProvider::from_pem("k1", TEST_KEY_PEM).unwrap();
        let json = serde_json::to_value(keys.public_jwk()).unwrap();
        assert_eq!(json["keys"][0]["use"], "sig");
        assert_eq!(json["keys"][0]["kty"], "RSA");
        assert_eq!(json["keys"][0]["kid"], "k1");
    }
}

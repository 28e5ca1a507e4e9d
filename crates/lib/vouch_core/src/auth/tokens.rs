//! Random credential generation and at-rest hashing.
//!
//! Refresh tokens, blacklisted access tokens and client secrets are stored as
//! SHA-256 hex digests; the raw value only ever exists in the response that
//! hands it out.

use base64::Engine;
use rand::distr::Alphanumeric;
use rand::{Rng, RngCore, rng};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Generate a random opaque token (64 alphanumeric chars, ~380 bits).
pub fn generate_token() -> String {
    generate_alphanumeric(64)
}

/// Generate `len` random alphanumeric characters.
pub fn generate_alphanumeric(len: usize) -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generate a URL-safe random value from `len` bytes of entropy.
pub fn generate_url_safe(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 hash a token for storage.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Compare a presented secret against a stored SHA-256 hex digest in
/// constant time.
pub fn verify_token_hash(presented: &str, stored_hash: &str) -> bool {
    let presented_hash = hash_token(presented);
    presented_hash.as_bytes().ct_eq(stored_hash.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_unique_and_long() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }

    #[test]
    fn hash_is_hex_sha256() {
        let h = hash_token("abc");
        assert_eq!(
            h,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn verify_token_hash_matches_only_original() {
        let stored = hash_token("s3cret");
        assert!(verify_token_hash("s3cret", &stored));
        assert!(!verify_token_hash("s3cret!", &stored));
        assert!(!verify_token_hash("s3cret", "short"));
    }

    #[test]
    fn url_safe_values_have_no_padding() {
        let v = generate_url_safe(32);
        assert_eq!(v.len(), 43);
        assert!(!v.contains('='));
    }
}

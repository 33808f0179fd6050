//! Constant-time bearer-token comparison, shared by the admin HTTP guard
//! and the consumer-facing WebSocket's optional auth token. Hashing first
//! normalizes both sides to a fixed length so `ct_eq` never leaks the
//! token's length through timing.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

pub fn hash_token(token: &str) -> Vec<u8> {
    Sha256::digest(token.as_bytes()).to_vec()
}

pub fn token_matches_hash(token: &str, expected_hash: &[u8]) -> bool {
    let provided_hash = Sha256::digest(token.as_bytes());
    provided_hash.ct_eq(expected_hash).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_token_passes() {
        let hash = hash_token("secret");
        assert!(token_matches_hash("secret", &hash));
    }

    #[test]
    fn mismatched_token_fails() {
        let hash = hash_token("secret");
        assert!(!token_matches_hash("wrong", &hash));
    }

    #[test]
    fn empty_token_against_real_hash_fails() {
        let hash = hash_token("secret");
        assert!(!token_matches_hash("", &hash));
    }
}

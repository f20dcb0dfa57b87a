//! Business API keys.
//!
//! Keys look like `rsv_<43 url-safe chars>`. Only the SHA-256 hash is kept;
//! the plaintext is handed to the caller once, at creation.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use rand::RngCore;
use reservio_core::types::ApiKeyId;
use sha2::{Digest, Sha256};

use crate::db::ApiKey;

/// Fixed prefix of every API key.
pub const API_KEY_PREFIX: &str = "rsv_";

/// Characters of the key kept as its visible prefix.
const VISIBLE_PREFIX_LEN: usize = 12;

/// Hex-encoded SHA-256 of a presented key.
#[must_use]
pub fn hash_api_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

/// Create a new key record and its plaintext.
#[must_use]
pub fn generate_api_key(label: &str, now: DateTime<Utc>) -> (ApiKey, String) {
    let mut bytes = [0_u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    let key = format!("{API_KEY_PREFIX}{}", URL_SAFE_NO_PAD.encode(bytes));
    let prefix = key.chars().take(VISIBLE_PREFIX_LEN).collect();

    let record = ApiKey {
        id: ApiKeyId::new(),
        label: label.trim().to_owned(),
        prefix,
        key_hash: hash_api_key(&key),
        created_at: now,
        revoked_at: None,
    };
    (record, key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_key_matches_stored_hash() {
        let (record, key) = generate_api_key(" CI deploy ", Utc::now());
        assert!(key.starts_with(API_KEY_PREFIX));
        assert_eq!(record.label, "CI deploy");
        assert_eq!(record.prefix.len(), 12);
        assert!(key.starts_with(&record.prefix));
        assert_eq!(record.key_hash, hash_api_key(&key));
        assert_ne!(record.key_hash, key);
        assert!(record.is_active());
    }
}

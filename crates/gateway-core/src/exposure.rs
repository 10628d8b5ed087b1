//! Exposure entries and secure identifier minting

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of random bytes behind a secure hash (hex-encoded to 32 chars)
const SECURE_HASH_BYTES: usize = 16;

/// A prompt's opaque public identifier and whether it is currently exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposureEntry {
    /// Internal prompt id
    pub prompt_id: i64,
    /// Opaque identifier used in URLs
    pub secure_hash: String,
    /// Only exposed entries are reachable
    #[serde(default = "default_exposed")]
    pub exposed: bool,
}

fn default_exposed() -> bool {
    true
}

impl ExposureEntry {
    /// Entry for `prompt_id` with a freshly minted hash, marked exposed.
    #[must_use]
    pub fn exposed(prompt_id: i64) -> Self {
        Self {
            prompt_id,
            secure_hash: mint_secure_hash(),
            exposed: true,
        }
    }

    /// Entry with a known hash
    pub fn new(prompt_id: i64, secure_hash: impl Into<String>, exposed: bool) -> Self {
        Self {
            prompt_id,
            secure_hash: secure_hash.into(),
            exposed,
        }
    }
}

/// Mint a new opaque identifier: 32 lowercase hex chars from a CSPRNG.
#[must_use]
pub fn mint_secure_hash() -> String {
    let bytes: [u8; SECURE_HASH_BYTES] = rand::rng().random();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_hash_is_hex_and_unique() {
        let a = mint_secure_hash();
        let b = mint_secure_hash();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(a, b);
    }

    #[test]
    fn exposed_flag_defaults_to_true() {
        let entry: ExposureEntry =
            serde_json::from_str(r#"{"prompt_id": 4, "secure_hash": "abc"}"#).unwrap();
        assert!(entry.exposed);
        assert_eq!(entry, ExposureEntry::new(4, "abc", true));
    }
}

//! Salted SHA-256 password hashing.
//!
//! Hashes are stored as `salt$hexdigest`. The salt is unique per hash, so
//! identical passwords never produce identical stored values.

use mud_engine::store::PasswordHasher;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static SALT_COUNTER: AtomicU64 = AtomicU64::new(0);

fn fresh_salt() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let count = SALT_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{:016x}{:08x}", nanos, count)
}

fn digest(salt: &str, plaintext: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b"$");
    hasher.update(plaintext.as_bytes());
    let out = hasher.finalize();
    out.iter().map(|b| format!("{:02x}", b)).collect()
}

/// [`PasswordHasher`] backed by salted SHA-256.
pub struct Sha2Hasher;

impl PasswordHasher for Sha2Hasher {
    fn hash(&self, plaintext: &str) -> String {
        let salt = fresh_salt();
        let digest = digest(&salt, plaintext);
        format!("{}${}", salt, digest)
    }

    fn verify(&self, plaintext: &str, hash: &str) -> bool {
        match hash.split_once('$') {
            Some((salt, stored)) => digest(salt, plaintext) == stored,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trips() {
        let hasher = Sha2Hasher;
        let hash = hasher.hash("correct horse battery");
        assert!(hasher.verify("correct horse battery", &hash));
        assert!(!hasher.verify("wrong horse battery", &hash));
    }

    #[test]
    fn equal_passwords_get_distinct_hashes() {
        let hasher = Sha2Hasher;
        assert_ne!(hasher.hash("secret"), hasher.hash("secret"));
    }

    #[test]
    fn malformed_hashes_never_verify() {
        let hasher = Sha2Hasher;
        assert!(!hasher.verify("secret", "no-dollar-sign"));
        assert!(!hasher.verify("secret", ""));
    }
}

//! Salted password digests for the local credential store.
//!
//! This is a local stand-in for a real identity provider, so the digest is a
//! single keyed BLAKE3 pass rather than a slow password hash. It only keeps
//! plaintext passwords out of the storage partition.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::constants::SALT_LEN;

/// Hex-encoded salt and digest for one password.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PasswordDigest {
    pub salt: String,
    pub hash: String,
}

impl PasswordDigest {
    /// Derive a digest for `password` under a fresh random salt.
    pub fn create(password: &str) -> Self {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        Self {
            salt: hex::encode(salt),
            hash: digest(&salt, password),
        }
    }

    /// Check `password` against this digest. A corrupt salt never matches.
    pub fn verify(&self, password: &str) -> bool {
        match hex::decode(&self.salt) {
            Ok(salt) => digest(&salt, password) == self.hash,
            Err(_) => false,
        }
    }
}

fn digest(salt: &[u8], password: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().to_hex().to_string()
}

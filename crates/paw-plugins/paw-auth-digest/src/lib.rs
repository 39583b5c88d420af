//! # paw-auth-digest
//!
//! `PasswordHasher` implementations.
//! [`Sha256Hasher`] is the account scheme: unsalted SHA-256, hex encoded, so
//! a stored digest is compared against a fresh one. [`Argon2Hasher`] is the
//! opt-in salted alternative. The two cannot verify each other's output.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Argon2,
};
use paw_core::error::{AppError, Result};
use paw_core::traits::PasswordHasher;
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of the password's UTF-8 bytes.
pub fn sha256_hex(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl PasswordHasher for Sha256Hasher {
    fn hash(&self, password: &str) -> Result<String> {
        Ok(sha256_hex(password))
    }

    fn verify(&self, password: &str, stored: &str) -> bool {
        sha256_hex(password).eq_ignore_ascii_case(stored.trim())
    }
}

/// Argon2id with a random salt, stored as a PHC string.
#[derive(Default)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("failed to hash password: {e}")))
    }

    /// Verifies if a provided password matches a stored Argon2 hash.
    fn verify(&self, password: &str, stored: &str) -> bool {
        let parsed_hash = match PasswordHash::new(stored) {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!(error = %e, "stored value is not a PHC string");
                return false;
            }
        };
        self.argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            sha256_hex("password123"),
            "ef92b778bafe771e89245b89ecbc08a44a4e166c06659911881f383d4473e94f"
        );
        assert_eq!(sha256_hex("").len(), 64);
    }

    #[test]
    fn test_sha256_verify() {
        let hasher = Sha256Hasher;
        let digest = hasher.hash("secret1").unwrap();
        assert_eq!(digest, hasher.hash("secret1").unwrap());
        assert!(hasher.verify("secret1", &digest));
        assert!(hasher.verify("secret1", &digest.to_uppercase()));
        assert!(!hasher.verify("Secret1", &digest));
    }

    #[test]
    fn test_argon2_salts_and_verifies() {
        let hasher = Argon2Hasher::new();
        let a = hasher.hash("secret1").unwrap();
        let b = hasher.hash("secret1").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2"));
        assert!(hasher.verify("secret1", &a));
        assert!(!hasher.verify("wrong", &a));
    }

    #[test]
    fn test_schemes_do_not_cross_verify() {
        let digest = Sha256Hasher.hash("secret1").unwrap();
        assert!(!Argon2Hasher::new().verify("secret1", &digest));

        let phc = Argon2Hasher::new().hash("secret1").unwrap();
        assert!(!Sha256Hasher.verify("secret1", &phc));
    }
}

//! Password hashing capability.

use argon2::{
    Argon2,
    password_hash::{
        self, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
        rand_core::OsRng,
    },
};

use crate::error::DomainError;

/// Hashes and verifies passwords.
///
/// The account service only ever calls these two operations, so tests can
/// swap in a cheap implementation.
pub trait PasswordHasher: Send + Sync {
    /// Hashes a plaintext password for storage.
    fn hash(&self, password: &str) -> Result<String, DomainError>;

    /// Returns whether `password` matches the stored `hash`.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, DomainError>;
}

/// Argon2id hasher with the crate's default parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, DomainError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| DomainError::PasswordHash(e.to_string()))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, DomainError> {
        let parsed =
            PasswordHash::new(hash).map_err(|e| DomainError::PasswordHash(e.to_string()))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(DomainError::PasswordHash(e.to_string())),
        }
    }
}

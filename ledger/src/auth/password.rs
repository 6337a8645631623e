//! Credential hashing.
//!
//! Argon2id with a per-credential random salt, stored as a PHC string.
//! The hash is the only credential material that ever touches disk.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use thiserror::Error;

/// Errors from credential hashing and verification.
#[derive(Debug, Error)]
pub enum PasswordError {
    /// The supplied credential does not match the stored hash.
    #[error("credential mismatch")]
    Mismatch,

    /// Hashing failed or the stored hash string is not a valid PHC
    /// string — either way, not the caller's fault.
    #[error("credential hashing failed: {0}")]
    Hash(String),
}

/// Hash a password with Argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored PHC hash string.
pub fn verify_password(password: &str, password_hash: &str) -> Result<(), PasswordError> {
    let parsed = PasswordHash::new(password_hash).map_err(|e| PasswordError::Hash(e.to_string()))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|e| match e {
            argon2::password_hash::Error::Password => PasswordError::Mismatch,
            other => PasswordError::Hash(other.to_string()),
        })
}

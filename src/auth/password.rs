use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::{Argon2, PasswordHash, PasswordVerifier as _};

use crate::error::AppError;
use crate::Result;

/// One-way password hashing and checking against a stored hash.
pub trait PasswordVerifier: Send + Sync {
    fn verify(&self, password: &str, stored_hash: &str) -> bool;

    /// Produces the value to store for a newly chosen password.
    fn hash(&self, password: &str) -> Result<String>;
}

/// Rejects passwords shorter than 8 characters or lacking a lowercase letter,
/// an uppercase letter or a digit.
pub fn check_strength(password: &str) -> Result<()> {
    let strong = password.chars().count() >= 8
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit());

    if strong {
        Ok(())
    } else {
        Err(AppError::ValidationError(
            "password must be at least 8 characters with upper and lower case letters and a digit".into(),
        ))
    }
}

/// Hashes and verifies PHC-format Argon2 hashes.
#[derive(Debug, Default, Clone)]
pub struct Argon2Verifier;

impl PasswordVerifier for Argon2Verifier {
    fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::InternalError(format!("password hashing failed: {}", e)))
    }

    fn verify(&self, password: &str, stored_hash: &str) -> bool {
        // An unparseable stored hash is a failed match.
        match PasswordHash::new(stored_hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

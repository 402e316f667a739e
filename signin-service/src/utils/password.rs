use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;

/// Opaque verification failure. A wrong password and a malformed stored
/// hash are deliberately indistinguishable to callers.
#[derive(Debug, Error)]
#[error("password verification failed")]
pub struct PasswordError;

/// Hash a plaintext password using Argon2id with a fresh random salt.
///
/// Used when provisioning logins; the sign-in path only ever verifies.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| PasswordError)?;

    Ok(hash.to_string())
}

/// Verify a plaintext password against a stored Argon2 hash string.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<(), PasswordError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|_| PasswordError)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| PasswordError)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trips() {
        let hash = hash_password("opensesame").expect("Failed to hash password");

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("opensesame", &hash).is_ok());
    }

    #[test]
    fn wrong_password_fails_verification() {
        let hash = hash_password("opensesame").expect("Failed to hash password");

        assert!(verify_password("shutsesame", &hash).is_err());
    }

    #[test]
    fn malformed_stored_hash_fails_like_a_mismatch() {
        assert!(verify_password("opensesame", "not-a-phc-string").is_err());
    }

    #[test]
    fn same_password_hashes_differently() {
        let first = hash_password("opensesame").expect("Failed to hash password");
        let second = hash_password("opensesame").expect("Failed to hash password");

        // Random salts: the strings differ, both still verify.
        assert_ne!(first, second);
        assert!(verify_password("opensesame", &first).is_ok());
        assert!(verify_password("opensesame", &second).is_ok());
    }
}

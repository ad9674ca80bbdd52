//! Password hashing for locally created accounts.

use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
};
use thiserror::Error;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("La contraseña debe tener al menos {MIN_PASSWORD_LENGTH} caracteres")]
    TooShort,
    #[error("password hashing failed")]
    Hash,
}

/// Validate and hash a password using Argon2id.
///
/// # Errors
///
/// Returns `PasswordError::TooShort` for short passwords and
/// `PasswordError::Hash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PasswordError::TooShort);
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| PasswordError::Hash)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use argon2::password_hash::{PasswordHash, PasswordVerifier};

    use super::*;

    #[test]
    fn test_hash_verifies() {
        let hash = hash_password("horchata123").unwrap();
        assert!(hash.starts_with("$argon2id$"));

        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(
            Argon2::default()
                .verify_password(b"horchata123", &parsed)
                .is_ok()
        );
        assert!(Argon2::default().verify_password(b"otra", &parsed).is_err());
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(matches!(hash_password("abc"), Err(PasswordError::TooShort)));
    }

    #[test]
    fn test_salts_differ() {
        assert_ne!(
            hash_password("horchata123").unwrap(),
            hash_password("horchata123").unwrap()
        );
    }
}

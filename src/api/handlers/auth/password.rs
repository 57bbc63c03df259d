//! Argon2 password hashing for the credentials path.

use anyhow::{Result, anyhow};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use std::sync::OnceLock;

/// Minimum accepted length for a new password.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash a plaintext password into a PHC string.
///
/// # Errors
/// Returns an error if argon2 fails to hash the input.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| anyhow!("failed to hash password: {err}"))
}

/// Check a plaintext password against a stored PHC string.
///
/// `Ok(false)` means the password does not match. An unparseable stored hash
/// is an error, not a mismatch.
///
/// # Errors
/// Returns an error if the stored hash is not a valid PHC string.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed =
        PasswordHash::new(stored_hash).map_err(|err| anyhow!("invalid stored hash: {err}"))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

#[cfg(test)]
thread_local! {
    static DUMMY_VERIFICATIONS: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

/// Spend one argon2 verification on a throwaway hash.
///
/// Sign-in paths that bail out before checking a real hash call this so an
/// unknown email costs the same as a wrong password.
pub fn verify_dummy(password: &str) {
    #[cfg(test)]
    DUMMY_VERIFICATIONS.with(|count| count.set(count.get() + 1));

    let dummy = DUMMY_HASH.get_or_init(|| hash_password("confgate-dummy-password").ok());
    if let Some(hash) = dummy {
        let _ = verify_password(password, hash);
    }
}

#[cfg(test)]
pub(crate) fn dummy_verifications() -> usize {
    DUMMY_VERIFICATIONS.with(std::cell::Cell::get)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() -> Result<()> {
        let hash = hash_password("correct horse battery")?;
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse battery", &hash)?);
        assert!(!verify_password("wrong horse battery", &hash)?);
        Ok(())
    }

    #[test]
    fn hashes_are_salted() -> Result<()> {
        let first = hash_password("same-password")?;
        let second = hash_password("same-password")?;
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn dummy_verification_is_counted() {
        let before = dummy_verifications();
        verify_dummy("whatever");
        verify_dummy("whatever");
        assert_eq!(dummy_verifications(), before + 2);
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }
}

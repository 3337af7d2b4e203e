use std::sync::OnceLock;

use anyhow::{Result, anyhow};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{self, SaltString},
};
use rand_core::OsRng;

/// Hash of a random throwaway password, verified against when a login names an
/// unknown account so that both failure paths cost one Argon2 verification.
static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

/// Hash a password with Argon2id and a fresh random salt. The result is a
/// PHC string that embeds the salt and cost parameters.
pub fn hash(plaintext: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hashed = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| anyhow!("password hashing failed: {}", e))?;
    Ok(hashed.to_string())
}

/// Check a password against a stored PHC string.
///
/// A mismatch is `Ok(false)`; only a corrupt stored hash or a library fault is an error.
pub fn matches(plaintext: &str, hashed: &str) -> Result<bool> {
    let parsed =
        PasswordHash::new(hashed).map_err(|e| anyhow!("stored hash is unreadable: {}", e))?;

    match Argon2::default().verify_password(plaintext.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow!("password verification failed: {}", e)),
    }
}

/// Burn one verification against a throwaway hash. Always `false`.
pub fn verify_dummy(plaintext: &str) -> bool {
    let dummy = DUMMY_HASH.get_or_init(|| {
        let throwaway = SaltString::generate(&mut OsRng);
        hash(throwaway.as_str()).ok()
    });
    if let Some(dummy) = dummy {
        let _ = matches(plaintext, dummy);
    }
    false
}

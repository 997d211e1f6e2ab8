use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand::rngs::OsRng;
use std::fmt;

/// Plaintext password as supplied by a caller. Never persisted, never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    #[must_use]
    pub fn new(plain: impl Into<String>) -> Self {
        Self(plain.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

impl From<&str> for Password {
    fn from(plain: &str) -> Self {
        Self::new(plain)
    }
}

impl From<String> for Password {
    fn from(plain: String) -> Self {
        Self(plain)
    }
}

/// Hashes `plain` with Argon2id under a fresh random salt.
/// The salt and parameters are embedded in the returned PHC string.
pub(crate) fn hash(plain: &str, params: Params) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
}

/// Checks `candidate` against a stored PHC string. The final digest comparison is constant time.
/// An unparseable hash is a mismatch.
pub(crate) fn verify(candidate: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        tracing::warn!("Stored password hash is not a valid PHC string");
        return false;
    };
    Argon2::default().verify_password(candidate.as_bytes(), &parsed).is_ok()
}

/// Whether `value` is already a hash this module could have produced.
#[must_use]
pub fn is_hash(value: &str) -> bool {
    PasswordHash::new(value).is_ok_and(|h| h.algorithm.as_str().starts_with("argon2"))
}

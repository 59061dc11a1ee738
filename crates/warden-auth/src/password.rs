//! Password verification using Argon2id.

use argon2::{Argon2, PasswordVerifier};

use crate::error::AuthError;

/// Verify a plaintext password against an Argon2id PHC-format hash.
///
/// If `pepper` is provided it is prepended to the password before
/// verification; this must match the pepper used during hashing.
///
/// Returns `Ok(true)` on match, `Ok(false)` on mismatch, or
/// `Err(AuthError::Crypto)` if the stored hash is malformed.
pub fn verify_password(
    password: &str,
    hash: &str,
    pepper: Option<&str>,
) -> Result<bool, AuthError> {
    let peppered: String;
    let input = match pepper {
        Some(p) => {
            peppered = format!("{p}{password}");
            peppered.as_bytes()
        }
        None => password.as_bytes(),
    };

    let parsed_hash = argon2::PasswordHash::new(hash)
        .map_err(|e| AuthError::Crypto(format!("invalid hash format: {e}")))?;

    match Argon2::default().verify_password(input, &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Crypto(format!("verify error: {e}"))),
    }
}

/// Argon2id hash of no known secret, compared against when the e-mail
/// is unknown so both rejection paths cost one verification.
pub const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$d2FyZGVuLWR1bW15LXNhbHQ$zuQd4bVb0PkZPq1cQbJ8ZpUMWwR6nXgKJqzyXJ5hY2o";

/// Credential comparison used by the authenticator.
pub trait SecretVerifier: Send + Sync {
    fn verify(&self, secret: &str, hash: &str) -> Result<bool, AuthError>;
}

/// Argon2id verifier with an optional server-side pepper.
#[derive(Debug, Clone, Default)]
pub struct Argon2Verifier {
    pepper: Option<String>,
}

impl Argon2Verifier {
    pub fn new(pepper: Option<String>) -> Self {
        Self { pepper }
    }
}

impl SecretVerifier for Argon2Verifier {
    fn verify(&self, secret: &str, hash: &str) -> Result<bool, AuthError> {
        verify_password(secret, hash, self.pepper.as_deref())
    }
}

//! Authentication configuration.

use crate::error::AuthError;

/// Configuration for token issuance and credential verification.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// PEM-encoded Ed25519 private key for JWT signing.
    pub jwt_private_key_pem: String,
    /// PEM-encoded Ed25519 public key for JWT verification.
    pub jwt_public_key_pem: String,
    /// JWT issuer (`iss` claim).
    pub jwt_issuer: String,
    /// Optional pepper prepended to passwords before Argon2id verification.
    pub pepper: Option<String>,
    /// Privileged session token lifetime in seconds (default: 28_800 = 8 hours).
    /// The session record expires together with the token.
    pub session_token_lifetime_secs: u64,
    /// Impersonation token lifetime in seconds (default: 900 = 15 minutes).
    pub impersonation_token_lifetime_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_private_key_pem: String::new(),
            jwt_public_key_pem: String::new(),
            jwt_issuer: "warden".into(),
            pepper: None,
            session_token_lifetime_secs: 28_800,
            impersonation_token_lifetime_secs: 900,
        }
    }
}

impl AuthConfig {
    /// Reject settings the issuers cannot honour.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.jwt_issuer.trim().is_empty() {
            return Err(AuthError::Config("jwt_issuer must not be empty".into()));
        }
        if self.session_token_lifetime_secs == 0 {
            return Err(AuthError::Config(
                "session_token_lifetime_secs must be positive".into(),
            ));
        }
        if self.impersonation_token_lifetime_secs == 0 {
            return Err(AuthError::Config(
                "impersonation_token_lifetime_secs must be positive".into(),
            ));
        }
        if self.impersonation_token_lifetime_secs >= self.session_token_lifetime_secs {
            return Err(AuthError::Config(format!(
                "impersonation lifetime ({}s) must be shorter than the session lifetime ({}s)",
                self.impersonation_token_lifetime_secs, self.session_token_lifetime_secs
            )));
        }
        if self.jwt_private_key_pem.is_empty() || self.jwt_public_key_pem.is_empty() {
            return Err(AuthError::Config("JWT signing keys are required".into()));
        }
        Ok(())
    }
}

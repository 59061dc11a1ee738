//! Authentication error types.

use thiserror::Error;
use warden_core::error::WardenError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("session is revoked or expired")]
    SessionRevoked,

    #[error("token version is stale")]
    TokenSuperseded,

    #[error("cryptography error: {0}")]
    Crypto(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<AuthError> for WardenError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenExpired
            | AuthError::TokenInvalid(_)
            | AuthError::SessionRevoked
            | AuthError::TokenSuperseded => WardenError::Unauthenticated {
                reason: err.to_string(),
            },
            AuthError::Crypto(msg) | AuthError::Config(msg) => WardenError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_problems_are_unauthenticated() {
        let err: WardenError = AuthError::TokenSuperseded.into();
        assert_eq!(err.code(), "unauthenticated");
    }

    #[test]
    fn crypto_detail_stays_internal() {
        let err: WardenError = AuthError::Crypto("bad private key: asn1".into()).into();
        assert_eq!(err.code(), "internal_error");
        assert!(!err.rejection().message.contains("asn1"));
    }
}

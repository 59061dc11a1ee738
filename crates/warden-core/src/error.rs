//! Error types for the Warden subsystem.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WardenError {
    #[error("authentication from this origin is blocked")]
    OriginBlocked,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("target not found: {id}")]
    TargetNotFound { id: String },

    #[error("origin already blocked: {ip}")]
    DuplicateOrigin { ip: String },

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("unauthenticated: {reason}")]
    Unauthenticated { reason: String },

    #[error("entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("internal error: {0}")]
    Internal(String),
}

pub type WardenResult<T> = Result<T, WardenError>;

impl WardenError {
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn unauthenticated(reason: impl Into<String>) -> Self {
        Self::Unauthenticated {
            reason: reason.into(),
        }
    }

    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::OriginBlocked => "origin_blocked",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Forbidden { .. } => "forbidden",
            Self::TargetNotFound { .. } => "target_not_found",
            Self::DuplicateOrigin { .. } => "duplicate_origin",
            Self::StorageUnavailable(_) => "storage_unavailable",
            Self::Validation { .. } => "validation_error",
            Self::Unauthenticated { .. } => "unauthenticated",
            Self::NotFound { .. } => "not_found",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Caller-facing view of this error.
    ///
    /// Storage and internal details stay in the server logs; the caller
    /// only sees the reason code and a fixed message for those.
    pub fn rejection(&self) -> Rejection {
        let message = match self {
            Self::StorageUnavailable(_) => "storage temporarily unavailable".to_string(),
            Self::Internal(_) => "internal error".to_string(),
            Self::Unauthenticated { .. } => "authentication required".to_string(),
            other => other.to_string(),
        };
        Rejection {
            code: self.code(),
            message,
        }
    }

    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}

/// Machine-readable rejection reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub code: &'static str,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_detail_is_not_exposed() {
        let err = WardenError::StorageUnavailable("connection reset by 10.0.0.7:8000".into());
        let rejection = err.rejection();
        assert_eq!(rejection.code, "storage_unavailable");
        assert!(!rejection.message.contains("10.0.0.7"));
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(WardenError::OriginBlocked.code(), "origin_blocked");
        assert_eq!(WardenError::InvalidCredentials.code(), "invalid_credentials");
        assert_eq!(WardenError::forbidden("x").code(), "forbidden");
        assert_eq!(
            WardenError::DuplicateOrigin { ip: "1.2.3.4".into() }.code(),
            "duplicate_origin"
        );
        assert_eq!(WardenError::validation("x").code(), "validation_error");
    }

    #[test]
    fn invalid_credentials_message_is_generic() {
        let rejection = WardenError::InvalidCredentials.rejection();
        assert_eq!(rejection.message, "invalid credentials");
    }
}

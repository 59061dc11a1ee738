//! Database-specific error types and conversions.

use std::time::Duration;

use warden_core::error::WardenError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("query rejected: {0}")]
    Query(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("database call exceeded {0:?}")]
    Timeout(Duration),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl DbError {
    pub(crate) fn corrupt(what: &str, err: impl std::fmt::Display) -> Self {
        DbError::Corrupt(format!("{what}: {err}"))
    }
}

impl From<DbError> for WardenError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => WardenError::NotFound { entity, id },
            DbError::Query(_) | DbError::Corrupt(_) => WardenError::Internal(err.to_string()),
            other => WardenError::StorageUnavailable(other.to_string()),
        }
    }
}

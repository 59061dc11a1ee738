//! Warden database layer: SurrealDB connection management, schema
//! migrations and the repository implementations for the
//! `warden-core` traits.

mod connection;
mod deadline;
mod error;
mod schema;

pub mod repository;

pub use connection::{DbConfig, DbCredentials, DbManager};
pub use deadline::DEFAULT_QUERY_TIMEOUT;
pub use error::DbError;
pub use repository::{
    SurrealAuditEventRepository, SurrealBlockedOriginRepository, SurrealPrincipalRepository,
    SurrealSessionRepository, SurrealTenantRepository,
};
pub use schema::{latest_version, run_migrations};

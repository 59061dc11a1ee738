//! SurrealDB repository implementations.

mod audit;
mod blocked_origin;
mod principal;
mod session;
mod tenant;

pub use audit::SurrealAuditEventRepository;
pub use blocked_origin::SurrealBlockedOriginRepository;
pub use principal::SurrealPrincipalRepository;
pub use session::SurrealSessionRepository;
pub use tenant::SurrealTenantRepository;

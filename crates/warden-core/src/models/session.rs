//! Session domain model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::principal::AdminRole;
use crate::user_agent::ClientInfo;

/// A server-tracked record of one issued token's validity window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub principal_id: Uuid,
    /// The token's `jti`. Never the bearer string itself.
    pub token_id: String,
    pub origin_ip: String,
    pub client: ClientInfo,
    /// Cleared on revocation and when the session is read past `expires_at`.
    pub is_active: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_by: Option<String>,
    pub last_active_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.revoked_at.is_none() && self.expires_at > now
    }
}

#[derive(Debug, Clone)]
pub struct CreateSession {
    pub principal_id: Uuid,
    pub token_id: String,
    pub origin_ip: String,
    /// Raw `User-Agent` header; classified on insert.
    pub user_agent: Option<String>,
    /// Becomes `created_at`; the session expires at `issued_at + ttl`.
    pub issued_at: DateTime<Utc>,
    pub ttl: Duration,
}

/// An active session joined with its owner, for the privileged roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveSession {
    pub session: Session,
    pub email: String,
    pub admin_role: AdminRole,
    pub last_ip: Option<String>,
    pub last_user_agent: Option<String>,
    pub last_admin_login: Option<DateTime<Utc>>,
}

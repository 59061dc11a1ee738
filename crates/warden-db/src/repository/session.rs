//! SurrealDB implementation of [`SessionRepository`].
//!
//! Sessions are never deleted here. Revocation clears `is_active` and
//! stamps `revoked_at`/`revoked_by`; expiry is applied when a row is
//! read.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::principal::AdminRole;
use warden_core::models::session::{ActiveSession, CreateSession, Session};
use warden_core::repository::SessionRepository;
use warden_core::user_agent::{self, ClientInfo};

use crate::deadline::{DEFAULT_QUERY_TIMEOUT, bounded};
use crate::error::DbError;
use crate::repository::principal::PrincipalRowWithId;

#[derive(Debug, SurrealValue)]
struct SessionRowWithId {
    record_id: String,
    principal_id: String,
    token_id: String,
    origin_ip: String,
    browser: String,
    os: String,
    device_type: String,
    is_active: bool,
    revoked_at: Option<DateTime<Utc>>,
    revoked_by: Option<String>,
    last_active_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl SessionRowWithId {
    fn try_into_session(self, now: DateTime<Utc>) -> Result<Session, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::corrupt("invalid session UUID", e))?;
        let principal_id = Uuid::parse_str(&self.principal_id)
            .map_err(|e| DbError::corrupt("invalid principal UUID", e))?;
        let device_type = self
            .device_type
            .parse()
            .map_err(|e: String| DbError::corrupt("session", e))?;
        Ok(Session {
            id,
            principal_id,
            token_id: self.token_id,
            origin_ip: self.origin_ip,
            client: ClientInfo {
                browser: self.browser,
                os: self.os,
                device_type,
            },
            is_active: self.is_active && self.revoked_at.is_none() && self.expires_at > now,
            revoked_at: self.revoked_at,
            revoked_by: self.revoked_by,
            last_active_at: self.last_active_at,
            expires_at: self.expires_at,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the Session repository.
#[derive(Clone)]
pub struct SurrealSessionRepository<C: Connection> {
    db: Surreal<C>,
    timeout: Duration,
}

impl<C: Connection> SurrealSessionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            db,
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn find(&self, token_id: &str) -> Result<Option<Session>, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM session \
                 WHERE token_id = $token_id",
            )
            .bind(("token_id", token_id.to_string()))
            .await?;

        let rows: Vec<SessionRowWithId> = result.take(0)?;
        rows.into_iter()
            .next()
            .map(|row| row.try_into_session(Utc::now()))
            .transpose()
    }
}

impl<C: Connection> SessionRepository for SurrealSessionRepository<C> {
    async fn create(&self, input: CreateSession) -> WardenResult<Session> {
        if input.token_id.trim().is_empty() {
            return Err(WardenError::validation("session token id is required"));
        }

        let id = Uuid::new_v4();
        let client = user_agent::classify(input.user_agent.as_deref());
        let now = input.issued_at;
        let expires_at = now + input.ttl;

        bounded(self.timeout, async {
            self.db
                .query(
                    "CREATE type::record('session', $id) SET \
                     principal_id = $principal_id, \
                     token_id = $token_id, \
                     origin_ip = $origin_ip, \
                     browser = $browser, \
                     os = $os, \
                     device_type = $device_type, \
                     is_active = true, \
                     revoked_at = NONE, \
                     revoked_by = NONE, \
                     last_active_at = $now, \
                     expires_at = $expires_at, \
                     created_at = $now",
                )
                .bind(("id", id.to_string()))
                .bind(("principal_id", input.principal_id.to_string()))
                .bind(("token_id", input.token_id.clone()))
                .bind(("origin_ip", input.origin_ip))
                .bind(("browser", client.browser))
                .bind(("os", client.os))
                .bind(("device_type", client.device_type.as_str().to_string()))
                .bind(("now", now))
                .bind(("expires_at", expires_at))
                .await?
                .check()
                .map_err(|e| DbError::Query(e.to_string()))?;

            self.find(&input.token_id)
                .await?
                .ok_or_else(|| DbError::NotFound {
                    entity: "session".into(),
                    id: id.to_string(),
                })
        })
        .await
        .map_err(Into::into)
    }

    async fn get_by_token_id(&self, token_id: &str) -> WardenResult<Session> {
        bounded(self.timeout, async {
            self.find(token_id).await?.ok_or_else(|| DbError::NotFound {
                entity: "session".into(),
                id: format!("token_id={token_id}"),
            })
        })
        .await
        .map_err(Into::into)
    }

    async fn revoke(&self, token_id: &str, revoked_by: &str) -> WardenResult<()> {
        bounded(self.timeout, async {
            // The `revoked_at = NONE` guard keeps the first revocation's
            // stamp and makes repeated calls no-ops.
            self.db
                .query(
                    "UPDATE session SET \
                     is_active = false, \
                     revoked_at = $now, \
                     revoked_by = $revoked_by \
                     WHERE token_id = $token_id AND revoked_at = NONE",
                )
                .bind(("token_id", token_id.to_string()))
                .bind(("revoked_by", revoked_by.to_string()))
                .bind(("now", Utc::now()))
                .await?
                .check()
                .map_err(|e| DbError::Query(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(Into::into)
    }

    async fn revoke_all_for_principal(
        &self,
        principal_id: Uuid,
        revoked_by: &str,
    ) -> WardenResult<u64> {
        bounded(self.timeout, async {
            let result = self
                .db
                .query(
                    "UPDATE session SET \
                     is_active = false, \
                     revoked_at = $now, \
                     revoked_by = $revoked_by \
                     WHERE principal_id = $principal_id AND revoked_at = NONE",
                )
                .bind(("principal_id", principal_id.to_string()))
                .bind(("revoked_by", revoked_by.to_string()))
                .bind(("now", Utc::now()))
                .await?;

            let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;
            let updated: Vec<surrealdb_types::Value> = result.take(0)?;
            Ok(updated.len() as u64)
        })
        .await
        .map_err(Into::into)
    }

    async fn is_valid(&self, token_id: &str) -> WardenResult<bool> {
        bounded(self.timeout, async {
            let now = Utc::now();
            Ok(self
                .find(token_id)
                .await?
                .is_some_and(|s| s.is_valid_at(now)))
        })
        .await
        .map_err(Into::into)
    }

    async fn touch(&self, token_id: &str) -> WardenResult<()> {
        bounded(self.timeout, async {
            self.db
                .query(
                    "UPDATE session SET last_active_at = $now \
                     WHERE token_id = $token_id AND is_active = true",
                )
                .bind(("token_id", token_id.to_string()))
                .bind(("now", Utc::now()))
                .await?
                .check()
                .map_err(|e| DbError::Query(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(Into::into)
    }

    async fn list_for_principal(&self, principal_id: Uuid) -> WardenResult<Vec<Session>> {
        bounded(self.timeout, async {
            let mut result = self
                .db
                .query(
                    "SELECT meta::id(id) AS record_id, * FROM session \
                     WHERE principal_id = $principal_id \
                     ORDER BY created_at DESC",
                )
                .bind(("principal_id", principal_id.to_string()))
                .await?;

            let rows: Vec<SessionRowWithId> = result.take(0)?;
            let now = Utc::now();
            rows.into_iter()
                .map(|row| row.try_into_session(now))
                .collect::<Result<Vec<_>, DbError>>()
        })
        .await
        .map_err(Into::into)
    }

    async fn list_active_for_roles(&self, roles: &[AdminRole]) -> WardenResult<Vec<ActiveSession>> {
        let role_names: Vec<String> = roles.iter().map(|r| r.as_str().to_string()).collect();

        bounded(self.timeout, async {
            let mut result = self
                .db
                .query(
                    "SELECT meta::id(id) AS record_id, * FROM principal \
                     WHERE admin_role IN $roles AND is_admin_active = true",
                )
                .bind(("roles", role_names))
                .await?;
            let principal_rows: Vec<PrincipalRowWithId> = result.take(0)?;
            let principals = principal_rows
                .into_iter()
                .map(|row| row.try_into_principal().map(|p| (p.id.to_string(), p)))
                .collect::<Result<HashMap<_, _>, DbError>>()?;

            if principals.is_empty() {
                return Ok(Vec::new());
            }

            let now = Utc::now();
            let ids: Vec<String> = principals.keys().cloned().collect();
            let mut result = self
                .db
                .query(
                    "SELECT meta::id(id) AS record_id, * FROM session \
                     WHERE principal_id IN $ids \
                     AND is_active = true \
                     AND expires_at > $now \
                     ORDER BY created_at DESC",
                )
                .bind(("ids", ids))
                .bind(("now", now))
                .await?;
            let session_rows: Vec<SessionRowWithId> = result.take(0)?;

            let mut roster = Vec::with_capacity(session_rows.len());
            for row in session_rows {
                let session = row.try_into_session(now)?;
                let Some(owner) = principals.get(&session.principal_id.to_string()) else {
                    continue;
                };
                let Some(admin_role) = owner.admin_role else {
                    continue;
                };
                roster.push(ActiveSession {
                    email: owner.email.clone(),
                    admin_role,
                    last_ip: owner.last_ip.clone(),
                    last_user_agent: owner.last_user_agent.clone(),
                    last_admin_login: owner.last_admin_login,
                    session,
                });
            }
            // Newest login first, independent of how the store ordered ties.
            roster.sort_by(|a, b| b.session.created_at.cmp(&a.session.created_at));
            Ok(roster)
        })
        .await
        .map_err(Into::into)
    }
}

//! SurrealDB implementation of [`BlockedOriginRepository`].
//!
//! Addresses are canonicalised before every lookup and insert, so the
//! unique index on `origin_ip` sees one spelling per address.

use std::time::Duration;

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::blocked_origin::{BlockedOrigin, CreateBlockedOrigin, canonical_ip};
use warden_core::repository::BlockedOriginRepository;

use crate::deadline::{DEFAULT_QUERY_TIMEOUT, bounded};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct BlockedOriginRow {
    origin_ip: String,
    reason: String,
    blocked_by: String,
    created_at: DateTime<Utc>,
}

impl From<BlockedOriginRow> for BlockedOrigin {
    fn from(row: BlockedOriginRow) -> Self {
        Self {
            origin_ip: row.origin_ip,
            reason: row.reason,
            blocked_by: row.blocked_by,
            created_at: row.created_at,
        }
    }
}

fn is_unique_violation(message: &str) -> bool {
    message.contains("already contains") || message.contains("already exists")
}

/// SurrealDB implementation of the blocked-origin repository.
#[derive(Clone)]
pub struct SurrealBlockedOriginRepository<C: Connection> {
    db: Surreal<C>,
    timeout: Duration,
}

impl<C: Connection> SurrealBlockedOriginRepository<C> {
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

    async fn find(&self, ip: &str) -> Result<Option<BlockedOrigin>, DbError> {
        let mut result = self
            .db
            .query("SELECT * FROM blocked_origin WHERE origin_ip = $ip")
            .bind(("ip", ip.to_string()))
            .await?;
        let rows: Vec<BlockedOriginRow> = result.take(0)?;
        Ok(rows.into_iter().next().map(Into::into))
    }
}

impl<C: Connection> BlockedOriginRepository for SurrealBlockedOriginRepository<C> {
    async fn is_blocked(&self, origin_ip: &str) -> WardenResult<bool> {
        // An address that does not parse cannot be on the list.
        let Ok(ip) = canonical_ip(origin_ip) else {
            return Ok(false);
        };

        bounded(self.timeout, async { Ok(self.find(&ip).await?.is_some()) })
            .await
            .map_err(Into::into)
    }

    async fn create(&self, input: CreateBlockedOrigin) -> WardenResult<BlockedOrigin> {
        let ip = canonical_ip(&input.origin_ip)?;
        if input.reason.trim().is_empty() {
            return Err(WardenError::validation("a block reason is required"));
        }

        let outcome = bounded(self.timeout, async {
            if self.find(&ip).await?.is_some() {
                return Ok(None);
            }

            let result = self
                .db
                .query(
                    "CREATE blocked_origin SET \
                     origin_ip = $ip, reason = $reason, blocked_by = $blocked_by",
                )
                .bind(("ip", ip.clone()))
                .bind(("reason", input.reason.trim().to_string()))
                .bind(("blocked_by", input.blocked_by))
                .await?;

            match result.check() {
                Ok(mut result) => {
                    let rows: Vec<BlockedOriginRow> = result.take(0)?;
                    let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
                        entity: "blocked_origin".into(),
                        id: ip.clone(),
                    })?;
                    Ok(Some(row.into()))
                }
                // Lost a race with a concurrent insert of the same address.
                Err(e) if is_unique_violation(&e.to_string()) => Ok(None),
                Err(e) => Err(DbError::Query(e.to_string())),
            }
        })
        .await?;

        outcome.ok_or(WardenError::DuplicateOrigin { ip })
    }

    async fn delete(&self, origin_ip: &str) -> WardenResult<()> {
        let ip = canonical_ip(origin_ip)?;

        bounded(self.timeout, async {
            self.db
                .query("DELETE blocked_origin WHERE origin_ip = $ip")
                .bind(("ip", ip))
                .await?
                .check()
                .map_err(|e| DbError::Query(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(Into::into)
    }

    async fn list(&self) -> WardenResult<Vec<BlockedOrigin>> {
        bounded(self.timeout, async {
            let mut result = self
                .db
                .query("SELECT * FROM blocked_origin ORDER BY created_at DESC")
                .await?;
            let rows: Vec<BlockedOriginRow> = result.take(0)?;
            Ok(rows.into_iter().map(Into::into).collect())
        })
        .await
        .map_err(Into::into)
    }
}

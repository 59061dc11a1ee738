//! SurrealDB implementation of [`AuditEventRepository`].
//!
//! The `audit_event` table denies UPDATE and DELETE at the schema level;
//! this repository only ever issues CREATE and SELECT.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use warden_core::error::WardenResult;
use warden_core::models::audit::{
    AuditAction, AuditEvent, CreateAuditEvent, FailedLoginCluster,
};
use warden_core::repository::{
    AuditEventFilter, AuditEventRepository, PaginatedResult, Pagination,
};

use crate::deadline::{DEFAULT_QUERY_TIMEOUT, bounded};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct AuditRowWithId {
    record_id: String,
    action: String,
    actor_email: Option<String>,
    origin_ip: String,
    metadata: serde_json::Value,
    timestamp: DateTime<Utc>,
}

impl AuditRowWithId {
    fn try_into_event(self) -> Result<AuditEvent, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::corrupt("invalid audit event UUID", e))?;
        let action = self
            .action
            .parse::<AuditAction>()
            .map_err(|e| DbError::corrupt("audit_event", e))?;
        Ok(AuditEvent {
            id,
            action,
            actor_email: self.actor_email,
            origin_ip: self.origin_ip,
            metadata: self.metadata,
            timestamp: self.timestamp,
        })
    }
}

/// One `GROUP BY origin_ip` bucket of failed logins.
#[derive(Debug, SurrealValue)]
struct FailedLoginGroupRow {
    origin_ip: String,
    attempts: u64,
    last_attempt: DateTime<Utc>,
    emails: Vec<Option<String>>,
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// Metadata is stored as an object; anything else is wrapped.
fn metadata_object(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(_) => value,
        serde_json::Value::Null => serde_json::Value::Object(Default::default()),
        other => serde_json::json!({ "value": other }),
    }
}

/// Render the WHERE clause for a filter. Values are always bound, never
/// interpolated.
fn where_clause(filter: &AuditEventFilter) -> String {
    let mut conditions = Vec::new();
    if filter.action.is_some() {
        conditions.push("action = $action");
    }
    if filter.actor_email.is_some() {
        conditions.push("actor_email = $actor_email");
    }
    if filter.origin_ip.is_some() {
        conditions.push("origin_ip = $origin_ip");
    }
    if filter.from.is_some() {
        conditions.push("timestamp >= $from");
    }
    if filter.to.is_some() {
        conditions.push("timestamp <= $to");
    }
    if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    }
}

/// Order grouped buckets largest first, most recent first among equal
/// counts, and keep at most `limit`.
fn rank_clusters(rows: Vec<FailedLoginGroupRow>, limit: u64) -> Vec<FailedLoginCluster> {
    let mut clusters: Vec<FailedLoginCluster> = rows
        .into_iter()
        .map(|row| FailedLoginCluster {
            origin_ip: row.origin_ip,
            count: row.attempts,
            last_attempt: row.last_attempt,
            emails: row
                .emails
                .into_iter()
                .flatten()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
        })
        .collect();
    clusters.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| b.last_attempt.cmp(&a.last_attempt))
    });
    clusters.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
    clusters
}

/// SurrealDB implementation of the audit event repository.
#[derive(Clone)]
pub struct SurrealAuditEventRepository<C: Connection> {
    db: Surreal<C>,
    timeout: Duration,
}

impl<C: Connection> SurrealAuditEventRepository<C> {
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
}

impl<C: Connection> AuditEventRepository for SurrealAuditEventRepository<C> {
    async fn append(&self, input: CreateAuditEvent) -> WardenResult<AuditEvent> {
        let id = Uuid::new_v4();
        let timestamp = Utc::now();

        bounded(self.timeout, async {
            self.db
                .query(
                    "CREATE type::record('audit_event', $id) SET \
                     action = $action, \
                     actor_email = $actor_email, \
                     origin_ip = $origin_ip, \
                     metadata = $metadata, \
                     timestamp = $timestamp",
                )
                .bind(("id", id.to_string()))
                .bind(("action", input.action.as_str().to_string()))
                .bind(("actor_email", input.actor_email))
                .bind(("origin_ip", input.origin_ip))
                .bind(("metadata", metadata_object(input.metadata)))
                .bind(("timestamp", timestamp))
                .await?
                .check()
                .map_err(|e| DbError::Query(e.to_string()))?;

            let mut result = self
                .db
                .query(
                    "SELECT meta::id(id) AS record_id, * \
                     FROM type::record('audit_event', $id)",
                )
                .bind(("id", id.to_string()))
                .await?;

            let rows: Vec<AuditRowWithId> = result.take(0)?;
            let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
                entity: "audit_event".into(),
                id: id.to_string(),
            })?;
            row.try_into_event()
        })
        .await
        .map_err(Into::into)
    }

    async fn list(
        &self,
        filter: AuditEventFilter,
        pagination: Pagination,
    ) -> WardenResult<PaginatedResult<AuditEvent>> {
        let clause = where_clause(&filter);
        let count_sql = format!("SELECT count() AS total FROM audit_event{clause} GROUP ALL");
        let page_sql = format!(
            "SELECT meta::id(id) AS record_id, * FROM audit_event{clause} \
             ORDER BY timestamp DESC \
             LIMIT $limit START $offset"
        );

        bounded(self.timeout, async {
            let mut result = self
                .db
                .query(count_sql)
                .query(page_sql)
                .bind(("action", filter.action.map(|a| a.as_str().to_string())))
                .bind(("actor_email", filter.actor_email))
                .bind(("origin_ip", filter.origin_ip))
                .bind(("from", filter.from))
                .bind(("to", filter.to))
                .bind(("limit", pagination.limit))
                .bind(("offset", pagination.offset))
                .await?;

            let count_rows: Vec<CountRow> = result.take(0)?;
            let total = count_rows.first().map(|r| r.total).unwrap_or(0);

            let rows: Vec<AuditRowWithId> = result.take(1)?;
            let items = rows
                .into_iter()
                .map(|row| row.try_into_event())
                .collect::<Result<Vec<_>, DbError>>()?;

            Ok(PaginatedResult {
                items,
                total,
                offset: pagination.offset,
                limit: pagination.limit,
            })
        })
        .await
        .map_err(Into::into)
    }

    async fn recent(&self, actions: &[AuditAction], limit: u64) -> WardenResult<Vec<AuditEvent>> {
        if actions.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let names: Vec<String> = actions.iter().map(|a| a.as_str().to_string()).collect();

        bounded(self.timeout, async {
            let mut result = self
                .db
                .query(
                    "SELECT meta::id(id) AS record_id, * FROM audit_event \
                     WHERE action IN $actions \
                     ORDER BY timestamp DESC \
                     LIMIT $limit",
                )
                .bind(("actions", names))
                .bind(("limit", limit))
                .await?;

            let rows: Vec<AuditRowWithId> = result.take(0)?;
            rows.into_iter()
                .map(|row| row.try_into_event())
                .collect::<Result<Vec<_>, DbError>>()
        })
        .await
        .map_err(Into::into)
    }

    async fn failed_login_clusters(&self, limit: u64) -> WardenResult<Vec<FailedLoginCluster>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        bounded(self.timeout, async {
            let mut result = self
                .db
                .query(
                    "SELECT origin_ip, \
                     count() AS attempts, \
                     time::max(timestamp) AS last_attempt, \
                     array::group(actor_email) AS emails \
                     FROM audit_event \
                     WHERE action = $action \
                     GROUP BY origin_ip",
                )
                .bind(("action", AuditAction::AdminLoginFailed.as_str().to_string()))
                .await?;

            let rows: Vec<FailedLoginGroupRow> = result.take(0)?;
            Ok(rank_clusters(rows, limit))
        })
        .await
        .map_err(Into::into)
    }
}

//! Audit event recording.
//!
//! Security flows must not fail because the audit store is slow or down.
//! They call [`EventRecorder::note`], which logs and counts a failed
//! write instead of returning it. Callers that need to know whether an
//! event was written use [`EventRecorder::record`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tracing::warn;
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::audit::{AuditAction, AuditEvent, CreateAuditEvent};
use warden_core::repository::{AuditEventFilter, AuditEventRepository, Page, PageRequest};

/// Failure to persist an audit event. Kept apart from the error of the
/// operation being audited.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("audit store unavailable: {0}")]
    StorageUnavailable(String),

    #[error("audit event rejected: {0}")]
    Rejected(String),
}

impl From<WardenError> for RecordError {
    fn from(err: WardenError) -> Self {
        if err.is_storage_unavailable() {
            RecordError::StorageUnavailable(err.to_string())
        } else {
            RecordError::Rejected(err.to_string())
        }
    }
}

impl From<RecordError> for WardenError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::StorageUnavailable(msg) => WardenError::StorageUnavailable(msg),
            RecordError::Rejected(msg) => WardenError::Internal(msg),
        }
    }
}

/// An event about to be written.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub action: AuditAction,
    pub actor_email: Option<String>,
    pub origin_ip: String,
    pub metadata: serde_json::Value,
}

impl AuditEntry {
    pub fn new(action: AuditAction, origin_ip: impl Into<String>) -> Self {
        Self {
            action,
            actor_email: None,
            origin_ip: origin_ip.into(),
            metadata: serde_json::Value::Object(Default::default()),
        }
    }

    pub fn actor(mut self, email: impl Into<String>) -> Self {
        self.actor_email = Some(email.into());
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Append-only audit writer.
///
/// Clones share the dropped-event counter.
#[derive(Clone)]
pub struct EventRecorder<A: AuditEventRepository> {
    repo: A,
    dropped: Arc<AtomicU64>,
}

impl<A: AuditEventRepository> EventRecorder<A> {
    pub fn new(repo: A) -> Self {
        Self {
            repo,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Write an event, reporting failure to the caller.
    pub async fn record(&self, entry: AuditEntry) -> Result<AuditEvent, RecordError> {
        let event = self
            .repo
            .append(CreateAuditEvent {
                action: entry.action,
                actor_email: entry.actor_email,
                origin_ip: entry.origin_ip,
                metadata: entry.metadata,
            })
            .await?;
        Ok(event)
    }

    /// Write an event on a best-effort basis. Never fails.
    pub async fn note(&self, entry: AuditEntry) {
        let action = entry.action;
        if let Err(e) = self.record(entry).await {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(action = %action, error = %e, "Dropped audit event");
        }
    }

    /// Number of events [`note`](Self::note) failed to write.
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// One page of the audit log, newest first.
    pub async fn page(
        &self,
        filter: AuditEventFilter,
        request: PageRequest,
    ) -> WardenResult<Page<AuditEvent>> {
        let result = self.repo.list(filter, request.pagination()).await?;
        Ok(Page::from_result(request, result))
    }
}

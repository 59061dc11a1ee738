//! Security analytics over the audit log and the session store.

use serde::Serialize;
use tracing::warn;
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::audit::{AuditAction, AuditEvent, FailedLoginCluster};
use warden_core::models::principal::AdminRole;
use warden_core::models::session::ActiveSession;
use warden_core::repository::{AuditEventRepository, SessionRepository};

/// Rows returned per analytics view.
pub const VIEW_LIMIT: u64 = 20;

/// A view that failed and was returned empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewDiagnostic {
    pub view: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecurityReport {
    pub failed_login_clusters: Vec<FailedLoginCluster>,
    pub pin_audit: Vec<AuditEvent>,
    pub permission_changes: Vec<AuditEvent>,
    pub active_sessions: Vec<ActiveSession>,
    pub diagnostics: Vec<ViewDiagnostic>,
}

pub struct SecurityAggregator<A: AuditEventRepository, S: SessionRepository> {
    audit: A,
    sessions: S,
}

impl<A: AuditEventRepository, S: SessionRepository> SecurityAggregator<A, S> {
    pub fn new(audit: A, sessions: S) -> Self {
        Self { audit, sessions }
    }

    /// Compute all four views concurrently.
    ///
    /// A view failing for any reason other than storage unavailability
    /// comes back empty with a diagnostic; storage unavailability fails
    /// the whole report.
    pub async fn report(&self) -> WardenResult<SecurityReport> {
        let (clusters, pins, permissions, sessions) = tokio::join!(
            self.audit.failed_login_clusters(VIEW_LIMIT),
            self.audit.recent(&[AuditAction::PinSent], VIEW_LIMIT),
            self.audit.recent(
                &[AuditAction::RoleGranted, AuditAction::RoleRevoked],
                VIEW_LIMIT
            ),
            self.sessions.list_active_for_roles(&AdminRole::ALL),
        );

        let mut diagnostics = Vec::new();
        Ok(SecurityReport {
            failed_login_clusters: settle("failed_login_clusters", clusters, &mut diagnostics)?,
            pin_audit: settle("pin_audit", pins, &mut diagnostics)?,
            permission_changes: settle("permission_changes", permissions, &mut diagnostics)?,
            active_sessions: settle("active_sessions", sessions, &mut diagnostics)?,
            diagnostics,
        })
    }

    pub async fn active_sessions(&self) -> WardenResult<Vec<ActiveSession>> {
        self.sessions.list_active_for_roles(&AdminRole::ALL).await
    }
}

fn settle<T>(
    view: &'static str,
    result: WardenResult<Vec<T>>,
    diagnostics: &mut Vec<ViewDiagnostic>,
) -> WardenResult<Vec<T>> {
    match result {
        Ok(rows) => Ok(rows),
        Err(e @ WardenError::StorageUnavailable(_)) => Err(e),
        Err(e) => {
            warn!(view, error = %e, "Security view degraded");
            diagnostics.push(ViewDiagnostic {
                view,
                message: e.rejection().message,
            });
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_storage_failures_degrade_to_empty() {
        let mut diagnostics = Vec::new();
        let rows: Vec<u8> = settle(
            "pin_audit",
            Err(WardenError::Internal("corrupt row".into())),
            &mut diagnostics,
        )
        .unwrap();

        assert!(rows.is_empty());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].view, "pin_audit");
    }

    #[test]
    fn storage_failures_propagate() {
        let mut diagnostics = Vec::new();
        let result: WardenResult<Vec<u8>> = settle(
            "active_sessions",
            Err(WardenError::StorageUnavailable("timeout".into())),
            &mut diagnostics,
        );
        assert!(result.unwrap_err().is_storage_unavailable());
        assert!(diagnostics.is_empty());
    }
}

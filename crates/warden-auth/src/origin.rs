//! Network-origin block list.

use serde_json::json;
use tracing::info;
use warden_core::error::WardenResult;
use warden_core::models::audit::AuditAction;
use warden_core::models::blocked_origin::{BlockedOrigin, CreateBlockedOrigin, canonical_ip};
use warden_core::repository::{AuditEventRepository, BlockedOriginRepository};

use crate::recorder::{AuditEntry, EventRecorder};

/// Consulted before any credential is looked at.
#[derive(Clone)]
pub struct OriginGuard<B: BlockedOriginRepository, A: AuditEventRepository> {
    repo: B,
    recorder: EventRecorder<A>,
}

impl<B: BlockedOriginRepository, A: AuditEventRepository> OriginGuard<B, A> {
    pub fn new(repo: B, recorder: EventRecorder<A>) -> Self {
        Self { repo, recorder }
    }

    pub async fn is_blocked(&self, origin_ip: &str) -> WardenResult<bool> {
        self.repo.is_blocked(origin_ip).await
    }

    /// Block `origin_ip`. An existing block is never overwritten.
    pub async fn block(
        &self,
        origin_ip: &str,
        reason: &str,
        blocked_by: &str,
        request_ip: &str,
    ) -> WardenResult<BlockedOrigin> {
        let blocked = self
            .repo
            .create(CreateBlockedOrigin {
                origin_ip: origin_ip.to_string(),
                reason: reason.to_string(),
                blocked_by: blocked_by.to_string(),
            })
            .await?;

        info!(origin_ip = %blocked.origin_ip, blocked_by, "Origin blocked");
        self.recorder
            .note(
                AuditEntry::new(AuditAction::OriginBlocked, request_ip)
                    .actor(blocked_by)
                    .metadata(json!({
                        "blockedIp": blocked.origin_ip,
                        "reason": blocked.reason,
                    })),
            )
            .await;
        Ok(blocked)
    }

    /// Remove a block. Unblocking an address that is not blocked is a
    /// no-op and records nothing.
    pub async fn unblock(
        &self,
        origin_ip: &str,
        unblocked_by: &str,
        request_ip: &str,
    ) -> WardenResult<()> {
        let ip = canonical_ip(origin_ip)?;
        if !self.repo.is_blocked(&ip).await? {
            return Ok(());
        }
        self.repo.delete(&ip).await?;

        info!(origin_ip = %ip, unblocked_by, "Origin unblocked");
        self.recorder
            .note(
                AuditEntry::new(AuditAction::OriginUnblocked, request_ip)
                    .actor(unblocked_by)
                    .metadata(json!({ "unblockedIp": ip })),
            )
            .await;
        Ok(())
    }

    /// Every block, newest first.
    pub async fn list(&self) -> WardenResult<Vec<BlockedOrigin>> {
        self.repo.list().await
    }
}

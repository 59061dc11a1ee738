//! Request-facing admin operations with role gating.
//!
//! [`AdminConsole`] wires the recorder, origin guard, authenticator,
//! impersonation issuer and aggregator over one set of repositories and
//! checks the caller's role before delegating.

use std::sync::Arc;

use serde_json::json;
use tracing::info;
use uuid::Uuid;
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::audit::{AuditAction, AuditEvent};
use warden_core::models::blocked_origin::BlockedOrigin;
use warden_core::models::principal::{AdminRole, Principal};
use warden_core::models::session::ActiveSession;
use warden_core::repository::{
    AuditEventFilter, AuditEventRepository, BlockedOriginRepository, Page, PageRequest,
    PrincipalRepository, SessionRepository, TenantRepository,
};

use crate::aggregator::{SecurityAggregator, SecurityReport};
use crate::config::AuthConfig;
use crate::context::AuthContext;
use crate::error::AuthError;
use crate::impersonation::{ImpersonationGrant, ImpersonationIssuer};
use crate::origin::OriginGuard;
use crate::password::SecretVerifier;
use crate::recorder::{AuditEntry, EventRecorder};
use crate::service::{Authenticator, LoginOutcome, LoginRequest};

/// The repositories the console runs against.
#[derive(Clone)]
pub struct Repositories<A, S, B, P, T> {
    pub audit: A,
    pub sessions: S,
    pub origins: B,
    pub principals: P,
    pub tenants: T,
}

pub struct AdminConsole<A, S, B, P, T, V>
where
    A: AuditEventRepository + Clone,
    S: SessionRepository + Clone,
    B: BlockedOriginRepository + Clone,
    P: PrincipalRepository + Clone,
    T: TenantRepository,
    V: SecretVerifier,
{
    recorder: EventRecorder<A>,
    guard: OriginGuard<B, A>,
    authenticator: Authenticator<P, S, B, A, V>,
    impersonation: ImpersonationIssuer<T, A>,
    aggregator: SecurityAggregator<A, S>,
    principals: P,
    sessions: S,
}

impl<A, S, B, P, T, V> AdminConsole<A, S, B, P, T, V>
where
    A: AuditEventRepository + Clone,
    S: SessionRepository + Clone,
    B: BlockedOriginRepository + Clone,
    P: PrincipalRepository + Clone,
    T: TenantRepository,
    V: SecretVerifier,
{
    /// Build the console. Fails if `config` does not validate.
    pub fn new(
        repos: Repositories<A, S, B, P, T>,
        verifier: V,
        config: AuthConfig,
    ) -> Result<Self, AuthError> {
        config.validate()?;
        let config = Arc::new(config);

        let recorder = EventRecorder::new(repos.audit.clone());
        let guard = OriginGuard::new(repos.origins, recorder.clone());
        let authenticator = Authenticator::new(
            repos.principals.clone(),
            repos.sessions.clone(),
            guard.clone(),
            recorder.clone(),
            verifier,
            Arc::clone(&config),
        );
        let impersonation = ImpersonationIssuer::new(repos.tenants, recorder.clone(), config);
        let aggregator = SecurityAggregator::new(repos.audit, repos.sessions.clone());

        Ok(Self {
            recorder,
            guard,
            authenticator,
            impersonation,
            aggregator,
            principals: repos.principals,
            sessions: repos.sessions,
        })
    }

    pub async fn authenticate(&self, request: LoginRequest) -> WardenResult<LoginOutcome> {
        self.authenticator.authenticate(request).await
    }

    pub async fn verify(&self, bearer: &str, origin_ip: &str) -> WardenResult<AuthContext> {
        self.authenticator.verify(bearer, origin_ip).await
    }

    pub async fn logout(&self, caller: &AuthContext) -> WardenResult<()> {
        self.authenticator.logout(caller).await
    }

    pub async fn impersonate(
        &self,
        caller: &AuthContext,
        tenant_id: Uuid,
    ) -> WardenResult<ImpersonationGrant> {
        let staff = caller.require_privileged()?;
        self.impersonation
            .impersonate(staff, tenant_id, &caller.origin_ip)
            .await
    }

    pub async fn active_sessions(&self, caller: &AuthContext) -> WardenResult<Vec<ActiveSession>> {
        caller.require_privileged()?;
        self.aggregator.active_sessions().await
    }

    pub async fn security_analytics(&self, caller: &AuthContext) -> WardenResult<SecurityReport> {
        caller.require_admin()?;
        self.aggregator.report().await
    }

    pub async fn audit_log(
        &self,
        caller: &AuthContext,
        filter: AuditEventFilter,
        request: PageRequest,
    ) -> WardenResult<Page<AuditEvent>> {
        caller.require_privileged()?;
        self.recorder.page(filter, request).await
    }

    pub async fn block_origin(
        &self,
        caller: &AuthContext,
        origin_ip: &str,
        reason: &str,
    ) -> WardenResult<BlockedOrigin> {
        let staff = caller.require_privileged()?;
        self.guard
            .block(origin_ip, reason, staff.email, &caller.origin_ip)
            .await
    }

    pub async fn unblock_origin(&self, caller: &AuthContext, origin_ip: &str) -> WardenResult<()> {
        let staff = caller.require_privileged()?;
        self.guard
            .unblock(origin_ip, staff.email, &caller.origin_ip)
            .await
    }

    pub async fn blocked_origins(&self, caller: &AuthContext) -> WardenResult<Vec<BlockedOrigin>> {
        caller.require_privileged()?;
        self.guard.list().await
    }

    /// Grant, change or clear a principal's admin role.
    ///
    /// Any change bumps the target's token version and ends their
    /// sessions, so a new role only takes effect on the next login.
    pub async fn set_role(
        &self,
        caller: &AuthContext,
        principal_id: Uuid,
        role: Option<AdminRole>,
    ) -> WardenResult<Principal> {
        let staff = caller.require_admin()?;
        if staff.principal_id == principal_id {
            return Err(WardenError::validation("admins cannot change their own role"));
        }

        let before = self.principals.get_by_id(principal_id).await?;
        if before.admin_role == role {
            return Ok(before);
        }

        let updated = self.principals.set_admin_role(principal_id, role).await?;
        let version = self.principals.bump_token_version(principal_id).await?;
        self.sessions
            .revoke_all_for_principal(principal_id, staff.email)
            .await?;

        let action = if role.is_some() {
            AuditAction::RoleGranted
        } else {
            AuditAction::RoleRevoked
        };
        info!(
            principal_id = %principal_id,
            action = %action,
            changed_by = staff.email,
            "Admin role changed"
        );
        self.recorder
            .note(
                AuditEntry::new(action, &caller.origin_ip)
                    .actor(staff.email)
                    .metadata(json!({
                        "principalId": principal_id,
                        "targetEmail": updated.email,
                        "previousRole": before.admin_role,
                        "role": role,
                    })),
            )
            .await;

        Ok(Principal {
            token_version: version,
            ..updated
        })
    }

    pub async fn revoke_session(&self, caller: &AuthContext, token_id: &str) -> WardenResult<()> {
        let staff = caller.require_admin()?;
        self.authenticator
            .revoke_session(staff, token_id, &caller.origin_ip)
            .await
    }

    pub async fn revoke_all_tokens(
        &self,
        caller: &AuthContext,
        principal_id: Uuid,
    ) -> WardenResult<u64> {
        let staff = caller.require_admin()?;
        self.authenticator
            .revoke_all_tokens(staff, principal_id, &caller.origin_ip)
            .await
    }

    /// Audit events the best-effort path failed to write.
    pub fn dropped_audit_events(&self) -> u64 {
        self.recorder.dropped_events()
    }
}

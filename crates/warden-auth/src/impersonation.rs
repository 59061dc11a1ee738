//! Short-lived impersonation tokens.
//!
//! An impersonation token speaks for a tenant while naming the staff
//! member behind it in `act`. No session record is created; the token
//! simply expires.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::audit::AuditAction;
use warden_core::models::tenant::TenantRole;
use warden_core::repository::{AuditEventRepository, TenantRepository};

use crate::config::AuthConfig;
use crate::context::StaffRef;
use crate::recorder::{AuditEntry, EventRecorder};
use crate::token::{self, TokenGrant, TokenKind};

/// An issued impersonation token.
#[derive(Debug, Clone, Serialize)]
pub struct ImpersonationGrant {
    pub token: String,
    pub tenant_id: Uuid,
    pub tenant_role: TenantRole,
    pub expires_at: DateTime<Utc>,
}

pub struct ImpersonationIssuer<T: TenantRepository, A: AuditEventRepository> {
    tenants: T,
    recorder: EventRecorder<A>,
    config: Arc<AuthConfig>,
}

impl<T: TenantRepository, A: AuditEventRepository> ImpersonationIssuer<T, A> {
    pub fn new(tenants: T, recorder: EventRecorder<A>, config: Arc<AuthConfig>) -> Self {
        Self {
            tenants,
            recorder,
            config,
        }
    }

    /// Issue a token letting `actor` act as tenant `tenant_id`.
    pub async fn impersonate(
        &self,
        actor: StaffRef<'_>,
        tenant_id: Uuid,
        request_ip: &str,
    ) -> WardenResult<ImpersonationGrant> {
        let tenant = match self.tenants.get_by_id(tenant_id).await {
            Ok(t) => t,
            Err(WardenError::NotFound { .. }) => {
                return Err(WardenError::TargetNotFound {
                    id: tenant_id.to_string(),
                });
            }
            Err(e) => return Err(e),
        };

        let issued = token::issue_token(
            TokenGrant {
                sub: tenant.id.to_string(),
                role: tenant.role.as_str().to_string(),
                ver: 0,
                kind: TokenKind::Impersonation,
                act: Some(actor.principal_id.to_string()),
                lifetime_secs: self.config.impersonation_token_lifetime_secs,
            },
            &self.config,
        )?;
        let expires_at = issued.claims.expires_at()?;

        info!(
            actor_id = %actor.principal_id,
            tenant_id = %tenant.id,
            "Impersonation started"
        );
        self.recorder
            .note(
                AuditEntry::new(AuditAction::ImpersonationStarted, request_ip)
                    .actor(actor.email)
                    .metadata(json!({
                        "actorId": actor.principal_id,
                        "actorRole": actor.role,
                        "tenantId": tenant.id,
                        "tenantRole": tenant.role,
                        "tokenId": issued.claims.jti,
                        "expiresAt": expires_at,
                    })),
            )
            .await;

        Ok(ImpersonationGrant {
            token: issued.token,
            tenant_id: tenant.id,
            tenant_role: tenant.role,
            expires_at,
        })
    }
}

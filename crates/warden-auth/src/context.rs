//! Verified caller identity.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::principal::AdminRole;
use warden_core::models::tenant::TenantRole;

/// Who a verified bearer token speaks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    /// A staff member on a session token.
    Staff {
        principal_id: Uuid,
        email: String,
        role: AdminRole,
    },
    /// A staff member acting as a tenant.
    Impersonation {
        tenant_id: Uuid,
        tenant_role: TenantRole,
        acting_principal_id: Uuid,
    },
}

/// A verified request: token identity plus the request's origin.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub subject: Subject,
    /// The token's `jti`.
    pub token_id: String,
    pub expires_at: DateTime<Utc>,
    pub origin_ip: String,
}

/// The staff fields of a context that passed a privileged gate.
#[derive(Debug, Clone, Copy)]
pub struct StaffRef<'a> {
    pub principal_id: Uuid,
    pub email: &'a str,
    pub role: AdminRole,
}

impl AuthContext {
    /// Passes for any staff session. Impersonation tokens never do.
    pub fn require_privileged(&self) -> WardenResult<StaffRef<'_>> {
        match &self.subject {
            Subject::Staff {
                principal_id,
                email,
                role,
            } => Ok(StaffRef {
                principal_id: *principal_id,
                email,
                role: *role,
            }),
            Subject::Impersonation { .. } => Err(WardenError::forbidden(
                "impersonation tokens cannot use privileged operations",
            )),
        }
    }

    /// Passes only for staff sessions holding the `admin` role.
    pub fn require_admin(&self) -> WardenResult<StaffRef<'_>> {
        let staff = self.require_privileged()?;
        if staff.role != AdminRole::Admin {
            return Err(WardenError::forbidden(format!(
                "role {} may not perform this operation",
                staff.role
            )));
        }
        Ok(staff)
    }
}

//! Audit event domain model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Security-relevant action tags.
///
/// The wire and storage form is the snake_case string returned by
/// [`AuditAction::as_str`], matching records written before the enum
/// existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    AdminLoginSuccess,
    AdminLoginFailed,
    AdminLogout,
    SessionRevoked,
    TokensRevoked,
    ImpersonationStarted,
    PinSent,
    PinVerified,
    RoleGranted,
    RoleRevoked,
    OriginBlocked,
    OriginUnblocked,
    BusinessCreated,
    PaymentSuccess,
}

impl AuditAction {
    pub const ALL: [AuditAction; 14] = [
        AuditAction::AdminLoginSuccess,
        AuditAction::AdminLoginFailed,
        AuditAction::AdminLogout,
        AuditAction::SessionRevoked,
        AuditAction::TokensRevoked,
        AuditAction::ImpersonationStarted,
        AuditAction::PinSent,
        AuditAction::PinVerified,
        AuditAction::RoleGranted,
        AuditAction::RoleRevoked,
        AuditAction::OriginBlocked,
        AuditAction::OriginUnblocked,
        AuditAction::BusinessCreated,
        AuditAction::PaymentSuccess,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AdminLoginSuccess => "admin_login_success",
            Self::AdminLoginFailed => "admin_login_failed",
            Self::AdminLogout => "admin_logout",
            Self::SessionRevoked => "session_revoked",
            Self::TokensRevoked => "tokens_revoked",
            Self::ImpersonationStarted => "impersonation_started",
            Self::PinSent => "pin_sent",
            Self::PinVerified => "pin_verified",
            Self::RoleGranted => "role_granted",
            Self::RoleRevoked => "role_revoked",
            Self::OriginBlocked => "origin_blocked",
            Self::OriginUnblocked => "origin_unblocked",
            Self::BusinessCreated => "business_created",
            Self::PaymentSuccess => "payment_success",
        }
    }

    /// Role grants and revocations, the permission-change feed.
    pub fn is_permission_change(self) -> bool {
        matches!(self, Self::RoleGranted | Self::RoleRevoked)
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown audit action: {0}")]
pub struct UnknownAuditAction(pub String);

impl FromStr for AuditAction {
    type Err = UnknownAuditAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| UnknownAuditAction(s.to_string()))
    }
}

/// An immutable record of a security-relevant action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub action: AuditAction,
    pub actor_email: Option<String>,
    pub origin_ip: String,
    pub metadata: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuditEvent {
    pub action: AuditAction,
    pub actor_email: Option<String>,
    pub origin_ip: String,
    pub metadata: serde_json::Value,
}

/// One origin's failed-login aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedLoginCluster {
    pub origin_ip: String,
    pub count: u64,
    pub last_attempt: DateTime<Utc>,
    /// Distinct attempted emails, sorted.
    pub emails: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_changes_are_grants_and_revocations() {
        let feed: Vec<_> = AuditAction::ALL
            .into_iter()
            .filter(|a| a.is_permission_change())
            .collect();
        assert_eq!(feed, vec![AuditAction::RoleGranted, AuditAction::RoleRevoked]);
    }

    #[test]
    fn serde_uses_wire_strings() {
        let json = serde_json::to_string(&AuditAction::AdminLoginFailed).unwrap();
        assert_eq!(json, "\"admin_login_failed\"");
    }

    #[test]
    fn unknown_action_is_rejected() {
        let err = "admin_login_maybe".parse::<AuditAction>().unwrap_err();
        assert_eq!(err.to_string(), "unknown audit action: admin_login_maybe");
    }
}

//! Authenticator: staff login, token verification and revocation.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::audit::AuditAction;
use warden_core::models::blocked_origin::canonical_ip;
use warden_core::models::principal::{AdminRole, LoginStamp};
use warden_core::models::session::{CreateSession, Session};
use warden_core::repository::{
    AuditEventRepository, BlockedOriginRepository, PrincipalRepository, SessionRepository,
};

use crate::config::AuthConfig;
use crate::context::{AuthContext, StaffRef, Subject};
use crate::error::AuthError;
use crate::origin::OriginGuard;
use crate::password::{DUMMY_HASH, SecretVerifier};
use crate::recorder::{AuditEntry, EventRecorder};
use crate::token::{self, TokenGrant, TokenKind};

/// Recorded when the request carries no usable origin.
const UNKNOWN_ORIGIN: &str = "unknown";

/// Input for the login flow.
#[derive(Clone)]
pub struct LoginRequest {
    pub email: String,
    pub secret: String,
    pub origin_ip: String,
    pub user_agent: Option<String>,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("secret", &"<redacted>")
            .field("origin_ip", &self.origin_ip)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Successful login result.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// Signed bearer token.
    pub token: String,
    pub session: Session,
    pub role: AdminRole,
}

/// A rejected attempt and the internal reason recorded for it.
struct LoginFailure {
    error: WardenError,
    reason: &'static str,
}

impl LoginFailure {
    fn new(error: WardenError, reason: &'static str) -> Self {
        Self { error, reason }
    }
}

impl From<WardenError> for LoginFailure {
    fn from(error: WardenError) -> Self {
        let reason = if error.is_storage_unavailable() {
            "storage_unavailable"
        } else {
            "internal_error"
        };
        Self { error, reason }
    }
}

impl From<AuthError> for LoginFailure {
    fn from(error: AuthError) -> Self {
        WardenError::from(error).into()
    }
}

fn normalize_origin(raw: &str) -> String {
    match canonical_ip(raw) {
        Ok(ip) => ip,
        Err(_) if raw.trim().is_empty() => UNKNOWN_ORIGIN.to_string(),
        Err(_) => raw.trim().to_string(),
    }
}

/// Authentication service.
///
/// Generic over repository implementations so that the auth layer
/// has no dependency on the database crate.
pub struct Authenticator<P, S, B, A, V>
where
    P: PrincipalRepository,
    S: SessionRepository,
    B: BlockedOriginRepository,
    A: AuditEventRepository,
    V: SecretVerifier,
{
    principals: P,
    sessions: S,
    guard: OriginGuard<B, A>,
    recorder: EventRecorder<A>,
    verifier: V,
    config: Arc<AuthConfig>,
}

impl<P, S, B, A, V> Authenticator<P, S, B, A, V>
where
    P: PrincipalRepository,
    S: SessionRepository,
    B: BlockedOriginRepository,
    A: AuditEventRepository,
    V: SecretVerifier,
{
    pub fn new(
        principals: P,
        sessions: S,
        guard: OriginGuard<B, A>,
        recorder: EventRecorder<A>,
        verifier: V,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            principals,
            sessions,
            guard,
            recorder,
            verifier,
            config,
        }
    }

    /// Authenticate a staff member and issue a session token.
    ///
    /// Every rejected attempt records exactly one `admin_login_failed`
    /// event. Blocked origins are rejected before the request is even
    /// validated, and before any credential is looked up.
    pub async fn authenticate(&self, request: LoginRequest) -> WardenResult<LoginOutcome> {
        let email = request.email.trim().to_lowercase();
        let origin_ip = normalize_origin(&request.origin_ip);

        match self
            .attempt(&email, &request.secret, &origin_ip, request.user_agent)
            .await
        {
            Ok(outcome) => Ok(outcome),
            Err(failure) => {
                warn!(
                    origin_ip = %origin_ip,
                    reason = failure.reason,
                    "Admin login rejected"
                );
                let mut entry = AuditEntry::new(AuditAction::AdminLoginFailed, &origin_ip)
                    .metadata(json!({ "reason": failure.reason }));
                if !email.is_empty() {
                    entry = entry.actor(email);
                }
                self.recorder.note(entry).await;
                Err(failure.error)
            }
        }
    }

    async fn attempt(
        &self,
        email: &str,
        secret: &str,
        origin_ip: &str,
        user_agent: Option<String>,
    ) -> Result<LoginOutcome, LoginFailure> {
        if self.guard.is_blocked(origin_ip).await? {
            return Err(LoginFailure::new(WardenError::OriginBlocked, "blocked_origin"));
        }

        if email.is_empty() || secret.is_empty() {
            return Err(LoginFailure::new(
                WardenError::validation("email and secret are required"),
                "malformed_request",
            ));
        }

        let principal = match self.principals.get_by_email(email).await {
            Ok(p) => p,
            Err(WardenError::NotFound { .. }) => {
                // Same hashing cost as a wrong secret.
                self.verifier.verify(secret, DUMMY_HASH)?;
                return Err(LoginFailure::new(
                    WardenError::InvalidCredentials,
                    "unknown_email",
                ));
            }
            Err(e) => return Err(e.into()),
        };

        if !self.verifier.verify(secret, &principal.password_hash)? {
            return Err(LoginFailure::new(
                WardenError::InvalidCredentials,
                "wrong_secret",
            ));
        }

        let role = match (principal.admin_role, principal.is_admin_active) {
            (None, _) => {
                return Err(LoginFailure::new(
                    WardenError::forbidden("account has no administrative role"),
                    "not_privileged",
                ));
            }
            (Some(_), false) => {
                return Err(LoginFailure::new(
                    WardenError::forbidden("administrative access is suspended"),
                    "admin_inactive",
                ));
            }
            (Some(role), true) => role,
        };

        let lifetime_secs = self.config.session_token_lifetime_secs;
        let issued = token::issue_token(
            TokenGrant {
                sub: principal.id.to_string(),
                role: role.as_str().to_string(),
                ver: principal.token_version,
                kind: TokenKind::Session,
                act: None,
                lifetime_secs,
            },
            &self.config,
        )?;
        let issued_at = DateTime::from_timestamp(issued.claims.iat, 0)
            .ok_or_else(|| AuthError::TokenInvalid("iat out of range".into()))?;
        let ttl = Duration::seconds(
            i64::try_from(lifetime_secs)
                .map_err(|_| AuthError::Config("token lifetime out of range".into()))?,
        );

        let session = self
            .sessions
            .create(CreateSession {
                principal_id: principal.id,
                token_id: issued.claims.jti.clone(),
                origin_ip: origin_ip.to_string(),
                user_agent: user_agent.clone(),
                issued_at,
                ttl,
            })
            .await?;

        info!(
            principal_id = %principal.id,
            role = %role,
            origin_ip,
            "Admin login succeeded"
        );
        self.recorder
            .note(
                AuditEntry::new(AuditAction::AdminLoginSuccess, origin_ip)
                    .actor(principal.email.clone())
                    .metadata(json!({
                        "principalId": principal.id,
                        "role": role,
                        "tokenId": session.token_id,
                        "browser": session.client.browser,
                        "os": session.client.os,
                        "deviceType": session.client.device_type,
                    })),
            )
            .await;

        let stamp = LoginStamp {
            at: Utc::now(),
            ip: origin_ip.to_string(),
            user_agent,
        };
        if let Err(e) = self.principals.record_login(principal.id, stamp).await {
            warn!(principal_id = %principal.id, error = %e, "Failed to stamp last login");
        }

        Ok(LoginOutcome {
            token: issued.token,
            session,
            role,
        })
    }

    /// Verify a bearer token for a request from `origin_ip`.
    ///
    /// Session tokens must still have a live session, a current token
    /// version and a privileged, active owner. Impersonation tokens
    /// carry no session and are checked for signature and expiry only.
    pub async fn verify(&self, bearer: &str, origin_ip: &str) -> WardenResult<AuthContext> {
        let claims = token::decode_token(bearer, &self.config).inspect_err(|e| {
            debug!(error = %e, "Bearer token rejected");
        })?;
        let expires_at = claims.expires_at()?;
        let origin_ip = normalize_origin(origin_ip);

        let subject = match claims.kind {
            TokenKind::Impersonation => Subject::Impersonation {
                tenant_id: parse_uuid(&claims.sub)?,
                tenant_role: claims
                    .role
                    .parse()
                    .map_err(|e: String| AuthError::TokenInvalid(e))?,
                acting_principal_id: parse_uuid(claims.act.as_deref().unwrap_or_default())?,
            },
            TokenKind::Session => {
                if !self.sessions.is_valid(&claims.jti).await? {
                    debug!(token_id = %claims.jti, "Session revoked or expired");
                    return Err(AuthError::SessionRevoked.into());
                }

                let principal_id = parse_uuid(&claims.sub)?;
                let principal = match self.principals.get_by_id(principal_id).await {
                    Ok(p) => p,
                    Err(WardenError::NotFound { .. }) => {
                        return Err(AuthError::TokenInvalid("unknown subject".into()).into());
                    }
                    Err(e) => return Err(e),
                };
                if principal.token_version != claims.ver {
                    debug!(principal_id = %principal.id, "Token version superseded");
                    return Err(AuthError::TokenSuperseded.into());
                }
                let role = principal.privileged_role().ok_or_else(|| {
                    WardenError::unauthenticated("principal is no longer privileged")
                })?;

                if let Err(e) = self.sessions.touch(&claims.jti).await {
                    warn!(token_id = %claims.jti, error = %e, "Failed to touch session");
                }

                Subject::Staff {
                    principal_id: principal.id,
                    email: principal.email,
                    role,
                }
            }
        };

        Ok(AuthContext {
            subject,
            token_id: claims.jti,
            expires_at,
            origin_ip,
        })
    }

    /// Revoke the caller's own session.
    pub async fn logout(&self, context: &AuthContext) -> WardenResult<()> {
        let Subject::Staff {
            principal_id,
            email,
            ..
        } = &context.subject
        else {
            return Err(WardenError::forbidden(
                "impersonation tokens have no session to end",
            ));
        };

        self.sessions.revoke(&context.token_id, email).await?;
        info!(principal_id = %principal_id, "Admin logged out");
        self.recorder
            .note(
                AuditEntry::new(AuditAction::AdminLogout, &context.origin_ip)
                    .actor(email.clone())
                    .metadata(json!({ "tokenId": context.token_id })),
            )
            .await;
        Ok(())
    }

    /// Revoke one session on behalf of `actor`.
    pub async fn revoke_session(
        &self,
        actor: StaffRef<'_>,
        token_id: &str,
        request_ip: &str,
    ) -> WardenResult<()> {
        self.sessions.revoke(token_id, actor.email).await?;
        info!(token_id, revoked_by = actor.email, "Session revoked");
        self.recorder
            .note(
                AuditEntry::new(AuditAction::SessionRevoked, request_ip)
                    .actor(actor.email)
                    .metadata(json!({ "tokenId": token_id })),
            )
            .await;
        Ok(())
    }

    /// Invalidate every token a principal holds: bump the token version
    /// and revoke all of their sessions. Returns the sessions revoked.
    pub async fn revoke_all_tokens(
        &self,
        actor: StaffRef<'_>,
        principal_id: Uuid,
        request_ip: &str,
    ) -> WardenResult<u64> {
        let version = self.principals.bump_token_version(principal_id).await?;
        let revoked = self
            .sessions
            .revoke_all_for_principal(principal_id, actor.email)
            .await?;

        info!(
            principal_id = %principal_id,
            token_version = version,
            revoked,
            "Tokens revoked"
        );
        self.recorder
            .note(
                AuditEntry::new(AuditAction::TokensRevoked, request_ip)
                    .actor(actor.email)
                    .metadata(json!({
                        "principalId": principal_id,
                        "tokenVersion": version,
                        "sessionsRevoked": revoked,
                    })),
            )
            .await;
        Ok(revoked)
    }
}

fn parse_uuid(raw: &str) -> Result<Uuid, AuthError> {
    Uuid::parse_str(raw).map_err(|e| AuthError::TokenInvalid(format!("malformed subject: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_canonical_or_labelled() {
        assert_eq!(normalize_origin("::ffff:198.51.100.7"), "198.51.100.7");
        assert_eq!(normalize_origin("  "), UNKNOWN_ORIGIN);
        assert_eq!(normalize_origin("edge-proxy"), "edge-proxy");
    }

    #[test]
    fn login_request_debug_hides_secret() {
        let request = LoginRequest {
            email: "a@example.com".into(),
            secret: "hunter2".into(),
            origin_ip: "10.0.0.1".into(),
            user_agent: None,
        };
        assert!(!format!("{request:?}").contains("hunter2"));
    }

    #[test]
    fn failures_from_storage_carry_their_reason() {
        let failure = LoginFailure::from(WardenError::StorageUnavailable("down".into()));
        assert_eq!(failure.reason, "storage_unavailable");
    }
}

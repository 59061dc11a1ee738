//! Repository trait definitions for data access abstraction.
//!
//! These traits are the whole persistence surface the subsystem relies
//! on. All operations are async; implementations bound every call with
//! a timeout and report an unreachable or slow backend as
//! [`WardenError::StorageUnavailable`](crate::error::WardenError).

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{WardenError, WardenResult};
use crate::models::{
    audit::{AuditAction, AuditEvent, CreateAuditEvent, FailedLoginCluster},
    blocked_origin::{BlockedOrigin, CreateBlockedOrigin},
    principal::{AdminRole, CreatePrincipal, LoginStamp, Principal},
    session::{ActiveSession, CreateSession, Session},
    tenant::{CreateTenant, Tenant},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 200;

/// 1-based page request as exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: Option<u64>, page_size: Option<u64>) -> WardenResult<Self> {
        let req = Self {
            page: page.unwrap_or(1),
            page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        };
        if req.page == 0 {
            return Err(WardenError::validation("page numbers start at 1"));
        }
        if req.page_size == 0 || req.page_size > MAX_PAGE_SIZE {
            return Err(WardenError::validation(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        if (req.page - 1).checked_mul(req.page_size).is_none() {
            return Err(WardenError::validation("page is out of range"));
        }
        Ok(req)
    }

    pub fn pagination(&self) -> Pagination {
        Pagination {
            offset: self.page.saturating_sub(1).saturating_mul(self.page_size),
            limit: self.page_size,
        }
    }
}

/// One page of results with page metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn from_result(request: PageRequest, result: PaginatedResult<T>) -> Self {
        Self {
            items: result.items,
            total: result.total,
            page: request.page,
            page_size: request.page_size,
            total_pages: result.total.div_ceil(request.page_size),
        }
    }
}

// ---------------------------------------------------------------------------
// Audit (append-only)
// ---------------------------------------------------------------------------

/// Query filters for audit events.
#[derive(Debug, Clone, Default)]
pub struct AuditEventFilter {
    pub action: Option<AuditAction>,
    pub actor_email: Option<String>,
    pub origin_ip: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub trait AuditEventRepository: Send + Sync {
    /// Append a new audit event. No update or delete operations exist.
    fn append(
        &self,
        input: CreateAuditEvent,
    ) -> impl Future<Output = WardenResult<AuditEvent>> + Send;
    /// Newest first.
    fn list(
        &self,
        filter: AuditEventFilter,
        pagination: Pagination,
    ) -> impl Future<Output = WardenResult<PaginatedResult<AuditEvent>>> + Send;
    /// The `limit` most recent events carrying any of `actions`, newest first.
    fn recent(
        &self,
        actions: &[AuditAction],
        limit: u64,
    ) -> impl Future<Output = WardenResult<Vec<AuditEvent>>> + Send;
    /// `admin_login_failed` events grouped by origin IP, largest groups
    /// first, at most `limit` groups.
    fn failed_login_clusters(
        &self,
        limit: u64,
    ) -> impl Future<Output = WardenResult<Vec<FailedLoginCluster>>> + Send;
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

pub trait SessionRepository: Send + Sync {
    fn create(&self, input: CreateSession) -> impl Future<Output = WardenResult<Session>> + Send;
    fn get_by_token_id(
        &self,
        token_id: &str,
    ) -> impl Future<Output = WardenResult<Session>> + Send;
    /// Idempotent: unknown or already-revoked sessions are left as they are.
    fn revoke(
        &self,
        token_id: &str,
        revoked_by: &str,
    ) -> impl Future<Output = WardenResult<()>> + Send;
    /// Revoke every active session of a principal, returning how many
    /// were revoked.
    fn revoke_all_for_principal(
        &self,
        principal_id: Uuid,
        revoked_by: &str,
    ) -> impl Future<Output = WardenResult<u64>> + Send;
    fn is_valid(&self, token_id: &str) -> impl Future<Output = WardenResult<bool>> + Send;
    /// Bump `last_active_at` to now.
    fn touch(&self, token_id: &str) -> impl Future<Output = WardenResult<()>> + Send;
    fn list_for_principal(
        &self,
        principal_id: Uuid,
    ) -> impl Future<Output = WardenResult<Vec<Session>>> + Send;
    /// Active sessions owned by principals holding one of `roles`,
    /// newest login first.
    fn list_active_for_roles(
        &self,
        roles: &[AdminRole],
    ) -> impl Future<Output = WardenResult<Vec<ActiveSession>>> + Send;
}

// ---------------------------------------------------------------------------
// Blocked origins
// ---------------------------------------------------------------------------

pub trait BlockedOriginRepository: Send + Sync {
    fn is_blocked(&self, origin_ip: &str) -> impl Future<Output = WardenResult<bool>> + Send;
    /// Fails with `DuplicateOrigin` if the origin is already blocked.
    fn create(
        &self,
        input: CreateBlockedOrigin,
    ) -> impl Future<Output = WardenResult<BlockedOrigin>> + Send;
    /// Idempotent.
    fn delete(&self, origin_ip: &str) -> impl Future<Output = WardenResult<()>> + Send;
    fn list(&self) -> impl Future<Output = WardenResult<Vec<BlockedOrigin>>> + Send;
}

// ---------------------------------------------------------------------------
// Platform-owned entities
// ---------------------------------------------------------------------------

pub trait PrincipalRepository: Send + Sync {
    fn create(&self, input: CreatePrincipal)
    -> impl Future<Output = WardenResult<Principal>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = WardenResult<Principal>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = WardenResult<Principal>> + Send;
    fn record_login(
        &self,
        id: Uuid,
        stamp: LoginStamp,
    ) -> impl Future<Output = WardenResult<()>> + Send;
    /// Increment the token version and return the new value.
    fn bump_token_version(&self, id: Uuid) -> impl Future<Output = WardenResult<u64>> + Send;
    fn set_admin_role(
        &self,
        id: Uuid,
        role: Option<AdminRole>,
    ) -> impl Future<Output = WardenResult<Principal>> + Send;
}

pub trait TenantRepository: Send + Sync {
    fn create(&self, input: CreateTenant) -> impl Future<Output = WardenResult<Tenant>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = WardenResult<Tenant>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_two_of_forty_five() {
        let req = PageRequest::new(Some(2), Some(20)).unwrap();
        let p = req.pagination();
        assert_eq!((p.offset, p.limit), (20, 20));

        let page = Page::from_result(
            req,
            PaginatedResult {
                items: vec![(); 20],
                total: 45,
                offset: p.offset,
                limit: p.limit,
            },
        );
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 20);
    }

    #[test]
    fn empty_result_has_zero_pages() {
        let req = PageRequest::default();
        let page: Page<()> = Page::from_result(
            req,
            PaginatedResult {
                items: vec![],
                total: 0,
                offset: 0,
                limit: req.page_size,
            },
        );
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn rejects_pages_past_the_addressable_offset() {
        let err = PageRequest::new(Some(u64::MAX), Some(20)).unwrap_err();
        assert!(matches!(err, WardenError::Validation { .. }));

        let last = u64::MAX / MAX_PAGE_SIZE;
        let req = PageRequest::new(Some(last), Some(MAX_PAGE_SIZE)).unwrap();
        assert_eq!(req.pagination().offset, (last - 1) * MAX_PAGE_SIZE);
    }

    #[test]
    fn rejects_page_zero_and_empty_pages() {
        assert!(PageRequest::new(Some(0), None).is_err());
        assert!(PageRequest::new(None, Some(0)).is_err());
        assert!(PageRequest::new(None, Some(MAX_PAGE_SIZE + 1)).is_err());
        assert_eq!(PageRequest::new(None, None).unwrap(), PageRequest::default());
    }
}

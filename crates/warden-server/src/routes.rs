//! HTTP routes over the admin console.

use std::net::IpAddr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use surrealdb::engine::any::Any;
use tokio::sync::OnceCell;
use uuid::Uuid;
use warden_auth::{
    AdminConsole, Argon2Verifier, ImpersonationGrant, LoginRequest, Repositories, SecurityReport,
};
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::audit::{AuditAction, AuditEvent};
use warden_core::models::blocked_origin::BlockedOrigin;
use warden_core::models::principal::AdminRole;
use warden_core::models::session::ActiveSession;
use warden_core::repository::{AuditEventFilter, Page, PageRequest};
use warden_db::DbManager;
use warden_db::repository::{
    SurrealAuditEventRepository, SurrealBlockedOriginRepository, SurrealPrincipalRepository,
    SurrealSessionRepository, SurrealTenantRepository,
};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::extract::{Caller, ClientMeta};

pub type LiveConsole = AdminConsole<
    SurrealAuditEventRepository<Any>,
    SurrealSessionRepository<Any>,
    SurrealBlockedOriginRepository<Any>,
    SurrealPrincipalRepository<Any>,
    SurrealTenantRepository<Any>,
    Argon2Verifier,
>;

/// Shared handler state.
///
/// The console is wired on first use, once the database barrier in
/// [`DbManager`] has connected. A failed connect leaves it unbuilt and
/// the next request tries again.
#[derive(Clone)]
pub struct AppState {
    pub db: DbManager,
    config: Arc<ServerConfig>,
    console: Arc<OnceCell<Arc<LiveConsole>>>,
}

impl AppState {
    /// Validate the configuration without touching the network.
    pub fn new(config: &ServerConfig) -> anyhow::Result<Self> {
        config.auth.validate()?;
        Ok(Self {
            db: DbManager::new(config.db.clone()),
            config: Arc::new(config.clone()),
            console: Arc::new(OnceCell::new()),
        })
    }

    pub fn trusted_proxies(&self) -> &[IpAddr] {
        &self.config.trusted_proxies
    }

    /// The admin console, connecting to the database on first use.
    pub async fn console(&self) -> WardenResult<Arc<LiveConsole>> {
        let console = self
            .console
            .get_or_try_init(|| self.build_console())
            .await?;
        Ok(Arc::clone(console))
    }

    async fn build_console(&self) -> WardenResult<Arc<LiveConsole>> {
        let client = self.db.client().await?;
        let timeout = self.config.db.query_timeout;
        let auth = &self.config.auth;

        let principals = match &auth.pepper {
            Some(pepper) => SurrealPrincipalRepository::with_pepper(client.clone(), pepper.clone()),
            None => SurrealPrincipalRepository::new(client.clone()),
        };
        let repos = Repositories {
            audit: SurrealAuditEventRepository::new(client.clone()).with_timeout(timeout),
            sessions: SurrealSessionRepository::new(client.clone()).with_timeout(timeout),
            origins: SurrealBlockedOriginRepository::new(client.clone()).with_timeout(timeout),
            principals: principals.with_timeout(timeout),
            tenants: SurrealTenantRepository::new(client).with_timeout(timeout),
        };
        let verifier = Argon2Verifier::new(auth.pepper.clone());
        let console = AdminConsole::new(repos, verifier, auth.clone())?;
        Ok(Arc::new(console))
    }

    /// Zero until the console exists.
    pub fn dropped_audit_events(&self) -> u64 {
        self.console
            .get()
            .map_or(0, |console| console.dropped_audit_events())
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/admin/impersonate/{tenant_id}", post(impersonate))
        .route("/admin/sessions", get(active_sessions))
        .route("/admin/sessions/{token_id}", delete(revoke_session))
        .route("/admin/security", get(security_analytics))
        .route("/admin/audit-log", get(audit_log))
        .route(
            "/admin/blocked-origins",
            get(blocked_origins).post(block_origin),
        )
        .route("/admin/blocked-origins/{ip}", delete(unblock_origin))
        .route("/admin/principals/{id}/role", put(set_role))
        .route("/admin/principals/{id}/revoke-tokens", post(revoke_tokens))
        .with_state(state)
}

async fn healthz(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "database": if state.db.is_connected() { "connected" } else { "pending" },
        "dropped_audit_events": state.dropped_audit_events(),
    }))
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Missing fields arrive as empty strings so the attempt is still
/// audited as malformed.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoginBody {
    email: String,
    secret: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    token: String,
    token_id: String,
    role: AdminRole,
    expires_at: DateTime<Utc>,
}

async fn login(
    State(state): State<AppState>,
    meta: ClientMeta,
    Json(body): Json<LoginBody>,
) -> Result<Json<LoginResponse>, ApiError> {
    let outcome = state
        .console()
        .await?
        .authenticate(LoginRequest {
            email: body.email,
            secret: body.secret,
            origin_ip: meta.ip,
            user_agent: meta.user_agent,
        })
        .await?;

    Ok(Json(LoginResponse {
        token: outcome.token,
        token_id: outcome.session.token_id,
        role: outcome.role,
        expires_at: outcome.session.expires_at,
    }))
}

async fn logout(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<StatusCode, ApiError> {
    state.console().await?.logout(&caller).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

async fn impersonate(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<ImpersonationGrant>, ApiError> {
    Ok(Json(state.console().await?.impersonate(&caller, tenant_id).await?))
}

async fn active_sessions(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<Vec<ActiveSession>>, ApiError> {
    Ok(Json(state.console().await?.active_sessions(&caller).await?))
}

async fn revoke_session(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(token_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.console().await?.revoke_session(&caller, &token_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn security_analytics(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<SecurityReport>, ApiError> {
    Ok(Json(state.console().await?.security_analytics(&caller).await?))
}

#[derive(Debug, Default, Deserialize)]
struct AuditLogQuery {
    page: Option<u64>,
    page_size: Option<u64>,
    action: Option<String>,
    actor: Option<String>,
    origin_ip: Option<String>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

impl AuditLogQuery {
    fn into_parts(self) -> Result<(AuditEventFilter, PageRequest), WardenError> {
        let action = self
            .action
            .map(|a| a.parse::<AuditAction>())
            .transpose()
            .map_err(|e| WardenError::validation(e.to_string()))?;
        let request = PageRequest::new(self.page, self.page_size)?;
        let filter = AuditEventFilter {
            action,
            actor_email: self.actor,
            origin_ip: self.origin_ip,
            from: self.from,
            to: self.to,
        };
        Ok((filter, request))
    }
}

async fn audit_log(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<Page<AuditEvent>>, ApiError> {
    let (filter, request) = query.into_parts()?;
    Ok(Json(state.console().await?.audit_log(&caller, filter, request).await?))
}

async fn blocked_origins(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<Vec<BlockedOrigin>>, ApiError> {
    Ok(Json(state.console().await?.blocked_origins(&caller).await?))
}

#[derive(Debug, Deserialize)]
struct BlockBody {
    origin_ip: String,
    reason: String,
}

async fn block_origin(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(body): Json<BlockBody>,
) -> Result<(StatusCode, Json<BlockedOrigin>), ApiError> {
    let blocked = state
        .console()
        .await?
        .block_origin(&caller, &body.origin_ip, &body.reason)
        .await?;
    Ok((StatusCode::CREATED, Json(blocked)))
}

async fn unblock_origin(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(ip): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.console().await?.unblock_origin(&caller, &ip).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct RoleBody {
    role: Option<AdminRole>,
}

/// Principal fields safe to return.
#[derive(Debug, Serialize)]
struct PrincipalView {
    id: Uuid,
    email: String,
    admin_role: Option<AdminRole>,
    is_admin_active: bool,
    token_version: u64,
}

async fn set_role(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(principal_id): Path<Uuid>,
    Json(body): Json<RoleBody>,
) -> Result<Json<PrincipalView>, ApiError> {
    let p = state
        .console()
        .await?
        .set_role(&caller, principal_id, body.role)
        .await?;
    Ok(Json(PrincipalView {
        id: p.id,
        email: p.email,
        admin_role: p.admin_role,
        is_admin_active: p.is_admin_active,
        token_version: p.token_version,
    }))
}

async fn revoke_tokens(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(principal_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let revoked = state
        .console()
        .await?
        .revoke_all_tokens(&caller, principal_id)
        .await?;
    Ok(Json(json!({ "sessions_revoked": revoked })))
}

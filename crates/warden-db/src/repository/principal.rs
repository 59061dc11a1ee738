//! SurrealDB implementation of [`PrincipalRepository`].
//!
//! Password hashing uses Argon2id with OWASP-recommended parameters
//! (memory: 19 MiB, iterations: 2, parallelism: 1). An optional pepper
//! can be provided at construction time and must match the one the
//! authenticator verifies with.

use std::time::Duration;

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use warden_core::error::WardenResult;
use warden_core::models::principal::{AdminRole, CreatePrincipal, LoginStamp, Principal};
use warden_core::repository::PrincipalRepository;

use crate::deadline::{DEFAULT_QUERY_TIMEOUT, bounded};
use crate::error::DbError;

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
pub(crate) struct PrincipalRowWithId {
    record_id: String,
    email: String,
    password_hash: String,
    admin_role: Option<String>,
    token_version: u64,
    is_admin_active: bool,
    last_admin_login: Option<DateTime<Utc>>,
    last_ip: Option<String>,
    last_user_agent: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_role(role: Option<String>) -> Result<Option<AdminRole>, DbError> {
    role.map(|r| r.parse().map_err(|e: String| DbError::corrupt("principal", e)))
        .transpose()
}

impl PrincipalRowWithId {
    pub(crate) fn try_into_principal(self) -> Result<Principal, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::corrupt("invalid principal UUID", e))?;
        Ok(Principal {
            id,
            email: self.email,
            password_hash: self.password_hash,
            admin_role: parse_role(self.admin_role)?,
            token_version: self.token_version,
            is_admin_active: self.is_admin_active,
            last_admin_login: self.last_admin_login,
            last_ip: self.last_ip,
            last_user_agent: self.last_user_agent,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Emails are matched case-insensitively.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Hash a password with Argon2id using OWASP-recommended parameters.
///
/// If a pepper is provided, it is prepended to the password before
/// hashing. The salt is randomly generated for each call.
fn hash_password(password: &str, pepper: Option<&str>) -> Result<String, DbError> {
    // OWASP ASVS recommended: m=19456 (19 MiB), t=2, p=1
    let params = argon2::Params::new(19456, 2, 1, None)
        .map_err(|e| DbError::Query(format!("argon2 params error: {e}")))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let peppered: String;
    let input = match pepper {
        Some(p) => {
            peppered = format!("{p}{password}");
            peppered.as_bytes()
        }
        None => password.as_bytes(),
    };

    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let hash = argon2
        .hash_password(input, &salt)
        .map_err(|e| DbError::Query(format!("password hash error: {e}")))?;

    Ok(hash.to_string())
}

/// SurrealDB implementation of the Principal repository.
#[derive(Clone)]
pub struct SurrealPrincipalRepository<C: Connection> {
    db: Surreal<C>,
    /// Optional server-side pepper for password hashing.
    pepper: Option<String>,
    timeout: Duration,
}

impl<C: Connection> SurrealPrincipalRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            db,
            pepper: None,
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_pepper(db: Surreal<C>, pepper: String) -> Self {
        Self {
            pepper: Some(pepper),
            ..Self::new(db)
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn fetch(&self, id: Uuid) -> Result<Principal, DbError> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('principal', $id)")
            .bind(("id", id_str.clone()))
            .await?;

        let rows: Vec<PrincipalRowWithId> = result.take(0)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "principal".into(),
            id: id_str,
        })?;
        row.try_into_principal()
    }
}

impl<C: Connection> PrincipalRepository for SurrealPrincipalRepository<C> {
    async fn create(&self, input: CreatePrincipal) -> WardenResult<Principal> {
        let id = Uuid::new_v4();
        let password_hash = hash_password(&input.password, self.pepper.as_deref())?;

        bounded(self.timeout, async {
            self.db
                .query(
                    "CREATE type::record('principal', $id) SET \
                     email = $email, \
                     password_hash = $password_hash, \
                     admin_role = $admin_role, \
                     token_version = 0, \
                     is_admin_active = $is_admin_active, \
                     last_admin_login = NONE, \
                     last_ip = NONE, \
                     last_user_agent = NONE",
                )
                .bind(("id", id.to_string()))
                .bind(("email", normalize_email(&input.email)))
                .bind(("password_hash", password_hash))
                .bind((
                    "admin_role",
                    input.admin_role.map(|r| r.as_str().to_string()),
                ))
                .bind(("is_admin_active", input.is_admin_active))
                .await?
                .check()
                .map_err(|e| DbError::Query(e.to_string()))?;

            self.fetch(id).await
        })
        .await
        .map_err(Into::into)
    }

    async fn get_by_id(&self, id: Uuid) -> WardenResult<Principal> {
        bounded(self.timeout, self.fetch(id))
            .await
            .map_err(Into::into)
    }

    async fn get_by_email(&self, email: &str) -> WardenResult<Principal> {
        let email = normalize_email(email);

        bounded(self.timeout, async {
            let mut result = self
                .db
                .query(
                    "SELECT meta::id(id) AS record_id, * FROM principal \
                     WHERE email = $email",
                )
                .bind(("email", email.clone()))
                .await?;

            let rows: Vec<PrincipalRowWithId> = result.take(0)?;
            let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
                entity: "principal".into(),
                id: format!("email={email}"),
            })?;
            row.try_into_principal()
        })
        .await
        .map_err(Into::into)
    }

    async fn record_login(&self, id: Uuid, stamp: LoginStamp) -> WardenResult<()> {
        bounded(self.timeout, async {
            self.db
                .query(
                    "UPDATE type::record('principal', $id) SET \
                     last_admin_login = $at, \
                     last_ip = $ip, \
                     last_user_agent = $user_agent, \
                     updated_at = time::now()",
                )
                .bind(("id", id.to_string()))
                .bind(("at", stamp.at))
                .bind(("ip", stamp.ip))
                .bind(("user_agent", stamp.user_agent))
                .await?
                .check()
                .map_err(|e| DbError::Query(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(Into::into)
    }

    async fn bump_token_version(&self, id: Uuid) -> WardenResult<u64> {
        bounded(self.timeout, async {
            self.fetch(id).await?;

            self.db
                .query(
                    "UPDATE type::record('principal', $id) SET \
                     token_version += 1, updated_at = time::now()",
                )
                .bind(("id", id.to_string()))
                .await?
                .check()
                .map_err(|e| DbError::Query(e.to_string()))?;

            Ok(self.fetch(id).await?.token_version)
        })
        .await
        .map_err(Into::into)
    }

    async fn set_admin_role(&self, id: Uuid, role: Option<AdminRole>) -> WardenResult<Principal> {
        bounded(self.timeout, async {
            self.fetch(id).await?;

            self.db
                .query(
                    "UPDATE type::record('principal', $id) SET \
                     admin_role = $admin_role, updated_at = time::now()",
                )
                .bind(("id", id.to_string()))
                .bind(("admin_role", role.map(|r| r.as_str().to_string())))
                .await?
                .check()
                .map_err(|e| DbError::Query(e.to_string()))?;

            self.fetch(id).await
        })
        .await
        .map_err(Into::into)
    }
}

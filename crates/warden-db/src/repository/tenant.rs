//! SurrealDB implementation of [`TenantRepository`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use warden_core::error::WardenResult;
use warden_core::models::tenant::{CreateTenant, Tenant, TenantRole};
use warden_core::repository::TenantRepository;

use crate::deadline::{DEFAULT_QUERY_TIMEOUT, bounded};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct TenantRow {
    name: String,
    email: String,
    role: String,
    created_at: DateTime<Utc>,
}

fn parse_role(s: &str) -> Result<TenantRole, DbError> {
    s.parse().map_err(|e: String| DbError::corrupt("tenant", e))
}

impl TenantRow {
    fn into_tenant(self, id: Uuid) -> Result<Tenant, DbError> {
        Ok(Tenant {
            id,
            name: self.name,
            email: self.email,
            role: parse_role(&self.role)?,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the Tenant repository.
#[derive(Clone)]
pub struct SurrealTenantRepository<C: Connection> {
    db: Surreal<C>,
    timeout: Duration,
}

impl<C: Connection> SurrealTenantRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            db,
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl<C: Connection> TenantRepository for SurrealTenantRepository<C> {
    async fn create(&self, input: CreateTenant) -> WardenResult<Tenant> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        bounded(self.timeout, async {
            let result = self
                .db
                .query(
                    "CREATE type::record('tenant', $id) SET \
                     name = $name, email = $email, role = $role",
                )
                .bind(("id", id_str.clone()))
                .bind(("name", input.name))
                .bind(("email", input.email))
                .bind(("role", input.role.as_str().to_string()))
                .await?;

            let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

            let rows: Vec<TenantRow> = result.take(0)?;
            let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
                entity: "tenant".into(),
                id: id_str,
            })?;
            row.into_tenant(id)
        })
        .await
        .map_err(Into::into)
    }

    async fn get_by_id(&self, id: Uuid) -> WardenResult<Tenant> {
        let id_str = id.to_string();

        bounded(self.timeout, async {
            let mut result = self
                .db
                .query("SELECT * FROM type::record('tenant', $id)")
                .bind(("id", id_str.clone()))
                .await?;

            let rows: Vec<TenantRow> = result.take(0)?;
            let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
                entity: "tenant".into(),
                id: id_str,
            })?;
            row.into_tenant(id)
        })
        .await
        .map_err(Into::into)
    }
}

//! SurrealDB connection management.
//!
//! One [`DbManager`] is built at startup and handed to whatever needs a
//! database handle. The connection itself is opened on first use; every
//! clone of the manager shares the same initialisation barrier, so
//! concurrent first callers wait on a single connect and then reuse its
//! handle.

use std::sync::Arc;
use std::time::Duration;

use surrealdb::Surreal;
use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;
use tokio::sync::OnceCell;
use tracing::info;

use crate::deadline::{DEFAULT_QUERY_TIMEOUT, bounded};
use crate::error::DbError;
use crate::schema::run_migrations;

/// Root credentials for a remote SurrealDB instance.
#[derive(Debug, Clone)]
pub struct DbCredentials {
    pub username: String,
    pub password: String,
}

/// Configuration for connecting to SurrealDB.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Endpoint URL (`ws://127.0.0.1:8000`, or `mem://` for an embedded
    /// in-memory store).
    pub url: String,
    /// SurrealDB namespace.
    pub namespace: String,
    /// SurrealDB database name.
    pub database: String,
    /// `None` skips sign-in (embedded engines).
    pub credentials: Option<DbCredentials>,
    /// Upper bound for connecting and for each repository call.
    pub query_timeout: Duration,
    /// Apply pending migrations right after connecting.
    pub migrate_on_connect: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8000".into(),
            namespace: "warden".into(),
            database: "main".into(),
            credentials: Some(DbCredentials {
                username: "root".into(),
                password: "root".into(),
            }),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            migrate_on_connect: true,
        }
    }
}

/// Lazily-connected, shareable SurrealDB handle.
#[derive(Clone)]
pub struct DbManager {
    config: Arc<DbConfig>,
    db: Arc<OnceCell<Surreal<Any>>>,
}

impl DbManager {
    /// Build a manager without touching the network.
    pub fn new(config: DbConfig) -> Self {
        Self {
            config: Arc::new(config),
            db: Arc::new(OnceCell::new()),
        }
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.db.initialized()
    }

    /// Return the shared client, connecting on first use.
    ///
    /// A failed connect leaves the cell empty; the next caller retries.
    pub async fn client(&self) -> Result<Surreal<Any>, DbError> {
        let db = self
            .db
            .get_or_try_init(|| connect(&self.config))
            .await?;
        Ok(db.clone())
    }
}

async fn connect(config: &DbConfig) -> Result<Surreal<Any>, DbError> {
    info!(
        url = %config.url,
        namespace = %config.namespace,
        database = %config.database,
        "Connecting to SurrealDB"
    );

    let db = bounded(config.query_timeout, async {
        let db = any::connect(config.url.as_str()).await?;

        if let Some(creds) = &config.credentials {
            db.signin(Root {
                username: creds.username.clone(),
                password: creds.password.clone(),
            })
            .await?;
        }

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;
        Ok(db)
    })
    .await?;

    if config.migrate_on_connect {
        run_migrations(&db).await?;
    }

    info!("Successfully connected to SurrealDB");
    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use surrealdb_types::SurrealValue;

    fn mem_config() -> DbConfig {
        DbConfig {
            url: "mem://".into(),
            namespace: "test".into(),
            database: "test".into(),
            credentials: None,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn connects_lazily() {
        let manager = DbManager::new(mem_config());
        assert!(!manager.is_connected());
        manager.client().await.unwrap();
        assert!(manager.is_connected());
    }

    #[tokio::test]
    async fn concurrent_first_use_shares_one_handle() {
        let manager = DbManager::new(mem_config());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let m = manager.clone();
                tokio::spawn(async move { m.client().await })
            })
            .collect();
        let mut clients = Vec::new();
        for h in handles {
            clients.push(h.await.unwrap().unwrap());
        }

        // All clients see the same embedded store.
        clients[0]
            .query("CREATE tenant:shared SET name = 'p', email = 'p@example.com', role = 'owner'")
            .await
            .unwrap()
            .check()
            .unwrap();
        let mut result = clients[7]
            .query("SELECT count() AS total FROM tenant GROUP ALL")
            .await
            .unwrap();
        let rows: Vec<CountRow> = result.take(0).unwrap();
        assert_eq!(rows.first().map(|r| r.total), Some(1));
    }

    #[derive(Debug, surrealdb_types::SurrealValue)]
    struct CountRow {
        total: u64,
    }
}

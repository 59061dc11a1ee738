//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode. UUIDs are stored as
//! strings; enums are stored as their wire strings with ASSERT
//! constraints.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: SCHEMA_V1,
    },
    Migration {
        version: 2,
        name: "audit_analytics_indexes",
        sql: SCHEMA_V2,
    },
];

// -----------------------------------------------------------------------
// Schema v1: initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Principals (platform staff accounts)
-- =======================================================================
DEFINE TABLE principal SCHEMAFULL;
DEFINE FIELD email ON TABLE principal TYPE string;
DEFINE FIELD password_hash ON TABLE principal TYPE string;
DEFINE FIELD admin_role ON TABLE principal TYPE option<string> \
    ASSERT $value = NONE OR $value IN ['admin', 'moderator', 'developer'];
DEFINE FIELD token_version ON TABLE principal TYPE int DEFAULT 0;
DEFINE FIELD is_admin_active ON TABLE principal TYPE bool DEFAULT true;
DEFINE FIELD last_admin_login ON TABLE principal TYPE option<datetime>;
DEFINE FIELD last_ip ON TABLE principal TYPE option<string>;
DEFINE FIELD last_user_agent ON TABLE principal TYPE option<string>;
DEFINE FIELD created_at ON TABLE principal TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE principal TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_principal_email ON TABLE principal \
    COLUMNS email UNIQUE;

-- =======================================================================
-- Tenants (impersonation targets)
-- =======================================================================
DEFINE TABLE tenant SCHEMAFULL;
DEFINE FIELD name ON TABLE tenant TYPE string;
DEFINE FIELD email ON TABLE tenant TYPE string;
DEFINE FIELD role ON TABLE tenant TYPE string \
    ASSERT $value IN ['owner', 'staff'];
DEFINE FIELD created_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();

-- =======================================================================
-- Sessions (never deleted by expiry; login history is kept)
-- =======================================================================
DEFINE TABLE session SCHEMAFULL;
DEFINE FIELD principal_id ON TABLE session TYPE string;
DEFINE FIELD token_id ON TABLE session TYPE string;
DEFINE FIELD origin_ip ON TABLE session TYPE string;
DEFINE FIELD browser ON TABLE session TYPE string;
DEFINE FIELD os ON TABLE session TYPE string;
DEFINE FIELD device_type ON TABLE session TYPE string \
    ASSERT $value IN ['Mobile', 'Tablet', 'Desktop', 'Unknown'];
DEFINE FIELD is_active ON TABLE session TYPE bool DEFAULT true;
DEFINE FIELD revoked_at ON TABLE session TYPE option<datetime>;
DEFINE FIELD revoked_by ON TABLE session TYPE option<string>;
DEFINE FIELD last_active_at ON TABLE session TYPE datetime;
DEFINE FIELD expires_at ON TABLE session TYPE datetime;
DEFINE FIELD created_at ON TABLE session TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_session_token ON TABLE session \
    COLUMNS token_id UNIQUE;
DEFINE INDEX idx_session_principal ON TABLE session \
    COLUMNS principal_id;

-- =======================================================================
-- Audit events (append-only)
-- =======================================================================
DEFINE TABLE audit_event SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD action ON TABLE audit_event TYPE string \
    ASSERT $value IN ['admin_login_success', 'admin_login_failed', \
    'admin_logout', 'session_revoked', 'tokens_revoked', \
    'impersonation_started', 'pin_sent', 'pin_verified', \
    'role_granted', 'role_revoked', 'origin_blocked', \
    'origin_unblocked', 'business_created', 'payment_success'];
DEFINE FIELD actor_email ON TABLE audit_event TYPE option<string>;
DEFINE FIELD origin_ip ON TABLE audit_event TYPE string;
DEFINE FIELD metadata ON TABLE audit_event TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD timestamp ON TABLE audit_event TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_audit_time ON TABLE audit_event \
    COLUMNS timestamp;

-- =======================================================================
-- Blocked origins
-- =======================================================================
DEFINE TABLE blocked_origin SCHEMAFULL;
DEFINE FIELD origin_ip ON TABLE blocked_origin TYPE string;
DEFINE FIELD reason ON TABLE blocked_origin TYPE string;
DEFINE FIELD blocked_by ON TABLE blocked_origin TYPE string;
DEFINE FIELD created_at ON TABLE blocked_origin TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_blocked_origin_ip ON TABLE blocked_origin \
    COLUMNS origin_ip UNIQUE;
";

// -----------------------------------------------------------------------
// Schema v2: indexes backing the security analytics views
// -----------------------------------------------------------------------

const SCHEMA_V2: &str = "\
DEFINE INDEX IF NOT EXISTS idx_audit_action_time ON TABLE audit_event \
    COLUMNS action, timestamp;
DEFINE INDEX IF NOT EXISTS idx_audit_origin ON TABLE audit_event \
    COLUMNS origin_ip;
DEFINE INDEX IF NOT EXISTS idx_session_active ON TABLE session \
    COLUMNS is_active, expires_at;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Current schema version after all migrations.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

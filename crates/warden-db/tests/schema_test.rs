//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    warden_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info = info.expect("INFO FOR DB should return a value");
    let info_str = format!("{:?}", info);

    for table in ["principal", "tenant", "session", "audit_event", "blocked_origin", "_migration"] {
        assert!(info_str.contains(table), "missing {table} table");
    }
}

#[tokio::test]
async fn migration_is_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    warden_db::run_migrations(&db).await.unwrap();
    warden_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("SELECT * FROM _migration").await.unwrap();
    let records: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert_eq!(
        records.len(),
        warden_db::latest_version() as usize,
        "each migration is recorded exactly once"
    );
}

#[tokio::test]
async fn unknown_audit_action_is_rejected_by_schema() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    warden_db::run_migrations(&db).await.unwrap();

    let result = db
        .query(
            "CREATE audit_event SET \
             action = 'admin_login_maybe', \
             origin_ip = '10.0.0.1', \
             metadata = {}",
        )
        .await
        .unwrap()
        .check();

    assert!(result.is_err(), "free-form action strings must be rejected");
}

#[tokio::test]
async fn unique_index_prevents_duplicate_blocked_origins() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    warden_db::run_migrations(&db).await.unwrap();

    let insert = "CREATE blocked_origin SET \
                  origin_ip = '203.0.113.9', reason = 'spray', blocked_by = 'ops@example.com'";
    db.query(insert).await.unwrap().check().unwrap();

    let result = db.query(insert).await.unwrap().check();
    assert!(result.is_err(), "duplicate origin should be rejected");
}

#[tokio::test]
async fn admin_role_is_constrained_to_known_roles() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    warden_db::run_migrations(&db).await.unwrap();

    let create = |email: &str, role: &str| {
        format!(
            "CREATE principal SET email = '{email}', password_hash = 'x', \
             token_version = 0, is_admin_active = true{role}"
        )
    };

    let bogus = db
        .query(create("root@example.com", ", admin_role = 'superuser'"))
        .await
        .unwrap()
        .check();
    assert!(bogus.is_err(), "unknown admin roles must be rejected");

    db.query(create("dev@example.com", ", admin_role = 'developer'"))
        .await
        .unwrap()
        .check()
        .unwrap();
    db.query(create("user@example.com", ""))
        .await
        .unwrap()
        .check()
        .unwrap();
}

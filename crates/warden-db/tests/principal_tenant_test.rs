//! Integration tests for the Principal and Tenant repositories.

use chrono::Utc;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use warden_core::error::WardenError;
use warden_core::models::principal::{AdminRole, CreatePrincipal, LoginStamp};
use warden_core::models::tenant::{CreateTenant, TenantRole};
use warden_core::repository::{PrincipalRepository, TenantRepository};
use warden_db::repository::{SurrealPrincipalRepository, SurrealTenantRepository};

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    warden_db::run_migrations(&db).await.unwrap();
    db
}

fn staff(email: &str, role: Option<AdminRole>) -> CreatePrincipal {
    CreatePrincipal {
        email: email.into(),
        password: "correct horse battery staple".into(),
        admin_role: role,
        is_admin_active: true,
    }
}

#[tokio::test]
async fn create_and_get_principal() {
    let repo = SurrealPrincipalRepository::new(setup().await);

    let created = repo
        .create(staff("Ops@Example.com", Some(AdminRole::Admin)))
        .await
        .unwrap();
    assert_eq!(created.email, "ops@example.com");
    assert_eq!(created.admin_role, Some(AdminRole::Admin));
    assert_eq!(created.token_version, 0);
    assert!(created.password_hash.starts_with("$argon2id$"));

    let by_id = repo.get_by_id(created.id).await.unwrap();
    assert_eq!(by_id.email, created.email);

    let by_email = repo.get_by_email("  OPS@example.com ").await.unwrap();
    assert_eq!(by_email.id, created.id);
}

#[tokio::test]
async fn missing_principal_is_not_found() {
    let repo = SurrealPrincipalRepository::new(setup().await);

    let err = repo.get_by_email("nobody@example.com").await.unwrap_err();
    assert!(matches!(err, WardenError::NotFound { .. }));

    let err = repo.bump_token_version(uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, WardenError::NotFound { .. }));
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let repo = SurrealPrincipalRepository::new(setup().await);
    repo.create(staff("dup@example.com", None)).await.unwrap();
    assert!(repo.create(staff("DUP@example.com", None)).await.is_err());
}

#[tokio::test]
async fn record_login_stamps_last_login_fields() {
    let repo = SurrealPrincipalRepository::new(setup().await);
    let p = repo
        .create(staff("mod@example.com", Some(AdminRole::Moderator)))
        .await
        .unwrap();
    assert!(p.last_admin_login.is_none());

    let at = Utc::now();
    repo.record_login(
        p.id,
        LoginStamp {
            at,
            ip: "198.51.100.4".into(),
            user_agent: Some("curl/8.4.0".into()),
        },
    )
    .await
    .unwrap();

    let p = repo.get_by_id(p.id).await.unwrap();
    assert_eq!(p.last_ip.as_deref(), Some("198.51.100.4"));
    assert_eq!(p.last_user_agent.as_deref(), Some("curl/8.4.0"));
    assert_eq!(p.last_admin_login, Some(at));
}

#[tokio::test]
async fn token_version_only_increases() {
    let repo = SurrealPrincipalRepository::new(setup().await);
    let p = repo.create(staff("dev@example.com", None)).await.unwrap();

    assert_eq!(repo.bump_token_version(p.id).await.unwrap(), 1);
    assert_eq!(repo.bump_token_version(p.id).await.unwrap(), 2);
    assert_eq!(repo.get_by_id(p.id).await.unwrap().token_version, 2);
}

#[tokio::test]
async fn set_admin_role_grants_and_clears() {
    let repo = SurrealPrincipalRepository::new(setup().await);
    let p = repo.create(staff("new@example.com", None)).await.unwrap();

    let p = repo
        .set_admin_role(p.id, Some(AdminRole::Developer))
        .await
        .unwrap();
    assert_eq!(p.admin_role, Some(AdminRole::Developer));

    let p = repo.set_admin_role(p.id, None).await.unwrap();
    assert_eq!(p.admin_role, None);
}

#[tokio::test]
async fn create_and_get_tenant() {
    let repo = SurrealTenantRepository::new(setup().await);

    let tenant = repo
        .create(CreateTenant {
            name: "Harbour Cuts".into(),
            email: "owner@harbourcuts.example".into(),
            role: TenantRole::Owner,
        })
        .await
        .unwrap();

    let fetched = repo.get_by_id(tenant.id).await.unwrap();
    assert_eq!(fetched.name, "Harbour Cuts");
    assert_eq!(fetched.role, TenantRole::Owner);

    let err = repo.get_by_id(uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, WardenError::NotFound { .. }));
}

//! Integration tests for the blocked-origin repository.

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use warden_core::error::WardenError;
use warden_core::models::blocked_origin::CreateBlockedOrigin;
use warden_core::repository::BlockedOriginRepository;
use warden_db::repository::SurrealBlockedOriginRepository;

async fn setup() -> SurrealBlockedOriginRepository<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    warden_db::run_migrations(&db).await.unwrap();
    SurrealBlockedOriginRepository::new(db)
}

fn block(ip: &str) -> CreateBlockedOrigin {
    CreateBlockedOrigin {
        origin_ip: ip.into(),
        reason: "credential stuffing".into(),
        blocked_by: "ops@example.com".into(),
    }
}

#[tokio::test]
async fn block_check_and_unblock() {
    let repo = setup().await;
    assert!(!repo.is_blocked("203.0.113.50").await.unwrap());

    let stored = repo.create(block("203.0.113.50")).await.unwrap();
    assert_eq!(stored.blocked_by, "ops@example.com");
    assert!(repo.is_blocked("203.0.113.50").await.unwrap());

    repo.delete("203.0.113.50").await.unwrap();
    assert!(!repo.is_blocked("203.0.113.50").await.unwrap());
    // Deleting again is a no-op.
    repo.delete("203.0.113.50").await.unwrap();
}

#[tokio::test]
async fn mapped_and_padded_forms_hit_the_same_entry() {
    let repo = setup().await;
    repo.create(block(" 203.0.113.51 ")).await.unwrap();

    assert!(repo.is_blocked("::ffff:203.0.113.51").await.unwrap());
    let err = repo.create(block("203.0.113.51")).await.unwrap_err();
    assert!(matches!(err, WardenError::DuplicateOrigin { .. }));
}

#[tokio::test]
async fn garbage_addresses_are_rejected_or_unblocked() {
    let repo = setup().await;
    let err = repo.create(block("not-an-ip")).await.unwrap_err();
    assert!(matches!(err, WardenError::Validation { .. }));
    assert!(!repo.is_blocked("not-an-ip").await.unwrap());
}

#[tokio::test]
async fn list_returns_every_entry() {
    let repo = setup().await;
    repo.create(block("10.0.0.1")).await.unwrap();
    repo.create(block("2001:db8::1")).await.unwrap();

    let mut ips: Vec<_> = repo
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.origin_ip)
        .collect();
    ips.sort();
    assert_eq!(ips, vec!["10.0.0.1", "2001:db8::1"]);
}

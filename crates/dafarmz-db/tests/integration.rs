//! Integration tests for the `dafarmz-db` data layer.
//!
//! These tests require a live Dragonfly instance on `localhost:6379`.
//! Run with:
//!
//! ```bash
//! docker run -d -p 6379:6379 docker.dragonflydb.io/dragonflydb/dragonfly
//! cargo test -p dafarmz-db -- --ignored
//! ```
//!
//! All tests are marked `#[ignore]` so they are skipped during normal
//! `cargo test` runs. Each test uses its own owner id and cleans up after
//! itself.

// Integration tests use expect/unwrap extensively for clarity -- panicking
// on failure is the correct behavior in test code.
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::missing_panics_doc)]

use chrono::Utc;
use dafarmz_core::challenges::Challenges;
use dafarmz_core::store::{Credit, Farm, GameStore, Profile, StoreError};
use dafarmz_db::DragonflyPool;
use dafarmz_types::{ItemKey, OwnerId};

/// Dragonfly connection URL for the local Docker instance.
const DRAGONFLY_URL: &str = "redis://localhost:6379";

async fn connect() -> DragonflyPool {
    DragonflyPool::connect(DRAGONFLY_URL)
        .await
        .expect("Failed to connect to Dragonfly -- is Docker running?")
}

fn profile(owner: OwnerId, balance: u64) -> Profile {
    let now = Utc::now();
    let board = Challenges {
        last_refreshed_at: now,
        max_active: 1,
        options: Vec::new(),
    };
    Profile::new(owner, now, balance, board)
}

async fn cleanup(pool: &DragonflyPool, owner: OwnerId) {
    pool.delete(&format!("farm:{owner}")).await.unwrap();
    pool.delete(&format!("profile:{owner}")).await.unwrap();
    pool.delete(&format!("scenario:{owner}")).await.unwrap();
}

#[tokio::test]
#[ignore = "requires live Dragonfly instance"]
async fn profile_create_is_exclusive() {
    let pool = connect().await;
    let owner = OwnerId(9_000_001);
    cleanup(&pool, owner).await;

    assert!(pool.create_profile(&profile(owner, 100)).await.unwrap());
    assert!(!pool.create_profile(&profile(owner, 999)).await.unwrap());

    let loaded = pool.load_profile(owner).await.unwrap().unwrap();
    assert_eq!(loaded.balance, 100);

    cleanup(&pool, owner).await;
}

#[tokio::test]
#[ignore = "requires live Dragonfly instance"]
async fn credit_is_all_or_nothing() {
    let pool = connect().await;
    let owner = OwnerId(9_000_002);
    cleanup(&pool, owner).await;
    pool.create_profile(&profile(owner, 500)).await.unwrap();

    let apple = ItemKey::parse("seed:apple");
    let bought = Credit::new()
        .balance(-300)
        .item(apple.clone(), 3)
        .stat("buy.count", 3);
    let after = pool.credit(owner, &bought).await.unwrap();
    assert_eq!(after.balance, 200);
    assert_eq!(after.item_count(&apple), 3);
    assert_eq!(after.stat("buy.count"), 3);

    let too_much = Credit::new().balance(-300).item(apple.clone(), 3);
    let err = pool.credit(owner, &too_much).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Insufficient { available: 200, needed: 300, .. }
    ));
    let unchanged = pool.load_profile(owner).await.unwrap().unwrap();
    assert_eq!(unchanged.item_count(&apple), 3);

    let sold_all = Credit::new().item(apple.clone(), -3);
    let after = pool.credit(owner, &sold_all).await.unwrap();
    assert!(!after.inventory.contains_key(&apple));

    cleanup(&pool, owner).await;
}

#[tokio::test]
#[ignore = "requires live Dragonfly instance"]
async fn credit_for_unknown_owner_fails() {
    let pool = connect().await;
    let owner = OwnerId(9_000_003);
    cleanup(&pool, owner).await;

    let err = pool
        .credit(owner, &Credit::new().balance(10))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ProfileNotFound(_)));

    let board = profile(owner, 0).challenges;
    let err = pool.save_challenges(owner, &board).await.unwrap_err();
    assert!(matches!(err, StoreError::ProfileNotFound(_)));
}

#[tokio::test]
#[ignore = "requires live Dragonfly instance"]
async fn farm_and_scenario_documents() {
    let pool = connect().await;
    let owner = OwnerId(9_000_004);
    cleanup(&pool, owner).await;

    assert!(pool.load_farm(owner).await.unwrap().is_none());
    let farm = Farm::new(owner);
    pool.save_farm(&farm).await.unwrap();
    assert_eq!(pool.load_farm(owner).await.unwrap(), Some(farm));

    assert!(pool.load_scenario(owner).await.unwrap().is_none());
    assert!(!pool.delete_scenario(owner).await.unwrap());

    cleanup(&pool, owner).await;
}

#[tokio::test]
#[ignore = "requires live Dragonfly instance"]
async fn credit_past_the_counter_limit_changes_nothing() {
    let pool = connect().await;
    let owner = OwnerId(9_000_005);
    cleanup(&pool, owner).await;
    pool.create_profile(&profile(owner, 100)).await.unwrap();

    let apple = ItemKey::parse("plant:apple");
    let huge = Credit::new()
        .item(apple.clone(), 5)
        .balance(9_007_199_254_740_991);
    let err = pool.credit(owner, &huge).await.unwrap_err();
    assert!(matches!(err, StoreError::Overflow(_)));

    let unchanged = pool.load_profile(owner).await.unwrap().unwrap();
    assert_eq!(unchanged.balance, 100);
    assert_eq!(unchanged.item_count(&apple), 0);

    cleanup(&pool, owner).await;
}

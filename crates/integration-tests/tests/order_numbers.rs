//! Atomic order counter against `PostgreSQL`.
//!
//! These tests require a migrated database in `STOREFRONT_DATABASE_URL`.
//! Each test uses its own counter key, so the shared order counter is never
//! touched.

#![allow(clippy::unwrap_used)]

use std::collections::HashSet;

use souq_storefront::db::PgOrderNumberStore;
use souq_storefront::services::OrderNumberStore;

use souq_integration_tests::{test_pool, unique};

#[tokio::test]
#[ignore = "Requires PostgreSQL (STOREFRONT_DATABASE_URL)"]
async fn test_concurrent_increments_are_distinct_and_contiguous() {
    let pool = test_pool().await;
    let key = unique("test-counter");

    let tasks: Vec<_> = (0..50)
        .map(|_| {
            let (pool, key) = (pool.clone(), key.clone());
            tokio::spawn(async move { PgOrderNumberStore::new(&pool).increment(&key).await })
        })
        .collect();

    let mut values = HashSet::new();
    for task in tasks {
        assert!(values.insert(task.await.unwrap().unwrap()));
    }

    assert_eq!(values, (1..=50).collect::<HashSet<i64>>());
    assert_eq!(
        PgOrderNumberStore::new(&pool).current(&key).await.unwrap(),
        Some(50)
    );
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (STOREFRONT_DATABASE_URL)"]
async fn test_reset_restarts_at_one() {
    let pool = test_pool().await;
    let store = PgOrderNumberStore::new(&pool);
    let key = unique("test-counter");

    assert_eq!(store.current(&key).await.unwrap(), None);
    store.increment(&key).await.unwrap();
    store.increment(&key).await.unwrap();

    store.reset(&key).await.unwrap();

    assert_eq!(store.current(&key).await.unwrap(), Some(0));
    assert_eq!(store.increment(&key).await.unwrap(), 1);
}

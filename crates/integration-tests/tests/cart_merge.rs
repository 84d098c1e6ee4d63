//! Guest-to-user cart merge against `PostgreSQL`.
//!
//! These tests require a migrated database in `STOREFRONT_DATABASE_URL`.
//!
//! Run with: cargo test -p souq-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use souq_core::{CartItemId, ProductId, UserId};
use souq_storefront::db::PgCartStore;
use souq_storefront::models::CartView;
use souq_storefront::services::{CartService, CartStore};

use souq_integration_tests::{
    CURRENCY, TestToken, create_product, create_user, test_pool, unique,
};

fn quantity_of(view: &CartView, product: ProductId) -> Option<i32> {
    view.lines
        .iter()
        .find(|l| l.product_id == product)
        .map(|l| l.quantity)
}

fn item_of(view: &CartView, product: ProductId) -> CartItemId {
    view.lines
        .iter()
        .find(|l| l.product_id == product)
        .map(|l| l.item_id)
        .unwrap()
}

async fn user_cart_view(store: &PgCartStore<'_>, user: UserId) -> CartView {
    let cart = store.find_user_cart(user).await.unwrap().unwrap();
    store.cart_view(&cart).await.unwrap()
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (STOREFRONT_DATABASE_URL)"]
async fn test_login_merges_guest_cart_into_user_cart() {
    let pool = test_pool().await;
    let store = PgCartStore::new(&pool, CURRENCY);
    let service = CartService::new(&store);
    let (shared, guest_only) = (create_product(&pool, 1000).await, create_product(&pool, 250).await);
    let user = create_user(&pool).await;

    // User cart from an earlier visit
    let no_token = TestToken::default();
    service.add_item(Some(user), &no_token, shared, 2).await.unwrap();

    // Guest session
    let token = TestToken::default();
    service.add_item(None, &token, shared, 3).await.unwrap();
    service.add_item(None, &token, guest_only, 1).await.unwrap();
    let guest_cart = token.get().unwrap();

    let cart = service.resolve_cart(Some(user), &token).await.unwrap().unwrap();

    assert_eq!(cart.user_id, Some(user));
    assert_ne!(cart.id, guest_cart);
    assert_eq!(token.get(), None);
    assert!(store.find_cart(guest_cart).await.unwrap().is_none());

    let view = store.cart_view(&cart).await.unwrap();
    assert_eq!(quantity_of(&view, shared), Some(5));
    assert_eq!(quantity_of(&view, guest_only), Some(1));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (STOREFRONT_DATABASE_URL)"]
async fn test_guest_cart_is_adopted_when_user_has_none() {
    let pool = test_pool().await;
    let store = PgCartStore::new(&pool, CURRENCY);
    let service = CartService::new(&store);
    let product = create_product(&pool, 1500).await;
    let user = create_user(&pool).await;

    let token = TestToken::default();
    service.add_item(None, &token, product, 4).await.unwrap();
    let guest_cart = token.get().unwrap();

    let cart = service.resolve_cart(Some(user), &token).await.unwrap().unwrap();

    assert_eq!(cart.id, guest_cart);
    assert_eq!(cart.user_id, Some(user));
    assert_eq!(token.get(), None);
    assert_eq!(quantity_of(&user_cart_view(&store, user).await, product), Some(4));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (STOREFRONT_DATABASE_URL)"]
async fn test_concurrent_resolution_merges_once() {
    let pool = test_pool().await;
    let store = PgCartStore::new(&pool, CURRENCY);
    let service = CartService::new(&store);
    let product = create_product(&pool, 500).await;
    let user = create_user(&pool).await;

    service
        .add_item(Some(user), &TestToken::default(), product, 1)
        .await
        .unwrap();

    let guest = TestToken::default();
    service.add_item(None, &guest, product, 2).await.unwrap();
    let guest_cart = guest.get().unwrap();

    // Two requests from the same session race to merge
    let (a, b) = (TestToken::holding(guest_cart), TestToken::holding(guest_cart));
    let (ra, rb) = tokio::join!(
        service.resolve_cart(Some(user), &a),
        service.resolve_cart(Some(user), &b),
    );
    let (ca, cb) = (ra.unwrap().unwrap(), rb.unwrap().unwrap());

    assert_eq!(ca.id, cb.id);
    assert_eq!(quantity_of(&user_cart_view(&store, user).await, product), Some(3));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (STOREFRONT_DATABASE_URL)"]
async fn test_add_caps_line_at_max_quantity() {
    let pool = test_pool().await;
    let store = PgCartStore::new(&pool, CURRENCY);
    let service = CartService::new(&store);
    let product = create_product(&pool, 100).await;

    let token = TestToken::default();
    service.add_item(None, &token, product, 60).await.unwrap();
    let view = service.add_item(None, &token, product, 60).await.unwrap();

    assert_eq!(quantity_of(&view, product), Some(99));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (STOREFRONT_DATABASE_URL)"]
async fn test_removing_last_item_deletes_guest_cart() {
    let pool = test_pool().await;
    let store = PgCartStore::new(&pool, CURRENCY);
    let service = CartService::new(&store);
    let (first, second) = (create_product(&pool, 100).await, create_product(&pool, 200).await);

    let token = TestToken::default();
    service.add_item(None, &token, first, 1).await.unwrap();
    let view = service.add_item(None, &token, second, 1).await.unwrap();
    let cart_id = token.get().unwrap();

    let view = service
        .remove_item(None, &token, item_of(&view, first))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(view.lines.len(), 1);

    let after = service
        .remove_item(None, &token, item_of(&view, second))
        .await
        .unwrap();

    assert!(after.is_none());
    assert_eq!(token.get(), None);
    assert!(store.find_cart(cart_id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (STOREFRONT_DATABASE_URL)"]
async fn test_failed_merge_rolls_back_partial_writes() {
    let pool = test_pool().await;
    let store = PgCartStore::new(&pool, CURRENCY);
    let service = CartService::new(&store);
    let (shared, guest_only) = (create_product(&pool, 800).await, create_product(&pool, 300).await);
    let user = create_user(&pool).await;

    service
        .add_item(Some(user), &TestToken::default(), shared, 1)
        .await
        .unwrap();

    let token = TestToken::default();
    service.add_item(None, &token, shared, 2).await.unwrap();
    service.add_item(None, &token, guest_only, 1).await.unwrap();
    let guest_cart = token.get().unwrap();

    // Fail the guest cart delete, which runs after the line updates and inserts
    let name = unique("fail_guest_delete").replace('-', "_");
    sqlx::raw_sql(&format!(
        r"
        CREATE FUNCTION storefront.{name}() RETURNS trigger AS $$
        BEGIN
            RAISE EXCEPTION 'guest cart delete refused';
        END;
        $$ LANGUAGE plpgsql;

        CREATE TRIGGER {name}
        BEFORE DELETE ON storefront.cart
        FOR EACH ROW WHEN (OLD.id = {guest_cart})
        EXECUTE FUNCTION storefront.{name}();
        "
    ))
    .execute(&pool)
    .await
    .unwrap();

    let failed = service.resolve_cart(Some(user), &token).await;

    sqlx::raw_sql(&format!(
        r"
        DROP TRIGGER {name} ON storefront.cart;
        DROP FUNCTION storefront.{name}();
        "
    ))
    .execute(&pool)
    .await
    .unwrap();

    assert!(failed.is_err());
    assert_eq!(token.get(), Some(guest_cart));
    assert!(store.find_cart(guest_cart).await.unwrap().is_some());

    let view = user_cart_view(&store, user).await;
    assert_eq!(quantity_of(&view, shared), Some(1));
    assert_eq!(quantity_of(&view, guest_only), None);

    // Retry merges exactly once
    service.resolve_cart(Some(user), &token).await.unwrap().unwrap();

    let view = user_cart_view(&store, user).await;
    assert_eq!(quantity_of(&view, shared), Some(3));
    assert_eq!(quantity_of(&view, guest_only), Some(1));
    assert_eq!(token.get(), None);
}

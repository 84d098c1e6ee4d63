//! HTTP smoke tests against the in-process router.
//!
//! These run without a database: the pool never connects, and the routes
//! exercised here only touch the session when a cookie is present.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use tower::ServiceExt;

use souq_integration_tests::offline_state;

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health_is_ok() {
    let app = souq_storefront::app(offline_state());

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_security_headers_are_set() {
    let app = souq_storefront::app(offline_state());

    let response = app.oneshot(get("/health")).await.unwrap();
    let headers = response.headers();

    assert_eq!(
        headers
            .get(header::X_FRAME_OPTIONS)
            .and_then(|v| v.to_str().ok()),
        Some("DENY")
    );
    assert!(
        headers
            .get(header::CONTENT_SECURITY_POLICY)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|csp| csp.contains("https://unpkg.com"))
    );
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = souq_storefront::app(offline_state());
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "edge-42")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("edge-42")
    );
}

#[tokio::test]
async fn test_empty_cart_page_renders_without_session() {
    let app = souq_storefront::app(offline_state());

    let response = app.oneshot(get("/cart")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_cart_count_is_zero_for_new_visitor() {
    let app = souq_storefront::app(offline_state());

    let response = app.oneshot(get("/cart/count")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_order_history_requires_login() {
    let app = souq_storefront::app(offline_state());

    let response = app
        .oneshot(get("/account/orders"))
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok()),
        Some("/auth/login")
    );
}

#[tokio::test]
async fn test_checkout_with_no_cart_redirects_to_cart() {
    let app = souq_storefront::app(offline_state());

    let response = app.oneshot(get("/checkout")).await.unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok()),
        Some("/cart")
    );
}

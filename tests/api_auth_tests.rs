// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API authentication and CORS tests.
//!
//! These tests verify that:
//! 1. Protected routes reject requests without valid tokens
//! 2. Rejected requests never reach the document store
//! 3. Role requirements answer 403, not 401
//! 4. CORS preflight requests return correct headers

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use chrono::{Duration, Utc};
use marketplace_api::auth::{Role, TokenCodec};
use marketplace_api::models::UserRole;
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::create_test_app;

#[tokio::test]
async fn test_health_is_public() {
    let app = create_test_app();
    let (status, body) = app.send(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
}

#[tokio::test]
async fn test_protected_route_without_token() {
    let app = create_test_app();
    let (status, body) = app.send(Method::GET, "/api/profile", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], json!("unauthorized"));
    assert_eq!(app.store.calls(), 0, "guard must not touch the store");
}

#[tokio::test]
async fn test_protected_route_with_invalid_token() {
    let app = create_test_app();
    let (status, _) = app
        .send(Method::GET, "/api/profile", Some("invalid.token.here"), None)
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.store.calls(), 0);
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let app = create_test_app();
    let user_id = app
        .seed_user("rina", "rina@example.com", &[UserRole::Customer])
        .await;
    let token = app
        .state
        .tokens
        .issue_at(&user_id, Role::Customer, None, Utc::now() - Duration::hours(48))
        .unwrap();

    let (status, _) = app
        .send(Method::GET, "/api/profile", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_from_other_secret_rejected() {
    let app = create_test_app();
    let user_id = app
        .seed_user("rina", "rina@example.com", &[UserRole::Customer])
        .await;
    let token = TokenCodec::new(b"not-the-configured-secret")
        .issue(&user_id, Role::Admin, None)
        .unwrap();

    let (status, _) = app
        .send(Method::GET, "/api/customers", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bearer_prefix_optional() {
    let app = create_test_app();
    let user_id = app
        .seed_user("rina", "rina@example.com", &[UserRole::Customer])
        .await;
    let token = app.token(&user_id, Role::Customer);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/profile")
                .header(header::AUTHORIZATION, token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_profile_with_valid_token() {
    let app = create_test_app();
    let user_id = app
        .seed_user("rina", "rina@example.com", &[UserRole::Customer])
        .await;
    let token = app.token(&user_id, Role::Customer);

    let (status, body) = app
        .send(Method::GET, "/api/profile", Some(&token), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], json!(user_id));
    assert_eq!(body["email"], json!("rina@example.com"));
    assert!(body.get("password").is_none());
    assert!(body.get("reset_token").is_none());
}

#[tokio::test]
async fn test_admin_route_forbidden_for_customer() {
    let app = create_test_app();
    let user_id = app
        .seed_user("rina", "rina@example.com", &[UserRole::Customer])
        .await;
    let token = app.token(&user_id, Role::Customer);

    for uri in ["/api/customers", "/api/sellers", "/api/customer-sellers"] {
        let (status, body) = app.send(Method::GET, uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{}", uri);
        assert_eq!(body["error"], json!("forbidden"));
    }
}

#[tokio::test]
async fn test_seller_route_forbidden_for_customer() {
    let app = create_test_app();
    let user_id = app
        .seed_user("rina", "rina@example.com", &[UserRole::Customer])
        .await;
    let token = app.token(&user_id, Role::Customer);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/products",
            Some(&token),
            Some(json!({"name": "Kopi", "price": 1, "stock": 1})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/profile")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:5173"
    );
}

#[tokio::test]
async fn test_cors_rejects_unknown_origin() {
    let app = create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .header(header::ORIGIN, "https://evil.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn test_security_headers_on_errors() {
    let app = create_test_app();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/profile")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers().get("Cache-Control").unwrap(), "no-store");
    assert_eq!(response.headers().get("X-Frame-Options").unwrap(), "DENY");
}

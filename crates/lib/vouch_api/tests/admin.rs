//! Role and status administration.

mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;
use vouch_core::models::auth::Role;

#[tokio::test]
async fn non_admin_is_forbidden() {
    let app = TestApp::new();
    let user = app.user("ada@example.com", Role::User).await;
    let token = app.login("ada@example.com").await;

    let (status, body) = app.json("GET", "/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = app
        .json(
            "PATCH",
            &format!("/users/{}/role", user.id),
            Some(&token),
            Some(json!({"role": "admin"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn role_change_invalidates_target_tokens() {
    let app = TestApp::new();
    app.user("root@example.com", Role::Admin).await;
    let user = app.user("ada@example.com", Role::User).await;
    let admin = app.login("root@example.com").await;
    let old = app.login("ada@example.com").await;

    let (status, body) = app
        .json(
            "PATCH",
            &format!("/users/{}/role", user.id),
            Some(&admin),
            Some(json!({"role": "admin"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "admin");

    let (status, _) = app.json("GET", "/auth/me", Some(&old), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let fresh = app.login("ada@example.com").await;
    let (status, _) = app.json("GET", "/users", Some(&fresh), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn deactivated_user_is_locked_out() {
    let app = TestApp::new();
    app.user("root@example.com", Role::Admin).await;
    let user = app.user("ada@example.com", Role::User).await;
    let admin = app.login("root@example.com").await;
    let old = app.login("ada@example.com").await;

    let (status, body) = app
        .json(
            "PATCH",
            &format!("/users/{}/status", user.id),
            Some(&admin),
            Some(json!({"isActive": false, "reason": "spam"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isActive"], false);
    assert_eq!(body["statusReason"], "spam");

    let (status, _) = app.json("GET", "/auth/me", Some(&old), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .json(
            "POST",
            "/auth/authenticate",
            None,
            Some(json!({"email": "ada@example.com", "password": common::PASSWORD})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn invalid_user_id_is_validation_error() {
    let app = TestApp::new();
    app.user("root@example.com", Role::Admin).await;
    let admin = app.login("root@example.com").await;
    let (status, _) = app
        .json(
            "PATCH",
            "/users/not-a-uuid/status",
            Some(&admin),
            Some(json!({"isActive": false})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_lists_users() {
    let app = TestApp::new();
    app.user("root@example.com", Role::Admin).await;
    app.user("ada@example.com", Role::User).await;
    let admin = app.login("root@example.com").await;
    let (status, body) = app.json("GET", "/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"].as_array().unwrap().len(), 2);
}

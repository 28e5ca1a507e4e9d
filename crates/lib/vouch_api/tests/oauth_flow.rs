//! Third-party client registration and the authorization-code exchange.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use tower::ServiceExt;
use common::{PASSWORD, TestApp, query_param};
use serde_json::{Value, json};
use vouch_core::models::auth::Role;

const REDIRECT: &str = "https://acme.example/callback";

async fn setup() -> (TestApp, Value) {
    let app = TestApp::new();
    app.user("root@example.com", Role::Admin).await;
    app.user("user42@example.com", Role::User).await;
    let admin = app.login("root@example.com").await;

    let (status, client) = app
        .json(
            "POST",
            "/clients",
            Some(&admin),
            Some(json!({"name": "Acme", "redirect_uri": REDIRECT, "allowed_origins": ["https://acme.example"]})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    (app, client)
}

async fn authorize(app: &TestApp, client_id: &str) -> String {
    let (status, body) = app
        .json(
            "POST",
            "/auth/authenticate",
            None,
            Some(json!({
                "email": "user42@example.com",
                "password": PASSWORD,
                "client_id": client_id,
                "redirect_uri": REDIRECT,
                "state": "xyz"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let url = url::Url::parse(body["redirectUrl"].as_str().unwrap()).unwrap();
    assert!(url.as_str().starts_with(REDIRECT));
    assert_eq!(query_param(&url, "state").as_deref(), Some("xyz"));
    query_param(&url, "code").unwrap()
}

#[tokio::test]
async fn code_exchanges_once_for_client_scoped_tokens() {
    let (app, client) = setup().await;
    let client_id = client["client_id"].as_str().unwrap();
    let secret = client["client_secret"].as_str().unwrap();
    let code = authorize(&app, client_id).await;

    let creds = json!({"client_id": client_id, "client_secret": secret});
    let (status, tokens) = app
        .json("POST", &format!("/api/callback?code={code}"), None, Some(creds.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);

    // Delegated tokens are not accepted by first-party routes...
    let access = tokens["accessToken"].as_str().unwrap();
    let (status, _) = app.json("GET", "/auth/me", Some(access), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // ...but introspect as active with the client as audience.
    let (_, info) = app
        .json("POST", "/auth/introspect", None, Some(json!({"token": access})))
        .await;
    assert_eq!(info["active"], true);
    assert_eq!(info["aud"], client_id);
    assert_eq!(info["client_id"], client_id);

    let (status, body) = app
        .json("POST", &format!("/api/callback?code={code}"), None, Some(creds))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_grant");
}

#[tokio::test]
async fn wrong_secret_is_invalid_client() {
    let (app, client) = setup().await;
    let client_id = client["client_id"].as_str().unwrap();
    let code = authorize(&app, client_id).await;

    let (status, body) = app
        .json(
            "POST",
            &format!("/api/callback?code={code}"),
            None,
            Some(json!({"client_id": client_id, "client_secret": "nope"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_client");
}

#[tokio::test]
async fn missing_secret_is_invalid_client() {
    let (app, client) = setup().await;
    let client_id = client["client_id"].as_str().unwrap();
    let code = authorize(&app, client_id).await;

    let (status, body) = app
        .json(
            "POST",
            &format!("/api/callback?code={code}"),
            None,
            Some(json!({"client_id": client_id})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_client");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn missing_body_is_invalid_request() {
    let (app, client) = setup().await;
    let code = authorize(&app, client["client_id"].as_str().unwrap()).await;

    let (status, body) = app
        .json("POST", &format!("/api/callback?code={code}"), None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn missing_code_is_invalid_request() {
    let (app, client) = setup().await;
    let (status, body) = app
        .json(
            "POST",
            "/api/callback",
            None,
            Some(json!({
                "client_id": client["client_id"],
                "client_secret": client["client_secret"]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn mismatched_redirect_uri_is_rejected() {
    let (app, client) = setup().await;
    let (status, _) = app
        .json(
            "POST",
            "/auth/authenticate",
            None,
            Some(json!({
                "email": "user42@example.com",
                "password": PASSWORD,
                "client_id": client["client_id"],
                "redirect_uri": "https://evil.example/steal"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn inactive_client_cannot_receive_codes() {
    let (app, client) = setup().await;
    let admin = app.login("root@example.com").await;
    let client_id = client["client_id"].as_str().unwrap();

    let (status, updated) = app
        .json(
            "PATCH",
            &format!("/clients/{client_id}/status"),
            Some(&admin),
            Some(json!({"status": "inactive"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "inactive");

    let (status, _) = app
        .json(
            "POST",
            "/auth/authenticate",
            None,
            Some(json!({"email": "user42@example.com", "password": PASSWORD, "client_id": client_id})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn client_listing_hides_secrets_and_requires_admin() {
    let (app, _) = setup().await;
    let admin = app.login("root@example.com").await;
    let (status, body) = app.json("GET", "/clients", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let listed = &body["clients"][0];
    assert_eq!(listed["name"], "Acme");
    assert!(listed.get("clientSecret").is_none());
    assert!(listed.get("client_secret").is_none());

    let user = app.login("user42@example.com").await;
    let (status, _) = app.json("GET", "/clients", Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

async fn cors_origin(app: &TestApp, origin: &str) -> Option<String> {
    let req = Request::builder()
        .uri("/auth/jwks")
        .header(header::ORIGIN, origin)
        .body(Body::empty())
        .unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    resp.headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .map(|v| v.to_str().unwrap().to_string())
}

#[tokio::test]
async fn cors_follows_active_client_origins() {
    let (app, client) = setup().await;
    let admin = app.login("root@example.com").await;
    let client_id = client["client_id"].as_str().unwrap();

    assert_eq!(
        cors_origin(&app, "https://acme.example").await.as_deref(),
        Some("https://acme.example")
    );
    assert_eq!(
        cors_origin(&app, "http://localhost:3000").await.as_deref(),
        Some("http://localhost:3000")
    );
    assert_eq!(cors_origin(&app, "https://evil.example").await, None);

    let (status, _) = app
        .json(
            "PATCH",
            &format!("/clients/{client_id}/status"),
            Some(&admin),
            Some(json!({"status": "inactive"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cors_origin(&app, "https://acme.example").await, None);
}

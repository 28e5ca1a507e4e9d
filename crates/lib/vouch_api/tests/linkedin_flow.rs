//! Federated (LinkedIn) login against a fake provider.

mod common;

use axum::http::StatusCode;
use common::{TestApp, location, query_param};
use serde_json::json;
use vouch_api::config::ApiConfig;
use vouch_core::models::auth::Role;

async fn start(app: &TestApp, query: &str) -> String {
    let resp = app
        .request("GET", &format!("/auth/linkedin{query}"), None, None)
        .await;
    assert!(resp.status().is_redirection(), "status {}", resp.status());
    let url = location(&resp);
    assert_eq!(url.host_str(), Some("provider.example"));
    query_param(&url, "state").unwrap()
}

#[tokio::test]
async fn first_party_login_lands_on_frontend_with_tokens() {
    let app = TestApp::new();
    let state = start(&app, "").await;

    let resp = app
        .request(
            "GET",
            &format!("/auth/linkedin/callback?code=good-code&state={state}"),
            None,
            None,
        )
        .await;
    let url = location(&resp);
    assert!(url.as_str().starts_with("http://localhost:3000/auth/callback"));
    let access = query_param(&url, "accessToken").unwrap();
    assert!(query_param(&url, "refreshToken").is_some());

    let (status, me) = app.json("GET", "/auth/me", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "ada@example.com");
    assert_eq!(me["linkedinId"], "li-42");
}

#[tokio::test]
async fn state_cannot_be_replayed_or_forged() {
    let app = TestApp::new();
    let state = start(&app, "").await;
    let uri = format!("/auth/linkedin/callback?code=good-code&state={state}");

    let first = app.request("GET", &uri, None, None).await;
    assert!(query_param(&location(&first), "accessToken").is_some());

    let replay = app.request("GET", &uri, None, None).await;
    assert_eq!(
        query_param(&location(&replay), "error").as_deref(),
        Some("validation")
    );

    let forged = app
        .request("GET", "/auth/linkedin/callback?code=good-code&state=forged", None, None)
        .await;
    assert!(query_param(&location(&forged), "error").is_some());
}

#[tokio::test]
async fn provider_failure_redirects_with_error() {
    let app = TestApp::new();
    let state = start(&app, "").await;
    let resp = app
        .request(
            "GET",
            &format!("/auth/linkedin/callback?code=bad-code&state={state}"),
            None,
            None,
        )
        .await;
    assert_eq!(
        query_param(&location(&resp), "error").as_deref(),
        Some("upstream")
    );
}

#[tokio::test]
async fn client_context_yields_authorization_code() {
    let app = TestApp::new();
    app.user("root@example.com", Role::Admin).await;
    let admin = app.login("root@example.com").await;
    let (_, client) = app
        .json(
            "POST",
            "/clients",
            Some(&admin),
            Some(json!({"name": "Acme", "redirectUri": "https://acme.example/cb"})),
        )
        .await;
    let client_id = client["client_id"].as_str().unwrap();

    let state = start(&app, &format!("?client_id={client_id}&state=abc")).await;
    let resp = app
        .request(
            "GET",
            &format!("/auth/linkedin/callback?code=good-code&state={state}"),
            None,
            None,
        )
        .await;
    let url = location(&resp);
    assert!(url.as_str().starts_with("https://acme.example/cb"));
    assert_eq!(query_param(&url, "state").as_deref(), Some("abc"));
    let code = query_param(&url, "code").unwrap();

    let (status, _) = app
        .json(
            "POST",
            &format!("/api/callback?code={code}"),
            None,
            Some(json!({"client_id": client_id, "client_secret": client["client_secret"]})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_client_is_rejected_before_redirect() {
    let app = TestApp::new();
    let (status, _) = app
        .json("GET", "/auth/linkedin?client_id=nope", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn disabled_when_not_configured() {
    let app = TestApp::with_config(ApiConfig::default(), false);
    let (status, _) = app.json("GET", "/auth/linkedin", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

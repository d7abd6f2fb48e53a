// Admin SSO login through the HTTP surface

use axum::http::StatusCode;
use serde_json::{json, Value};

mod common;
use common::setup_test_app;

async fn auth_url(app: &common::TestApp) -> Value {
    let response = app.get("/api/v1/auth/admin/sso/auth-url").send().await;
    assert_eq!(response.status(), StatusCode::OK);
    response.json().await
}

#[tokio::test]
async fn test_auth_url_carries_state() {
    let app = setup_test_app();
    let body = auth_url(&app).await;

    let state = body["state"].as_str().unwrap();
    assert!(!state.is_empty());
    assert!(body["authUrl"].as_str().unwrap().contains(state));
}

#[tokio::test]
async fn test_callback_issues_admin_token_and_provisions_once() {
    let app = setup_test_app();

    let mut ids = Vec::new();
    for _ in 0..2 {
        let url = auth_url(&app).await;
        let response = app
            .post("/api/v1/auth/admin/sso/callback")
            .json(&json!({ "code": "admin-code", "state": url["state"] }))
            .send()
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = response.json().await;
        assert_eq!(body["tokenType"], "Bearer");
        assert_eq!(body["admin"]["email"], "ops@example.com");
        assert_eq!(body["admin"]["externalSubject"], "kc-admin-1");

        let claims = app
            .state
            .admin_tokens
            .verify(body["accessToken"].as_str().unwrap())
            .unwrap();
        assert!(claims.is_admin());
        ids.push(claims.user_id);
    }

    // Same external subject maps to the same admin account
    assert_eq!(ids[0], ids[1]);
}

#[tokio::test]
async fn test_callback_rejects_forged_state() {
    let app = setup_test_app();

    let response = app
        .post("/api/v1/auth/admin/sso/callback")
        .json(&json!({ "code": "admin-code", "state": "forged" }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_callback_requires_code_and_state() {
    let app = setup_test_app();

    let response = app
        .post("/api/v1/auth/admin/sso/callback")
        .json(&json!({ "code": "", "state": "" }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_non_admin_identity_is_forbidden() {
    let app = setup_test_app();
    let url = auth_url(&app).await;

    let response = app
        .post("/api/v1/auth/admin/sso/callback")
        .json(&json!({ "code": "plain-code", "state": url["state"] }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_provider_outage_is_service_unavailable() {
    let app = setup_test_app();
    let url = auth_url(&app).await;

    let response = app
        .post("/api/v1/auth/admin/sso/callback")
        .json(&json!({ "code": "down-code", "state": url["state"] }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body: Value = response.json().await;
    assert_eq!(body["error"]["code"], "SSO_UNAVAILABLE");
}

#[tokio::test]
async fn test_unknown_code_is_rejected() {
    let app = setup_test_app();
    let url = auth_url(&app).await;

    let response = app
        .post("/api/v1/auth/admin/sso/callback")
        .json(&json!({ "code": "nope", "state": url["state"] }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

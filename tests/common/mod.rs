// Common test utilities and helper structs
// Shared across all test files to avoid duplication
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Request, Response, StatusCode},
    Router,
};
use item_reward_api::{
    app::AppState,
    app_config::AppConfig,
    build_router,
    services::{SsoError, SsoIdentity, SsoProvider},
    utils::password::PasswordConfig,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

pub const ACCESS_SECRET: &str = "access-secret-for-tests-0123456789abcdef";
pub const REFRESH_SECRET: &str = "refresh-secret-for-tests-0123456789abcdef";
pub const ADMIN_SECRET: &str = "admin-secret-for-tests-0123456789abcdef";
pub const SSO_CLIENT_SECRET: &str = "sso-client-secret-for-tests-0123456789";

/// Baseline configuration; rate limiting is off unless a test enables it
pub fn test_env() -> HashMap<String, String> {
    [
        ("ENVIRONMENT", "test"),
        ("JWT_ACCESS_SECRET", ACCESS_SECRET),
        ("JWT_REFRESH_SECRET", REFRESH_SECRET),
        ("JWT_ADMIN_SECRET", ADMIN_SECRET),
        ("JWT_ISSUER", "item-reward-api-test"),
        ("KEYCLOAK_BASE_URL", "https://sso.example.com"),
        ("KEYCLOAK_REALM", "rewards"),
        ("KEYCLOAK_CLIENT_ID", "item-reward-admin"),
        ("KEYCLOAK_CLIENT_SECRET", SSO_CLIENT_SECRET),
        ("KEYCLOAK_REDIRECT_URI", "https://admin.example.com/callback"),
        ("SSO_ADMIN_ROLE", "reward-admin"),
        ("SSO_ADMIN_GROUP", "ops"),
        ("ENABLE_RATE_LIMITING", "false"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

pub fn test_config_with(overrides: &[(&str, &str)]) -> AppConfig {
    let mut env = test_env();
    for (key, value) in overrides {
        env.insert(key.to_string(), value.to_string());
    }
    AppConfig::from_source(|key| env.get(key).cloned()).unwrap()
}

pub fn test_config() -> AppConfig {
    test_config_with(&[])
}

/// Cheap Argon2 parameters so tests stay fast
pub fn fast_password_config() -> PasswordConfig {
    PasswordConfig {
        memory_cost: 4096,
        time_cost: 1,
        parallelism: 1,
        output_length: 32,
    }
}

/// SSO provider that maps authorization codes to canned identities
#[derive(Default)]
pub struct FakeSsoProvider {
    identities: HashMap<String, Result<SsoIdentity, SsoError>>,
}

impl FakeSsoProvider {
    pub fn with_identity(mut self, code: &str, identity: SsoIdentity) -> Self {
        self.identities.insert(code.to_string(), Ok(identity));
        self
    }

    pub fn with_failure(mut self, code: &str, error: SsoError) -> Self {
        self.identities.insert(code.to_string(), Err(error));
        self
    }
}

#[async_trait]
impl SsoProvider for FakeSsoProvider {
    fn authorization_url(&self, state: &str) -> Result<String, SsoError> {
        Ok(format!("https://sso.example.com/auth?state={}", state))
    }

    async fn exchange_code(&self, code: &str) -> Result<SsoIdentity, SsoError> {
        self.identities
            .get(code)
            .cloned()
            .unwrap_or(Err(SsoError::Rejected("unknown code".to_string())))
    }
}

/// Identity the fake provider treats as an administrator
pub fn admin_identity() -> SsoIdentity {
    SsoIdentity {
        subject: "kc-admin-1".to_string(),
        email: "Ops@Example.com".to_string(),
        display_name: "Ops Admin".to_string(),
        roles: vec!["reward-admin".to_string()],
        groups: vec![],
    }
}

pub fn plain_identity() -> SsoIdentity {
    SsoIdentity {
        subject: "kc-user-7".to_string(),
        email: "someone@example.com".to_string(),
        display_name: "Someone".to_string(),
        roles: vec!["viewer".to_string()],
        groups: vec!["/staff".to_string()],
    }
}

/// Test application wrapper
pub struct TestApp {
    pub app: Router,
    pub state: AppState,
}

impl TestApp {
    /// Send a POST request
    pub fn post(&self, uri: &str) -> TestRequest<'_> {
        TestRequest::new(self, "POST", uri)
    }

    /// Send a GET request
    pub fn get(&self, uri: &str) -> TestRequest<'_> {
        TestRequest::new(self, "GET", uri)
    }

    pub fn put(&self, uri: &str) -> TestRequest<'_> {
        TestRequest::new(self, "PUT", uri)
    }

    pub fn delete(&self, uri: &str) -> TestRequest<'_> {
        TestRequest::new(self, "DELETE", uri)
    }

    /// Register a user and return (id, email)
    pub async fn register_user(&self, password: &str) -> (i64, String) {
        let email = unique_email("user");
        let response = self
            .post("/api/v1/auth/user/register")
            .json(&json!({
                "email": &email,
                "password": password,
                "displayName": "Test User"
            }))
            .send()
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response.json().await;
        (body["id"].as_i64().unwrap(), email)
    }

    /// Log in and return the login response body
    pub async fn login(&self, email: &str, password: &str) -> Value {
        let response = self
            .post("/api/v1/auth/user/login")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        response.json().await
    }

    /// Register and log in; returns (user id, access token)
    pub async fn user_session(&self) -> (i64, String) {
        let (id, email) = self.register_user("secret123").await;
        let body = self.login(&email, "secret123").await;
        (id, body["accessToken"].as_str().unwrap().to_string())
    }

    /// Admin token issued through the SSO callback
    pub async fn admin_token(&self) -> String {
        let url: Value = self
            .get("/api/v1/auth/admin/sso/auth-url")
            .send()
            .await
            .json()
            .await;
        let response = self
            .post("/api/v1/auth/admin/sso/callback")
            .json(&json!({ "code": "admin-code", "state": url["state"] }))
            .send()
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await;
        body["accessToken"].as_str().unwrap().to_string()
    }

    /// Create an item through the admin API; returns its id
    pub async fn create_item(&self, admin: &str, name: &str) -> i64 {
        let response = self
            .post("/api/v1/admin/items")
            .bearer(admin)
            .json(&json!({ "name": name, "description": "", "price": 100 }))
            .send()
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response.json().await;
        body["id"].as_i64().unwrap()
    }

    /// Create a reward bundle; `items` is a list of (item id, quantity)
    pub async fn create_reward(&self, admin: &str, items: &[(i64, u32)]) -> i64 {
        let lines: Vec<Value> = items
            .iter()
            .map(|(id, qty)| json!({ "itemId": id, "quantity": qty }))
            .collect();
        let response = self
            .post("/api/v1/admin/rewards")
            .bearer(admin)
            .json(&json!({ "name": "Bundle", "items": lines }))
            .send()
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response.json().await;
        body["id"].as_i64().unwrap()
    }

    pub async fn create_coupon(&self, admin: &str, body: Value) -> Value {
        let response = self
            .post("/api/v1/admin/coupons")
            .bearer(admin)
            .json(&body)
            .send()
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        response.json().await
    }

    /// Quantity of `item_id` the bearer of `token` holds
    pub async fn held_quantity(&self, token: &str, item_id: i64) -> u64 {
        let items: Value = self
            .get("/api/v1/users/me/items")
            .bearer(token)
            .send()
            .await
            .json()
            .await;
        items
            .as_array()
            .unwrap()
            .iter()
            .find(|line| line["itemId"].as_i64() == Some(item_id))
            .and_then(|line| line["quantity"].as_u64())
            .unwrap_or(0)
    }
}

/// Test request builder
pub struct TestRequest<'a> {
    app: &'a TestApp,
    method: String,
    uri: String,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    custom_ip: Option<String>,
}

impl<'a> TestRequest<'a> {
    fn new(app: &'a TestApp, method: &str, uri: &str) -> Self {
        Self {
            app,
            method: method.to_string(),
            uri: uri.to_string(),
            headers: Vec::new(),
            body: None,
            custom_ip: None,
        }
    }

    /// Add JSON body to request
    pub fn json<T: Serialize>(mut self, body: &T) -> Self {
        self.body = Some(serde_json::to_vec(body).unwrap());
        self.headers
            .push(("content-type".to_string(), "application/json".to_string()));
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        let value = format!("Bearer {}", token);
        self.header("authorization", &value)
    }

    /// Set a custom IP address for this request (useful for rate limiting tests)
    pub fn with_ip(mut self, ip: &str) -> Self {
        self.custom_ip = Some(ip.to_string());
        self
    }

    /// Send the request
    pub async fn send(self) -> TestResponse {
        let mut builder = Request::builder().method(self.method.as_str()).uri(&self.uri);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let mut request = builder
            .body(self.body.map(Body::from).unwrap_or_else(Body::empty))
            .unwrap();

        // Add ConnectInfo to the request extensions to simulate a client connection
        let ip_address = self
            .custom_ip
            .unwrap_or_else(|| "127.0.0.1:12345".to_string());
        request
            .extensions_mut()
            .insert(ConnectInfo(ip_address.parse::<SocketAddr>().unwrap()));

        let response = self.app.app.clone().oneshot(request).await.unwrap();

        TestResponse { response }
    }
}

/// Test response wrapper
pub struct TestResponse {
    response: Response<Body>,
}

impl TestResponse {
    /// Get status code
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    pub fn header(&self, name: header::HeaderName) -> Option<String> {
        self.response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    /// Every Set-Cookie header on the response
    pub fn cookies(&self) -> Vec<String> {
        self.response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect()
    }

    /// Parse JSON response
    pub async fn json<T: serde::de::DeserializeOwned>(self) -> T {
        let body = axum::body::to_bytes(self.response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    /// Get response body as text
    pub async fn text(self) -> String {
        let body = axum::body::to_bytes(self.response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }
}

// Helper function to generate unique email
pub fn unique_email(prefix: &str) -> String {
    format!("{}{}@example.com", prefix, Uuid::new_v4().simple())
}

/// Setup test application with the fake SSO provider
pub fn setup_test_app_with(config: AppConfig) -> TestApp {
    let provider = FakeSsoProvider::default()
        .with_identity("admin-code", admin_identity())
        .with_identity("plain-code", plain_identity())
        .with_failure(
            "down-code",
            SsoError::Unavailable("connection refused".to_string()),
        );

    let state =
        AppState::with_provider(config, Arc::new(provider), fast_password_config()).unwrap();
    let app = build_router(state.clone());

    TestApp { app, state }
}

pub fn setup_test_app() -> TestApp {
    setup_test_app_with(test_config())
}

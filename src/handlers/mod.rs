// HTTP handlers and route builders
//
// Route builders return un-layered routers; `app::build_router` decides which
// auth middleware guards each group.

pub mod admin_auth;
pub mod auth;
pub mod coupons;
pub mod items;
pub mod payments;
pub mod rewards;
pub mod users;

use crate::app::AppState;
use axum::{
    extract::State,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};

// Public user authentication routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/user/register", post(auth::register))
        .route("/auth/user/login", post(auth::login))
        .route("/auth/user/refresh", post(auth::refresh))
}

// Public admin SSO routes
pub fn admin_auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/admin/sso/auth-url", get(admin_auth::sso_auth_url))
        .route("/auth/admin/sso/callback", post(admin_auth::sso_callback))
}

// Access token required
pub fn user_auth_routes() -> Router<AppState> {
    Router::new().route("/auth/user/me", get(auth::me))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users/me",
            get(users::get_profile).put(users::update_profile),
        )
        .route("/users/me/items", get(users::my_items))
        .route("/users/me/rewards", get(users::my_rewards))
        .route("/users/me/coupons", get(users::my_coupons))
}

pub fn coupon_routes() -> Router<AppState> {
    Router::new().route("/coupons/redeem", post(coupons::redeem_coupon))
}

pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/payments",
            post(payments::create_payment).get(payments::list_my_payments),
        )
        .route("/payments/{id}", get(payments::get_payment))
        .route("/payments/{id}/complete", post(payments::complete_payment))
        .route("/payments/{id}/cancel", post(payments::cancel_payment))
}

// Optional authentication
pub fn item_routes() -> Router<AppState> {
    Router::new()
        .route("/items", get(items::list_items))
        .route("/items/{id}", get(items::get_item))
}

// Admin token with the admin role required; nested under /admin
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(admin_auth::admin_me))
        .route("/users", get(users::list_users))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route(
            "/items",
            post(items::create_item).get(items::admin_list_items),
        )
        .route(
            "/items/{id}",
            get(items::admin_get_item)
                .put(items::update_item)
                .delete(items::delete_item),
        )
        .route(
            "/rewards",
            post(rewards::create_reward).get(rewards::list_rewards),
        )
        .route(
            "/rewards/{id}",
            get(rewards::get_reward)
                .put(rewards::update_reward)
                .delete(rewards::delete_reward),
        )
        .route("/rewards/{id}/grant", post(rewards::grant_reward))
        .route(
            "/coupons",
            post(coupons::create_coupon).get(coupons::list_coupons),
        )
        .route(
            "/coupons/{id}",
            get(coupons::get_coupon)
                .put(coupons::update_coupon)
                .delete(coupons::delete_coupon),
        )
        .route("/payments", get(payments::list_all_payments))
        .route(
            "/payments/{id}",
            axum::routing::delete(payments::delete_payment),
        )
}

// Health check handler
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "item-reward-api",
        "environment": state.config.server.environment.to_string(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

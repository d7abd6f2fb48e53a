// Application state and router assembly
use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use std::sync::Arc;
use thiserror::Error;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    app_config::{AppConfig, SecurityConfig},
    db::{
        AdminRepository, CouponRepository, ItemRepository, PaymentRepository, RewardRepository,
        UserRepository,
    },
    handlers,
    middleware::{optional_user, rate_limit_middleware, require_admin, require_user, ApiRateLimiter},
    models::auth::TokenType,
    services::{
        AdminRolePolicy, AdminSsoService, CouponService, CredentialVerifier, ItemService,
        JwtError, JwtService, KeycloakClient, PaymentService, RewardService, SsoError,
        SsoProvider, SsoStateSigner, UserService,
    },
    utils::password::PasswordConfig,
};

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Token service configuration failed: {0}")]
    Token(#[from] JwtError),

    #[error("SSO configuration failed: {0}")]
    Sso(#[from] SsoError),
}

// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub access_tokens: Arc<JwtService>,
    pub refresh_tokens: Arc<JwtService>,
    pub admin_tokens: Arc<JwtService>,
    pub credentials: CredentialVerifier,
    pub admin_sso: Arc<AdminSsoService>,
    pub user_service: Arc<UserService>,
    pub item_service: Arc<ItemService>,
    pub reward_service: Arc<RewardService>,
    pub coupon_service: Arc<CouponService>,
    pub payment_service: Arc<PaymentService>,
    pub rate_limiter: Option<Arc<ApiRateLimiter>>,
}

impl AppState {
    /// Production wiring: Keycloak provider, default Argon2 parameters
    pub fn new(config: AppConfig) -> Result<Self, StartupError> {
        let provider = Arc::new(KeycloakClient::new(&config.sso)?);
        Self::with_provider(config, provider, PasswordConfig::default())
    }

    /// Wire every service around the given SSO provider and hashing parameters
    pub fn with_provider(
        config: AppConfig,
        sso_provider: Arc<dyn SsoProvider>,
        password_config: PasswordConfig,
    ) -> Result<Self, StartupError> {
        // One verifier per token kind, each with its own secret
        let access_tokens = Arc::new(JwtService::from_settings(
            TokenType::Access,
            &config.jwt.access,
        )?);
        let refresh_tokens = Arc::new(JwtService::from_settings(
            TokenType::Refresh,
            &config.jwt.refresh,
        )?);
        let admin_tokens = Arc::new(JwtService::from_settings(
            TokenType::Admin,
            &config.jwt.admin,
        )?);

        // Repositories
        let users = Arc::new(UserRepository::new());
        let items = Arc::new(ItemRepository::new());
        let rewards = Arc::new(RewardRepository::new());
        let coupons = Arc::new(CouponRepository::new());
        let payments = Arc::new(PaymentRepository::new());
        let admins = Arc::new(AdminRepository::new());

        // Services
        let credentials = CredentialVerifier::new(users.clone());
        let user_service = Arc::new(UserService::with_password_config(
            users.clone(),
            items.clone(),
            password_config,
        ));
        let item_service = Arc::new(ItemService::new(items));
        let reward_service = Arc::new(RewardService::new(
            rewards,
            users,
            item_service.clone(),
        ));
        let coupon_service = Arc::new(CouponService::new(coupons, reward_service.clone()));
        let payment_service = Arc::new(PaymentService::new(payments, reward_service.clone()));

        let admin_sso = Arc::new(AdminSsoService::new(
            sso_provider,
            AdminRolePolicy::from_config(&config.sso),
            SsoStateSigner::new(&config.sso.client_secret)?,
            admins,
        ));

        let rate_limiter = ApiRateLimiter::from_config(&config.security);

        Ok(Self {
            config: Arc::new(config),
            access_tokens,
            refresh_tokens,
            admin_tokens,
            credentials,
            admin_sso,
            user_service,
            item_service,
            reward_service,
            coupon_service,
            payment_service,
            rate_limiter,
        })
    }
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]);

    if security.cors_allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = security
        .cors_allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    layer
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
}

/// Full application router
pub fn build_router(state: AppState) -> Router {
    let public_auth = handlers::auth_routes().merge(handlers::admin_auth_routes());

    let user_routes = handlers::user_auth_routes()
        .merge(handlers::user_routes())
        .merge(handlers::coupon_routes())
        .merge(handlers::payment_routes())
        .route_layer(from_fn_with_state(state.clone(), require_user));

    let catalogue = handlers::item_routes()
        .route_layer(from_fn_with_state(state.clone(), optional_user));

    let admin = handlers::admin_routes()
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    let api = Router::new()
        .merge(public_auth)
        .merge(user_routes)
        .merge(catalogue)
        .nest("/admin", admin)
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware));

    let cors = cors_layer(&state.config.security);

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

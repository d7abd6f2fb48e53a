// Library exports for the item reward API
// The binary in main.rs and the integration tests both build on these modules

pub mod app;
pub mod app_config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use app::{build_router, AppState, StartupError};
pub use app_config::{AppConfig, ConfigError};
pub use middleware::{AuthenticatedPrincipal, MaybePrincipal};
pub use models::auth::{TokenClaims, TokenType};
pub use services::{
    AdminSsoService, CouponService, CredentialVerifier, ItemService, JwtConfig, JwtError,
    JwtService, PaymentService, RewardService, SsoError, SsoIdentity, SsoProvider, UserService,
};
pub use utils::{AuthError, ServiceError};

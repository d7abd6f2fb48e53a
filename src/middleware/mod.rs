// Middleware modules for the Item Reward API

pub mod auth;
pub mod auth_middleware;
pub mod rate_limit;

// Re-export auth types
pub use auth::{AuthenticatedPrincipal, MaybePrincipal};
pub use auth_middleware::{bearer_token, optional_user, require_admin, require_user};
pub use rate_limit::{rate_limit_middleware, spawn_pruner, ApiRateLimiter};

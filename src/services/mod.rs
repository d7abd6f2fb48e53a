// Services module for the Item Reward API
// Business logic layer for the application

pub mod coupon;
pub mod credentials;
pub mod item;
pub mod jwt;
pub mod payment;
pub mod reward;
pub mod sso;
pub mod user;

// Re-export commonly used services
pub use coupon::CouponService;
pub use credentials::{CredentialError, CredentialVerifier, Identity, IdentityStore};
pub use item::ItemService;
pub use jwt::{JwtConfig, JwtError, JwtService};
pub use payment::PaymentService;
pub use reward::RewardService;
pub use sso::{
    AdminRolePolicy, AdminSsoService, KeycloakClient, SsoError, SsoIdentity, SsoProvider,
    SsoStateSigner,
};
pub use user::{UserError, UserService};

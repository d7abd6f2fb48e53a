pub mod admin;
pub mod auth;
pub mod coupon;
pub mod item;
pub mod payment;
pub mod reward;
pub mod user;

// Re-export common types
pub use admin::AdminAccount;
pub use auth::*;
pub use coupon::*;
pub use item::*;
pub use payment::*;
pub use reward::*;
pub use user::*;

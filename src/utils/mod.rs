// Utility modules for the Item Reward API

pub mod auth_errors;
pub mod password;
pub mod service_error;
pub mod validation;

pub use auth_errors::{log_auth_failure, AuthError, AuthErrorResponse};
pub use password::{hash_password, verify_password, PasswordError};
pub use service_error::ServiceError;
pub use validation::{
    normalize_coupon_code, normalize_currency, normalize_email, trim_and_validate_field,
};

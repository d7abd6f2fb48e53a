// Token claims and authentication DTOs

use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Discriminator embedded in every token. Set by the issuing service only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
    Admin,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
            TokenType::Admin => "admin",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims carried by access, refresh and admin tokens alike
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenClaims {
    /// Owning principal's identifier
    pub user_id: i64,

    pub email: String,

    /// `None` for ordinary users, `Some("admin")` for elevated principals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    pub token_type: TokenType,

    /// Issuer (iss)
    pub iss: String,

    /// Issued at (unix seconds)
    pub iat: u64,

    /// Not before (unix seconds)
    pub nbf: u64,

    /// Expires at (unix seconds)
    pub exp: u64,
}

impl TokenClaims {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some(ADMIN_ROLE)
    }
}

/// Role string carried by admin tokens
pub const ADMIN_ROLE: &str = "admin";

// =============================================================================
// REQUEST/RESPONSE TYPES
// =============================================================================

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 320, message = "Email is required"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    /// Optional in the body: web clients send the `refresh_token` cookie instead
    #[serde(default, alias = "refresh_token")]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginUserInfo {
    pub id: i64,
    pub email: String,
    pub display_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub token_type: String,
    pub user: LoginUserInfo,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub expires_in: u64,
    pub token_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsoAuthUrlResponse {
    pub auth_url: String,
    pub state: String,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct SsoCallbackRequest {
    #[validate(length(min = 1, message = "Authorization code is required"))]
    pub code: String,

    #[validate(length(min = 1, message = "State is required"))]
    pub state: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminLoginResponse {
    pub access_token: String,
    pub expires_in: u64,
    pub token_type: String,
    pub admin: crate::models::admin::AdminAccount,
}

/// Identity echo for `GET /auth/user/me` and `GET /admin/me`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalResponse {
    pub user_id: i64,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub token_type: TokenType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

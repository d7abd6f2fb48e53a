// Authentication error type for the HTTP boundary
// Every auth failure a client can observe goes through this enum

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Authentication-specific errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Missing or malformed authorization header")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    InsufficientRole,

    #[error("Too many requests")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("SSO provider unavailable")]
    SsoUnavailable,

    #[error("SSO login rejected")]
    SsoRejected,

    #[error("Token generation failed: {0}")]
    TokenError(String),

    #[error("Internal server error")]
    InternalError,
}

/// Standard authentication response structure
#[derive(Debug, Serialize)]
pub struct AuthErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub code: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl AuthError {
    /// Convert to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::MissingToken => StatusCode::UNAUTHORIZED,
            AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientRole => StatusCode::FORBIDDEN,
            AuthError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AuthError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AuthError::SsoUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::SsoRejected => StatusCode::UNAUTHORIZED,
            AuthError::TokenError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert to error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::MissingToken => "MISSING_TOKEN",
            AuthError::InvalidToken => "INVALID_TOKEN",
            AuthError::InsufficientRole => "INSUFFICIENT_ROLE",
            AuthError::RateLimited { .. } => "RATE_LIMITED",
            AuthError::ValidationError(_) => "VALIDATION_ERROR",
            AuthError::SsoUnavailable => "SSO_UNAVAILABLE",
            AuthError::SsoRejected => "SSO_REJECTED",
            AuthError::TokenError(_) => "TOKEN_ERROR",
            AuthError::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Get retry_after value if applicable
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            AuthError::RateLimited {
                retry_after_seconds,
            } => Some(*retry_after_seconds),
            _ => None,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retry_after = self.retry_after();

        // Token failures never echo internal detail back to the client
        let description = match &self {
            AuthError::TokenError(_) => "Token generation failed".to_string(),
            other => other.to_string(),
        };

        let body = AuthErrorResponse {
            success: false,
            error: ErrorDetail {
                code: self.error_code().to_string(),
                description: description.clone(),
                retry_after,
            },
            message: description,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(seconds) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

/// Log an authentication failure with the internal reason.
///
/// The client only ever sees the generic `AuthError`; `reason` is what tells
/// an operator whether it was an unknown email, a bad signature, an expired
/// token and so on.
pub fn log_auth_failure(subject: &str, reason: &str, error: &AuthError) {
    tracing::warn!(
        subject = subject,
        reason = reason,
        error_code = error.error_code(),
        "Authentication failure"
    );
}

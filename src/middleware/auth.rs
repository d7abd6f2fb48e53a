// Request-scoped authenticated principal
//
// The auth middleware inserts an `AuthenticatedPrincipal` into the request
// extensions; handlers take it as an explicit extractor argument.

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

use crate::models::auth::{TokenClaims, TokenType, ADMIN_ROLE};
use crate::utils::AuthError;

/// Identity established by a verified bearer token. Lives for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticatedPrincipal {
    pub user_id: i64,
    pub email: String,
    pub role: Option<String>,
    pub token_type: TokenType,
}

impl AuthenticatedPrincipal {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some(ADMIN_ROLE)
    }
}

impl From<TokenClaims> for AuthenticatedPrincipal {
    fn from(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.email,
            role: claims.role,
            token_type: claims.token_type,
        }
    }
}

/// Principal if the optional-auth middleware found a valid token
#[derive(Debug, Clone, PartialEq)]
pub struct MaybePrincipal(pub Option<AuthenticatedPrincipal>);

impl<S> FromRequestParts<S> for AuthenticatedPrincipal
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Absent only if a route was wired without the auth middleware
        parts
            .extensions
            .get::<AuthenticatedPrincipal>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}

impl<S> FromRequestParts<S> for MaybePrincipal
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybePrincipal(
            parts.extensions.get::<AuthenticatedPrincipal>().cloned(),
        ))
    }
}

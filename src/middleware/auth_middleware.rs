// Bearer-token authentication middleware for protected routes
//
// Three variants, each wired to one verifier:
// - `require_user`: access tokens, rejects on any failure
// - `require_admin`: admin tokens plus `role == "admin"`
// - `optional_user`: access tokens, never rejects
//
// Every token failure reaches the client as the same 401; the reason is only
// in the logs. The one exception: a valid user access token on an admin route
// is a 403, since the caller is known and only lacks the privilege.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    app::AppState,
    middleware::auth::AuthenticatedPrincipal,
    services::jwt::JwtService,
    utils::{log_auth_failure, AuthError},
};

/// Why the Authorization header could not yield a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BearerError {
    Missing,
    Malformed,
}

impl BearerError {
    pub fn log_reason(&self) -> &'static str {
        match self {
            BearerError::Missing => "missing_header",
            BearerError::Malformed => "malformed_header",
        }
    }
}

/// Pull `<token>` out of `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, BearerError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(BearerError::Missing)?
        .to_str()
        .map_err(|_| BearerError::Malformed)?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or(BearerError::Malformed)?
        .trim();

    if token.is_empty() {
        return Err(BearerError::Malformed);
    }
    Ok(token)
}

/// Extract and verify the bearer token against one verifier
fn authenticate(headers: &HeaderMap, verifier: &JwtService) -> Result<AuthenticatedPrincipal, AuthError> {
    let token = bearer_token(headers).map_err(|e| {
        let error = AuthError::MissingToken;
        log_auth_failure("anonymous", e.log_reason(), &error);
        error
    })?;

    match verifier.verify(token) {
        Ok(claims) => Ok(claims.into()),
        Err(e) => {
            let error = AuthError::InvalidToken;
            log_auth_failure(verifier.token_type().as_str(), e.log_reason(), &error);
            Err(error)
        },
    }
}

/// Access token required
pub async fn require_user(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    match authenticate(request.headers(), &state.access_tokens) {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        },
        Err(error) => error.into_response(),
    }
}

/// Admin token with the admin role required
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let principal = match authenticate(request.headers(), &state.admin_tokens) {
        Ok(principal) => principal,
        Err(AuthError::InvalidToken) => {
            // A genuine user access token already establishes who the caller
            // is; that caller is authenticated but not allowed here.
            let user = bearer_token(request.headers())
                .ok()
                .and_then(|token| state.access_tokens.verify(token).ok());
            let error = match user {
                Some(claims) => {
                    let error = AuthError::InsufficientRole;
                    log_auth_failure(&claims.email, "wrong_type", &error);
                    error
                },
                None => AuthError::InvalidToken,
            };
            return error.into_response();
        },
        Err(error) => return error.into_response(),
    };

    if !principal.is_admin() {
        let error = AuthError::InsufficientRole;
        log_auth_failure(&principal.email, "insufficient_role", &error);
        return error.into_response();
    }

    request.extensions_mut().insert(principal);
    next.run(request).await
}

/// Attach a principal when a valid access token is present; never rejects
pub async fn optional_user(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if let Ok(token) = bearer_token(request.headers()) {
        match state.access_tokens.verify(token) {
            Ok(claims) => {
                request
                    .extensions_mut()
                    .insert(AuthenticatedPrincipal::from(claims));
            },
            Err(e) => {
                tracing::debug!(reason = e.log_reason(), "Ignoring invalid optional token");
            },
        }
    }
    next.run(request).await
}

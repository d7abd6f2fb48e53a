// User authentication handlers: register, login, refresh, me

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;
use tracing::{error, info};
use validator::Validate;

use crate::{
    app::AppState,
    middleware::AuthenticatedPrincipal,
    models::{
        auth::{
            LoginRequest, LoginResponse, LoginUserInfo, PrincipalResponse, RefreshRequest,
            RefreshResponse,
        },
        user::{RegisterRequest, UserResponse},
    },
    services::{jwt::JwtError, CredentialError},
    utils::{log_auth_failure, normalize_email, AuthError, ServiceError},
};

pub const REFRESH_COOKIE: &str = "refresh_token";
const BEARER: &str = "Bearer";

/// Refresh token cookie for web clients; lifetime matches the token
fn refresh_cookie(token: String, max_age_seconds: u64, secure: bool) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .max_age(Duration::seconds(max_age_seconds as i64))
        .build()
}

fn token_failure(e: JwtError) -> AuthError {
    error!(error = %e, "Token issuance failed");
    AuthError::TokenError(e.to_string())
}

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ServiceError> {
    request.validate()?;

    let user = state
        .user_service
        .register(&request.email, &request.password, &request.display_name)
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Email/password login. Unknown email and wrong password look identical to the client.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), AuthError> {
    request
        .validate()
        .map_err(|e| AuthError::ValidationError(e.to_string()))?;

    let email = normalize_email(&request.email);

    let identity = match state.credentials.verify(&email, &request.password).await {
        Ok(identity) => identity,
        Err(e @ (CredentialError::NotFound | CredentialError::InvalidCredentials)) => {
            let error = AuthError::InvalidCredentials;
            log_auth_failure(&email, e.log_reason(), &error);
            return Err(error);
        },
        Err(e) => {
            error!(email = %email, reason = e.log_reason(), error = %e, "Credential check failed");
            return Err(AuthError::InternalError);
        },
    };

    let access_token = state
        .access_tokens
        .issue(identity.id, &identity.email, None)
        .map_err(token_failure)?;
    let refresh_token = state
        .refresh_tokens
        .issue(identity.id, &identity.email, None)
        .map_err(token_failure)?;

    info!(user_id = identity.id, "User logged in");

    let jar = jar.add(refresh_cookie(
        refresh_token.clone(),
        state.refresh_tokens.expires_in(),
        state.config.is_production(),
    ));

    Ok((
        jar,
        Json(LoginResponse {
            access_token,
            refresh_token,
            expires_in: state.access_tokens.expires_in(),
            token_type: BEARER.to_string(),
            user: LoginUserInfo {
                id: identity.id,
                email: identity.email,
                display_name: identity.display_name,
            },
        }),
    ))
}

/// Refresh token from the JSON body (mobile) or the cookie (web)
fn extract_refresh_token(jar: &CookieJar, body: &Bytes) -> Result<String, AuthError> {
    if !body.is_empty() {
        let request: RefreshRequest = serde_json::from_slice(body)
            .map_err(|_| AuthError::ValidationError("Invalid JSON body".to_string()))?;
        if let Some(token) = request.refresh_token.filter(|t| !t.trim().is_empty()) {
            return Ok(token);
        }
    }

    jar.get(REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)
}

/// Mint a new access token from a valid refresh token.
///
/// Stateless: the new token carries the refresh token's subject, email and role.
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> Result<Json<RefreshResponse>, AuthError> {
    let token = extract_refresh_token(&jar, &body)?;

    let claims = state.refresh_tokens.verify(&token).map_err(|e| {
        let error = AuthError::InvalidToken;
        log_auth_failure("refresh", e.log_reason(), &error);
        error
    })?;

    let access_token = state
        .access_tokens
        .issue(claims.user_id, &claims.email, claims.role.as_deref())
        .map_err(token_failure)?;

    Ok(Json(RefreshResponse {
        access_token,
        expires_in: state.access_tokens.expires_in(),
        token_type: BEARER.to_string(),
    }))
}

pub async fn me(
    State(state): State<AppState>,
    principal: AuthenticatedPrincipal,
) -> Json<PrincipalResponse> {
    let display_name = state
        .credentials
        .identity(principal.user_id)
        .await
        .map(|identity| identity.display_name);

    Json(PrincipalResponse {
        user_id: principal.user_id,
        email: principal.email,
        role: principal.role,
        token_type: principal.token_type,
        display_name,
    })
}

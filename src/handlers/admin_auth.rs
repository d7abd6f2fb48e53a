// Admin authentication through SSO

use axum::{extract::State, response::Json};
use tracing::error;
use validator::Validate;

use crate::{
    app::AppState,
    middleware::AuthenticatedPrincipal,
    models::auth::{
        AdminLoginResponse, PrincipalResponse, SsoAuthUrlResponse, SsoCallbackRequest, ADMIN_ROLE,
    },
    utils::{log_auth_failure, AuthError},
};

pub async fn sso_auth_url(
    State(state): State<AppState>,
) -> Result<Json<SsoAuthUrlResponse>, AuthError> {
    let (auth_url, sso_state) = state.admin_sso.authorization_url().map_err(|e| {
        error!(error = %e, "Could not build SSO authorization URL");
        AuthError::from(e)
    })?;

    Ok(Json(SsoAuthUrlResponse {
        auth_url,
        state: sso_state,
    }))
}

/// Exchange the provider's authorization code for an admin token
pub async fn sso_callback(
    State(state): State<AppState>,
    Json(request): Json<SsoCallbackRequest>,
) -> Result<Json<AdminLoginResponse>, AuthError> {
    request
        .validate()
        .map_err(|e| AuthError::ValidationError(e.to_string()))?;

    let admin = state
        .admin_sso
        .complete_login(&request.code, &request.state)
        .await
        .map_err(|e| {
            let error = AuthError::from(e.clone());
            log_auth_failure("sso", e.log_reason(), &error);
            error
        })?;

    let access_token = state
        .admin_tokens
        .issue(admin.id, &admin.email, Some(ADMIN_ROLE))
        .map_err(|e| {
            error!(error = %e, "Admin token issuance failed");
            AuthError::TokenError(e.to_string())
        })?;

    Ok(Json(AdminLoginResponse {
        access_token,
        expires_in: state.admin_tokens.expires_in(),
        token_type: "Bearer".to_string(),
        admin,
    }))
}

pub async fn admin_me(
    State(state): State<AppState>,
    principal: AuthenticatedPrincipal,
) -> Json<PrincipalResponse> {
    let display_name = state
        .admin_sso
        .find_admin(principal.user_id)
        .await
        .map(|admin| admin.display_name);

    Json(PrincipalResponse {
        user_id: principal.user_id,
        email: principal.email,
        role: principal.role,
        token_type: principal.token_type,
        display_name,
    })
}

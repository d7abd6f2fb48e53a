// User profile handlers (self-service and admin)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use validator::Validate;

use crate::{
    app::AppState,
    middleware::AuthenticatedPrincipal,
    models::{
        coupon::CouponRedemption,
        item::UserItem,
        reward::RewardGrant,
        user::{UpdateUserRequest, UserResponse},
    },
    utils::ServiceError,
};

pub async fn get_profile(
    State(state): State<AppState>,
    principal: AuthenticatedPrincipal,
) -> Result<Json<UserResponse>, ServiceError> {
    let user = state.user_service.get(principal.user_id).await?;
    Ok(Json(user.into()))
}

pub async fn update_profile(
    State(state): State<AppState>,
    principal: AuthenticatedPrincipal,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ServiceError> {
    request.validate()?;
    let user = state
        .user_service
        .update(principal.user_id, &request)
        .await?;
    Ok(Json(user.into()))
}

pub async fn my_items(
    State(state): State<AppState>,
    principal: AuthenticatedPrincipal,
) -> Json<Vec<UserItem>> {
    Json(state.item_service.user_items(principal.user_id).await)
}

pub async fn my_rewards(
    State(state): State<AppState>,
    principal: AuthenticatedPrincipal,
) -> Json<Vec<RewardGrant>> {
    Json(state.reward_service.grants_for_user(principal.user_id).await)
}

pub async fn my_coupons(
    State(state): State<AppState>,
    principal: AuthenticatedPrincipal,
) -> Json<Vec<CouponRedemption>> {
    Json(
        state
            .coupon_service
            .redemptions_for_user(principal.user_id)
            .await,
    )
}

// =============================================================================
// ADMIN
// =============================================================================

pub async fn list_users(State(state): State<AppState>) -> Json<Vec<UserResponse>> {
    let users = state.user_service.list().await;
    Json(users.iter().map(UserResponse::from).collect())
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, ServiceError> {
    let user = state.user_service.get(id).await?;
    Ok(Json(user.into()))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ServiceError> {
    request.validate()?;
    let user = state.user_service.update(id, &request).await?;
    Ok(Json(user.into()))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ServiceError> {
    state.user_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Coupon handlers: user redemption and admin management

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use validator::Validate;

use crate::{
    app::AppState,
    middleware::AuthenticatedPrincipal,
    models::coupon::{
        Coupon, CreateCouponRequest, RedeemCouponRequest, RedeemCouponResponse,
        UpdateCouponRequest,
    },
    utils::ServiceError,
};

pub async fn redeem_coupon(
    State(state): State<AppState>,
    principal: AuthenticatedPrincipal,
    Json(request): Json<RedeemCouponRequest>,
) -> Result<Json<RedeemCouponResponse>, ServiceError> {
    request.validate()?;
    let (coupon, grant) = state
        .coupon_service
        .redeem(principal.user_id, &request.code)
        .await?;

    Ok(Json(RedeemCouponResponse {
        coupon_code: coupon.code,
        grant,
    }))
}

// =============================================================================
// ADMIN
// =============================================================================

pub async fn create_coupon(
    State(state): State<AppState>,
    Json(request): Json<CreateCouponRequest>,
) -> Result<(StatusCode, Json<Coupon>), ServiceError> {
    request.validate()?;
    let coupon = state.coupon_service.create(&request).await?;
    Ok((StatusCode::CREATED, Json(coupon)))
}

pub async fn list_coupons(State(state): State<AppState>) -> Json<Vec<Coupon>> {
    Json(state.coupon_service.list().await)
}

pub async fn get_coupon(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Coupon>, ServiceError> {
    Ok(Json(state.coupon_service.get(id).await?))
}

pub async fn update_coupon(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateCouponRequest>,
) -> Result<Json<Coupon>, ServiceError> {
    request.validate()?;
    Ok(Json(state.coupon_service.update(id, &request).await?))
}

pub async fn delete_coupon(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ServiceError> {
    state.coupon_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

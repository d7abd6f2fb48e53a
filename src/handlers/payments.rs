// Payment handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use validator::Validate;

use crate::{
    app::AppState,
    middleware::AuthenticatedPrincipal,
    models::payment::{CompletePaymentResponse, CreatePaymentRequest, Payment},
    utils::ServiceError,
};

pub async fn create_payment(
    State(state): State<AppState>,
    principal: AuthenticatedPrincipal,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<Payment>), ServiceError> {
    request.validate()?;
    let payment = state
        .payment_service
        .create(principal.user_id, &request)
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

pub async fn list_my_payments(
    State(state): State<AppState>,
    principal: AuthenticatedPrincipal,
) -> Json<Vec<Payment>> {
    Json(state.payment_service.list_for_user(principal.user_id).await)
}

pub async fn get_payment(
    State(state): State<AppState>,
    principal: AuthenticatedPrincipal,
    Path(id): Path<i64>,
) -> Result<Json<Payment>, ServiceError> {
    Ok(Json(state.payment_service.get(principal.user_id, id).await?))
}

pub async fn complete_payment(
    State(state): State<AppState>,
    principal: AuthenticatedPrincipal,
    Path(id): Path<i64>,
) -> Result<Json<CompletePaymentResponse>, ServiceError> {
    let (payment, grant) = state
        .payment_service
        .complete(principal.user_id, id)
        .await?;
    Ok(Json(CompletePaymentResponse { payment, grant }))
}

pub async fn cancel_payment(
    State(state): State<AppState>,
    principal: AuthenticatedPrincipal,
    Path(id): Path<i64>,
) -> Result<Json<Payment>, ServiceError> {
    Ok(Json(state.payment_service.cancel(principal.user_id, id).await?))
}

// =============================================================================
// ADMIN
// =============================================================================

pub async fn list_all_payments(State(state): State<AppState>) -> Json<Vec<Payment>> {
    Json(state.payment_service.list_all().await)
}

pub async fn delete_payment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ServiceError> {
    state.payment_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

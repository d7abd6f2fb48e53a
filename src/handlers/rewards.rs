// Reward handlers (admin only)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use validator::Validate;

use crate::{
    app::AppState,
    models::reward::{
        CreateRewardRequest, GrantRewardRequest, GrantSource, Reward, RewardGrant,
        UpdateRewardRequest,
    },
    utils::ServiceError,
};

pub async fn create_reward(
    State(state): State<AppState>,
    Json(request): Json<CreateRewardRequest>,
) -> Result<(StatusCode, Json<Reward>), ServiceError> {
    request.validate()?;
    let reward = state.reward_service.create(&request).await?;
    Ok((StatusCode::CREATED, Json(reward)))
}

pub async fn list_rewards(State(state): State<AppState>) -> Json<Vec<Reward>> {
    Json(state.reward_service.list().await)
}

pub async fn get_reward(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Reward>, ServiceError> {
    Ok(Json(state.reward_service.get(id).await?))
}

pub async fn update_reward(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateRewardRequest>,
) -> Result<Json<Reward>, ServiceError> {
    request.validate()?;
    Ok(Json(state.reward_service.update(id, &request).await?))
}

pub async fn delete_reward(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ServiceError> {
    state.reward_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Grant a reward directly to a user
pub async fn grant_reward(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<GrantRewardRequest>,
) -> Result<(StatusCode, Json<RewardGrant>), ServiceError> {
    request.validate()?;
    let grant = state
        .reward_service
        .grant(request.user_id, id, GrantSource::Admin)
        .await?;
    Ok((StatusCode::CREATED, Json(grant)))
}

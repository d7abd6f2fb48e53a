// Item catalogue handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use validator::Validate;

use crate::{
    app::AppState,
    middleware::MaybePrincipal,
    models::item::{CreateItemRequest, Item, ItemResponse, UpdateItemRequest},
    utils::ServiceError,
};

/// Public catalogue; authenticated callers also see how many they own
pub async fn list_items(
    State(state): State<AppState>,
    MaybePrincipal(principal): MaybePrincipal,
) -> Json<Vec<ItemResponse>> {
    let user_id = principal.map(|p| p.user_id);
    Json(state.item_service.list_for(user_id).await)
}

pub async fn get_item(
    State(state): State<AppState>,
    MaybePrincipal(principal): MaybePrincipal,
    Path(id): Path<i64>,
) -> Result<Json<ItemResponse>, ServiceError> {
    let user_id = principal.map(|p| p.user_id);
    Ok(Json(state.item_service.get_for(id, user_id).await?))
}

// =============================================================================
// ADMIN
// =============================================================================

pub async fn create_item(
    State(state): State<AppState>,
    Json(request): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<Item>), ServiceError> {
    request.validate()?;
    let item = state.item_service.create(&request).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn admin_list_items(State(state): State<AppState>) -> Json<Vec<Item>> {
    Json(state.item_service.list().await)
}

pub async fn admin_get_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Item>, ServiceError> {
    Ok(Json(state.item_service.get(id).await?))
}

pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateItemRequest>,
) -> Result<Json<Item>, ServiceError> {
    request.validate()?;
    Ok(Json(state.item_service.update(id, &request).await?))
}

pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ServiceError> {
    state.item_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

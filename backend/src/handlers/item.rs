//! HTTP handlers for stock item endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{Item, ItemType};
use shared::types::PaginatedResponse;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::item::{CreateItemInput, ItemService, UpdateItemInput};
use crate::AppState;

use super::pagination;

#[derive(Debug, Deserialize)]
pub struct ListItemsQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub item_type: Option<ItemType>,
}

/// Create a stock item
pub async fn create_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateItemInput>,
) -> AppResult<Json<Item>> {
    let service = ItemService::new(state.db);
    let item = service.create_item(current_user.0.user_id, input).await?;
    Ok(Json(item))
}

/// List items
pub async fn list_items(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListItemsQuery>,
) -> AppResult<Json<PaginatedResponse<Item>>> {
    let service = ItemService::new(state.db);
    let items = service
        .list_items(pagination(query.page, query.per_page), query.item_type)
        .await?;
    Ok(Json(items))
}

/// Get an item
pub async fn get_item(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<Item>> {
    let service = ItemService::new(state.db);
    let item = service.get_item(item_id).await?;
    Ok(Json(item))
}

/// Update an item
pub async fn update_item(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(input): Json<UpdateItemInput>,
) -> AppResult<Json<Item>> {
    let service = ItemService::new(state.db);
    let item = service.update_item(item_id, input).await?;
    Ok(Json(item))
}

/// Delete an item
pub async fn delete_item(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = ItemService::new(state.db);
    service.delete_item(item_id).await?;
    Ok(Json(()))
}

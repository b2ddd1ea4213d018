//! HTTP handlers for purchase lot endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{ItemStock, Lot};
use shared::types::PaginatedResponse;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::lot::{CreateLotInput, LotService, UpdateLotInput};
use crate::AppState;

use super::pagination;

#[derive(Debug, Deserialize)]
pub struct ListLotsQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub item_id: Option<Uuid>,
    pub in_stock: Option<bool>,
}

/// Record a purchase lot
pub async fn create_lot(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateLotInput>,
) -> AppResult<Json<Lot>> {
    let service = LotService::new(state.db);
    let lot = service.create_lot(current_user.0.user_id, input).await?;
    Ok(Json(lot))
}

/// List lots
pub async fn list_lots(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListLotsQuery>,
) -> AppResult<Json<PaginatedResponse<Lot>>> {
    let service = LotService::new(state.db);
    let lots = service
        .list_lots(
            pagination(query.page, query.per_page),
            query.item_id,
            query.in_stock,
        )
        .await?;
    Ok(Json(lots))
}

/// Get a lot
pub async fn get_lot(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(lot_id): Path<Uuid>,
) -> AppResult<Json<Lot>> {
    let service = LotService::new(state.db);
    let lot = service.get_lot(lot_id).await?;
    Ok(Json(lot))
}

/// Edit a lot
pub async fn update_lot(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(lot_id): Path<Uuid>,
    Json(input): Json<UpdateLotInput>,
) -> AppResult<Json<Lot>> {
    let service = LotService::new(state.db);
    let lot = service.update_lot(lot_id, input).await?;
    Ok(Json(lot))
}

/// Delete a lot
pub async fn delete_lot(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(lot_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = LotService::new(state.db);
    service.delete_lot(lot_id).await?;
    Ok(Json(()))
}

/// Origin stock view for one item
pub async fn get_item_stock(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<ItemStock>> {
    let service = LotService::new(state.db);
    let stock = service.item_stock(item_id).await?;
    Ok(Json(stock))
}

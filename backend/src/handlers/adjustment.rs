//! HTTP handlers for stock adjustment endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::Adjustment;
use shared::types::PaginatedResponse;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::adjustment::{AdjustmentInput, AdjustmentService};
use crate::AppState;

use super::pagination;

#[derive(Debug, Deserialize)]
pub struct ListAdjustmentsQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub item_id: Option<Uuid>,
    pub destination_id: Option<Uuid>,
}

/// Record a stock correction
pub async fn create_adjustment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<AdjustmentInput>,
) -> AppResult<Json<Adjustment>> {
    let service = AdjustmentService::new(state.db);
    let adjustment = service
        .create_adjustment(current_user.0.user_id, input)
        .await?;
    Ok(Json(adjustment))
}

/// List adjustments
pub async fn list_adjustments(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListAdjustmentsQuery>,
) -> AppResult<Json<PaginatedResponse<Adjustment>>> {
    let service = AdjustmentService::new(state.db);
    let adjustments = service
        .list_adjustments(
            pagination(query.page, query.per_page),
            query.item_id,
            query.destination_id,
        )
        .await?;
    Ok(Json(adjustments))
}

/// Get an adjustment
pub async fn get_adjustment(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(adjustment_id): Path<Uuid>,
) -> AppResult<Json<Adjustment>> {
    let service = AdjustmentService::new(state.db);
    let adjustment = service.get_adjustment(adjustment_id).await?;
    Ok(Json(adjustment))
}

/// Replace an adjustment (reverse old delta, apply new)
pub async fn update_adjustment(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(adjustment_id): Path<Uuid>,
    Json(input): Json<AdjustmentInput>,
) -> AppResult<Json<Adjustment>> {
    let service = AdjustmentService::new(state.db);
    let adjustment = service.update_adjustment(adjustment_id, input).await?;
    Ok(Json(adjustment))
}

/// Delete an adjustment (credit the quantity back)
pub async fn delete_adjustment(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(adjustment_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = AdjustmentService::new(state.db);
    service.delete_adjustment(adjustment_id).await?;
    Ok(Json(()))
}

//! HTTP handlers for issuance endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{Issuance, IssuanceDetail};
use shared::types::PaginatedResponse;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::issuance::{CreateIssuanceInput, IssuanceService, UpdateIssuanceInput};
use crate::AppState;

use super::pagination;

#[derive(Debug, Deserialize)]
pub struct ListIssuancesQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub destination_id: Option<Uuid>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Issue stock to a destination
pub async fn create_issuance(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateIssuanceInput>,
) -> AppResult<Json<IssuanceDetail>> {
    let service = IssuanceService::new(state.db);
    let issuance = service.create_issuance(&current_user.0, input).await?;
    Ok(Json(issuance))
}

/// List issuances
pub async fn list_issuances(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListIssuancesQuery>,
) -> AppResult<Json<PaginatedResponse<Issuance>>> {
    let service = IssuanceService::new(state.db);
    let issuances = service
        .list_issuances(
            pagination(query.page, query.per_page),
            query.destination_id,
            query.start,
            query.end,
        )
        .await?;
    Ok(Json(issuances))
}

/// Get an issuance with lines and lot breakdowns
pub async fn get_issuance(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(issuance_id): Path<Uuid>,
) -> AppResult<Json<IssuanceDetail>> {
    let service = IssuanceService::new(state.db);
    let issuance = service.get_issuance(issuance_id).await?;
    Ok(Json(issuance))
}

/// Edit an issuance (full reversal, then re-apply)
pub async fn update_issuance(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(issuance_id): Path<Uuid>,
    Json(input): Json<UpdateIssuanceInput>,
) -> AppResult<Json<IssuanceDetail>> {
    let service = IssuanceService::new(state.db);
    let issuance = service
        .update_issuance(&current_user.0, issuance_id, input)
        .await?;
    Ok(Json(issuance))
}

/// Delete an issuance (full reversal)
pub async fn delete_issuance(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(issuance_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = IssuanceService::new(state.db);
    service.delete_issuance(issuance_id).await?;
    Ok(Json(()))
}

//! HTTP handlers for destination-local sale endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{Sale, SaleDetail};
use shared::types::PaginatedResponse;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::sale::{
    CreateSaleInput, SaleService, UpdateSaleInput, UpdateSaleStatusInput,
};
use crate::AppState;

use super::pagination;

#[derive(Debug, Deserialize)]
pub struct ListSalesQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub destination_id: Option<Uuid>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub include_voided: bool,
}

/// Record a sale
pub async fn create_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateSaleInput>,
) -> AppResult<Json<SaleDetail>> {
    let service = SaleService::new(state.db);
    let sale = service.create_sale(&current_user.0, input).await?;
    Ok(Json(sale))
}

/// List sales
pub async fn list_sales(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListSalesQuery>,
) -> AppResult<Json<PaginatedResponse<Sale>>> {
    let service = SaleService::new(state.db);
    let sales = service
        .list_sales(
            pagination(query.page, query.per_page),
            query.destination_id,
            query.start,
            query.end,
            query.include_voided,
        )
        .await?;
    Ok(Json(sales))
}

/// Get a sale with lines
pub async fn get_sale(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
) -> AppResult<Json<SaleDetail>> {
    let service = SaleService::new(state.db);
    let sale = service.get_sale(sale_id).await?;
    Ok(Json(sale))
}

/// Edit a sale (restore old lines, debit new ones)
pub async fn update_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
    Json(input): Json<UpdateSaleInput>,
) -> AppResult<Json<SaleDetail>> {
    let service = SaleService::new(state.db);
    let sale = service.update_sale(&current_user.0, sale_id, input).await?;
    Ok(Json(sale))
}

/// Void a sale, restoring its quantities to the destination
pub async fn void_sale(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
) -> AppResult<Json<SaleDetail>> {
    let service = SaleService::new(state.db);
    let sale = service.void_sale(sale_id).await?;
    Ok(Json(sale))
}

/// Delete a sale
pub async fn delete_sale(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = SaleService::new(state.db);
    service.delete_sale(sale_id).await?;
    Ok(Json(()))
}

/// Flip a sale's payment status
pub async fn update_sale_status(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
    Json(input): Json<UpdateSaleStatusInput>,
) -> AppResult<Json<SaleDetail>> {
    let service = SaleService::new(state.db);
    let sale = service.update_status(sale_id, input).await?;
    Ok(Json(sale))
}

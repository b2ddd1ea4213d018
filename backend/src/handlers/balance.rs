//! HTTP handlers for balance reconciliation endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::models::StockBalance;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::balance::{BalanceQuery, BalanceService};
use crate::AppState;

/// Reconciled, valued balance for one item
pub async fn get_balance(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
    Query(query): Query<BalanceQuery>,
) -> AppResult<Json<StockBalance>> {
    let service = BalanceService::new(state.db);
    let balance = service.balance(item_id, query).await?;
    Ok(Json(balance))
}

//! HTTP handlers for destination endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{Destination, DestinationKind, DestinationStock};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::destination::{
    CreateDestinationInput, DestinationService, UpdateDestinationInput, UpdateSellingPriceInput,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListDestinationsQuery {
    pub kind: Option<DestinationKind>,
}

/// Create a destination
pub async fn create_destination(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateDestinationInput>,
) -> AppResult<Json<Destination>> {
    let service = DestinationService::new(state.db);
    let destination = service
        .create_destination(current_user.0.user_id, input)
        .await?;
    Ok(Json(destination))
}

/// List destinations
pub async fn list_destinations(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListDestinationsQuery>,
) -> AppResult<Json<Vec<Destination>>> {
    let service = DestinationService::new(state.db);
    let destinations = service.list_destinations(query.kind).await?;
    Ok(Json(destinations))
}

/// Get a destination
pub async fn get_destination(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(destination_id): Path<Uuid>,
) -> AppResult<Json<Destination>> {
    let service = DestinationService::new(state.db);
    let destination = service.get_destination(destination_id).await?;
    Ok(Json(destination))
}

/// Rename a destination
pub async fn update_destination(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(destination_id): Path<Uuid>,
    Json(input): Json<UpdateDestinationInput>,
) -> AppResult<Json<Destination>> {
    let service = DestinationService::new(state.db);
    let destination = service.update_destination(destination_id, input).await?;
    Ok(Json(destination))
}

/// Delete a destination
pub async fn delete_destination(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(destination_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = DestinationService::new(state.db);
    service.delete_destination(destination_id).await?;
    Ok(Json(()))
}

/// A destination's inventory counter rows
pub async fn get_destination_inventory(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(destination_id): Path<Uuid>,
) -> AppResult<Json<Vec<DestinationStock>>> {
    let service = DestinationService::new(state.db);
    let inventory = service.destination_inventory(destination_id).await?;
    Ok(Json(inventory))
}

/// Edit a counter row's default selling price
pub async fn update_selling_price(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path((destination_id, item_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<UpdateSellingPriceInput>,
) -> AppResult<Json<()>> {
    let service = DestinationService::new(state.db);
    service
        .update_selling_price(destination_id, item_id, input)
        .await?;
    Ok(Json(()))
}

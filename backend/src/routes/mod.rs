//! Route definitions for the Hotel Operations Platform

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes. The state is handed to the auth middleware so
/// token verification uses the configured secret.
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - stock items
        .nest("/items", item_routes(state.clone()))
        // Protected routes - purchase lots and origin stock
        .nest("/lots", lot_routes(state.clone()))
        .route(
            "/stock/:item_id",
            get(handlers::get_item_stock).route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Protected routes - issuances
        .nest("/issuances", issuance_routes(state.clone()))
        // Protected routes - adjustments
        .nest("/adjustments", adjustment_routes(state.clone()))
        // Protected routes - sales
        .nest("/sales", sale_routes(state.clone()))
        // Protected routes - destinations
        .nest("/destinations", destination_routes(state.clone()))
        // Protected routes - balance reconciliation
        .route(
            "/balance/:item_id",
            get(handlers::get_balance)
                .route_layer(middleware::from_fn_with_state(state, auth_middleware)),
        )
}

/// Stock item routes (protected)
fn item_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_items).post(handlers::create_item))
        .route(
            "/:item_id",
            get(handlers::get_item)
                .put(handlers::update_item)
                .delete(handlers::delete_item),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Purchase lot routes (protected)
fn lot_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_lots).post(handlers::create_lot))
        .route(
            "/:lot_id",
            get(handlers::get_lot)
                .put(handlers::update_lot)
                .delete(handlers::delete_lot),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Issuance routes (protected)
fn issuance_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_issuances).post(handlers::create_issuance),
        )
        .route(
            "/:issuance_id",
            get(handlers::get_issuance)
                .put(handlers::update_issuance)
                .delete(handlers::delete_issuance),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Adjustment routes (protected)
fn adjustment_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_adjustments).post(handlers::create_adjustment),
        )
        .route(
            "/:adjustment_id",
            get(handlers::get_adjustment)
                .put(handlers::update_adjustment)
                .delete(handlers::delete_adjustment),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Sale routes (protected)
fn sale_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_sales).post(handlers::create_sale))
        .route(
            "/:sale_id",
            get(handlers::get_sale)
                .put(handlers::update_sale)
                .delete(handlers::delete_sale),
        )
        .route("/:sale_id/void", post(handlers::void_sale))
        .route("/:sale_id/status", put(handlers::update_sale_status))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Destination routes (protected)
fn destination_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_destinations).post(handlers::create_destination),
        )
        .route(
            "/:destination_id",
            get(handlers::get_destination)
                .put(handlers::update_destination)
                .delete(handlers::delete_destination),
        )
        .route(
            "/:destination_id/inventory",
            get(handlers::get_destination_inventory),
        )
        .route(
            "/:destination_id/inventory/:item_id/price",
            put(handlers::update_selling_price),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

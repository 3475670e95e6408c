//! Route definitions for the Inventory Ledger API

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - direct item operations
        .nest("/items", item_routes())
        // Protected routes - deliveries
        .nest("/deliveries", delivery_routes())
        // Protected routes - processes
        .nest("/processes", process_routes())
        // Protected routes - audit log
        .nest("/inventory-log", inventory_log_routes())
}

/// Item routes (protected)
fn item_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_items).post(handlers::create_item))
        .route(
            "/:site/:item_id",
            get(handlers::get_item)
                .put(handlers::edit_item)
                .delete(handlers::delete_item),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Delivery routes (protected)
fn delivery_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_deliveries).post(handlers::create_delivery),
        )
        .route(
            "/:delivery_id",
            get(handlers::get_delivery)
                .put(handlers::edit_delivery)
                .delete(handlers::delete_delivery),
        )
        .route("/:delivery_id/cancel", post(handlers::cancel_delivery))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Process routes (protected)
fn process_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_processes).post(handlers::create_process),
        )
        .route(
            "/:process_id",
            get(handlers::get_process)
                .put(handlers::edit_process)
                .delete(handlers::delete_process),
        )
        .route("/:process_id/cancel", post(handlers::cancel_process))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Inventory log routes (protected)
fn inventory_log_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::query_inventory_log))
        .route_layer(middleware::from_fn(auth_middleware))
}

//! Route definitions for the Stock Ledger API

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - inventory counts and views
        .nest("/inventory", inventory_routes(state.clone()))
        // Protected routes - batch allocation
        .nest("/batches", batch_routes(state.clone()))
        // Protected routes - transactions
        .nest("/transactions", transaction_routes(state.clone()))
        // Protected routes - scanner
        .nest("/scan", scan_routes(state.clone()))
        // Protected routes - item master
        .nest("/items", item_routes(state.clone()))
        // Protected routes - QA
        .nest("/qa", qa_routes(state.clone()))
        // Protected routes - change feed
        .nest("/events", event_routes(state))
}

/// Inventory routes (protected)
fn inventory_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/counts", get(handlers::list_counts).post(handlers::record_count))
        .route("/summary", get(handlers::get_inventory_summary))
        .route("/compare", get(handlers::compare_inventory))
        .route("/current", get(handlers::get_current_amount))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Batch allocation routes (protected)
fn batch_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_batch_allocations))
        .route("/allocation", get(handlers::get_batch_allocation))
        .route("/add", post(handlers::add_to_batch))
        .route("/remove", post(handlers::remove_from_batch))
        .route("/progress", get(handlers::list_batch_progress))
        .route("/progress/:batch_id", get(handlers::get_batch_progress))
        .route("/targets/:batch_id", put(handlers::set_batch_target))
        .route("/consistency", get(handlers::check_batch_consistency))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Transaction routes (protected)
fn transaction_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_transactions).post(handlers::create_transaction))
        .route("/:id", get(handlers::get_transaction))
        .route("/:id/confirm", post(handlers::confirm_transaction))
        .route("/:id/reject", post(handlers::reject_transaction))
        .route("/:id/rectify", post(handlers::rectify_transaction))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Scanner routes (protected)
fn scan_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::scan_item))
        .route("/resolve", post(handlers::resolve_scan))
        .route(
            "/lookups",
            get(handlers::list_scan_lookups).put(handlers::upsert_scan_lookup),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Item master routes (protected)
fn item_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_items).put(handlers::upsert_item))
        .route("/:sku", get(handlers::get_item))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// QA routes (protected)
fn qa_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/checklists",
            get(handlers::list_checklists).post(handlers::create_checklist),
        )
        .route("/checklists/:id", get(handlers::get_checklist))
        .route(
            "/inspections",
            get(handlers::list_inspections).post(handlers::record_inspection),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Change feed routes (protected)
fn event_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::stream_events))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

//! Route definitions for the LivFlow store operations server

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - stores and everything scoped to them
        .nest("/stores", store_routes(state))
}

/// Store routes (protected)
fn store_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_stores).post(handlers::create_store))
        .route("/:store_id", get(handlers::get_store))
        .nest("/:store_id/recipes", recipe_routes())
        .nest("/:store_id/ingredients", ingredient_routes())
        .nest("/:store_id/inventory", inventory_routes())
        .nest("/:store_id/ledger", ledger_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Recipe routes
fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_recipes).post(handlers::create_recipe))
        .route(
            "/:recipe_id",
            get(handlers::get_recipe)
                .put(handlers::update_recipe)
                .delete(handlers::delete_recipe),
        )
        .route("/:recipe_id/favorite", put(handlers::set_favorite))
}

/// Ingredient catalog routes
fn ingredient_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_ingredients).post(handlers::create_ingredient),
        )
        .route(
            "/:ingredient_id",
            get(handlers::get_ingredient)
                .put(handlers::update_ingredient)
                .delete(handlers::delete_ingredient),
        )
}

/// Inventory routes
fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_inventory))
        .route("/:ingredient_id/use", post(handlers::use_stock))
}

/// Ledger routes
fn ledger_routes() -> Router<AppState> {
    Router::new()
        // Categories
        .route(
            "/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route("/categories/:category_id", delete(handlers::delete_category))
        // Transactions
        .route(
            "/transactions",
            get(handlers::list_transactions).post(handlers::create_transaction),
        )
        .route("/transactions/by-date", get(handlers::transactions_by_date))
        .route(
            "/transactions/:transaction_id",
            get(handlers::get_transaction)
                .put(handlers::update_transaction)
                .delete(handlers::delete_transaction),
        )
        // Reports
        .route("/summary", get(handlers::ledger_summary))
        .route("/export", get(handlers::export_ledger))
}

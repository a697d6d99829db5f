//! HTTP handlers for inventory endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use super::{authorize_store, AppJson};
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::inventory::{InventoryItem, InventoryService, UseStockInput};
use crate::AppState;

/// List stock levels of a store's ingredients
pub async fn list_inventory(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(store_id): Path<Uuid>,
) -> AppResult<Json<Vec<InventoryItem>>> {
    authorize_store(&state, &current_user, store_id).await?;
    let service = InventoryService::new(state.db);
    let items = service.list_inventory(store_id).await?;
    Ok(Json(items))
}

/// Draw stock from an ingredient outside of any recipe
pub async fn use_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((store_id, ingredient_id)): Path<(Uuid, Uuid)>,
    AppJson(input): AppJson<UseStockInput>,
) -> AppResult<Json<InventoryItem>> {
    authorize_store(&state, &current_user, store_id).await?;
    let service = InventoryService::new(state.db);
    let item = service.use_stock(store_id, ingredient_id, input).await?;
    Ok(Json(item))
}

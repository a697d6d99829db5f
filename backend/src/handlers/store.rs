//! HTTP handlers for store endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::AppJson;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::store::{CreateStoreInput, Store, StoreService};
use crate::AppState;

/// List stores owned by the caller
pub async fn list_stores(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Store>>> {
    let service = StoreService::new(state.db);
    let stores = service.list_stores(current_user.0.user_id).await?;
    Ok(Json(stores))
}

/// Create a store
pub async fn create_store(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppJson(input): AppJson<CreateStoreInput>,
) -> AppResult<(StatusCode, Json<Store>)> {
    let service = StoreService::new(state.db);
    let store = service.create_store(current_user.0.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(store)))
}

/// Get a store
pub async fn get_store(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(store_id): Path<Uuid>,
) -> AppResult<Json<Store>> {
    let service = StoreService::new(state.db);
    let store = service.get_store(current_user.0.user_id, store_id).await?;
    Ok(Json(store))
}

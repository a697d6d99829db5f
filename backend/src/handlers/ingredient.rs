//! HTTP handlers for ingredient catalog endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::{authorize_store, AppJson};
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::ingredient::{
    CreateIngredientInput, Ingredient, IngredientService, UpdateIngredientInput,
};
use crate::AppState;

/// List a store's ingredients
pub async fn list_ingredients(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(store_id): Path<Uuid>,
) -> AppResult<Json<Vec<Ingredient>>> {
    authorize_store(&state, &current_user, store_id).await?;
    let service = IngredientService::new(state.db);
    let ingredients = service.list_ingredients(store_id).await?;
    Ok(Json(ingredients))
}

/// Register an ingredient
pub async fn create_ingredient(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(store_id): Path<Uuid>,
    AppJson(input): AppJson<CreateIngredientInput>,
) -> AppResult<(StatusCode, Json<Ingredient>)> {
    authorize_store(&state, &current_user, store_id).await?;
    let service = IngredientService::new(state.db);
    let ingredient = service.create_ingredient(store_id, input).await?;
    Ok((StatusCode::CREATED, Json(ingredient)))
}

/// Get an ingredient with its remaining stock
pub async fn get_ingredient(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((store_id, ingredient_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Ingredient>> {
    authorize_store(&state, &current_user, store_id).await?;
    let service = IngredientService::new(state.db);
    let ingredient = service.get_ingredient(store_id, ingredient_id).await?;
    Ok(Json(ingredient))
}

/// Partially update an ingredient
pub async fn update_ingredient(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((store_id, ingredient_id)): Path<(Uuid, Uuid)>,
    AppJson(input): AppJson<UpdateIngredientInput>,
) -> AppResult<Json<Ingredient>> {
    authorize_store(&state, &current_user, store_id).await?;
    let service = IngredientService::new(state.db);
    let ingredient = service
        .update_ingredient(store_id, ingredient_id, input)
        .await?;
    Ok(Json(ingredient))
}

/// Delete an ingredient
pub async fn delete_ingredient(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((store_id, ingredient_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    authorize_store(&state, &current_user, store_id).await?;
    let service = IngredientService::new(state.db);
    service.delete_ingredient(store_id, ingredient_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! HTTP handlers for recipe endpoints
//!
//! Recipe create/update accept either a JSON body or a multipart form; the
//! multipart form is the only way to attach an image.

use std::str::FromStr;

use axum::{
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use shared::RecipeLine;
use uuid::Uuid;

use super::{authorize_store, malformed_body};
use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::recipe::{
    FavoriteStatus, RecipeDetail, RecipeInput, RecipeService, RecipeSummary, UploadedImage,
};
use crate::AppState;

/// JSON form of a recipe request
#[derive(Debug, Default, Deserialize)]
struct RecipeBody {
    recipe_name: Option<String>,
    recipe_cost: Option<Decimal>,
    production_quantity: Option<i32>,
    is_favorites: Option<bool>,
    ingredients: Option<Value>,
}

impl RecipeBody {
    fn into_input(self) -> AppResult<RecipeInput> {
        let ingredients = match self.ingredients {
            Some(value) => Some(shared::parse_ingredient_list(value)?),
            None => None,
        };

        Ok(RecipeInput {
            recipe_name: self.recipe_name,
            recipe_cost: self.recipe_cost,
            production_quantity: self.production_quantity,
            is_favorites: self.is_favorites,
            ingredients,
            image: None,
        })
    }
}

/// Recipe fields extracted from a JSON or multipart request
#[derive(Debug)]
pub struct RecipeForm(pub RecipeInput);

#[axum::async_trait]
impl<S> FromRequest<S> for RecipeForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("multipart/form-data"))
            .unwrap_or(false);

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| malformed_body(&e.body_text()))?;
            return read_multipart(multipart).await.map(RecipeForm);
        }

        let Json(body) = Json::<RecipeBody>::from_request(req, state)
            .await
            .map_err(|e| malformed_body(&e.body_text()))?;
        body.into_input().map(RecipeForm)
    }
}

async fn read_multipart(mut multipart: Multipart) -> AppResult<RecipeInput> {
    let mut input = RecipeInput::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| malformed_body(&e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "recipe_img" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| malformed_body(&e.body_text()))?;
            // Browsers send an empty part when no file is chosen
            if !bytes.is_empty() {
                input.image = Some(UploadedImage {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }

        let text = field
            .text()
            .await
            .map_err(|e| malformed_body(&e.body_text()))?;

        match name.as_str() {
            "recipe_name" => input.recipe_name = Some(text),
            "recipe_cost" => input.recipe_cost = parse_decimal_field("recipe_cost", &text)?,
            "production_quantity" => {
                input.production_quantity = parse_int_field("production_quantity", &text)?
            }
            "is_favorites" => input.is_favorites = parse_bool_field("is_favorites", &text)?,
            "ingredients" => {
                if let Some(lines) = parse_ingredients_field(&text)? {
                    input.ingredients.get_or_insert_with(Vec::new).extend(lines);
                }
            }
            other => tracing::debug!(field = other, "Ignoring unknown recipe form field"),
        }
    }

    Ok(input)
}

/// Blank form values count as "not sent"
fn parse_decimal_field(field: &str, raw: &str) -> AppResult<Option<Decimal>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    Decimal::from_str(raw)
        .map(Some)
        .map_err(|_| AppError::invalid_field(field, "Value must be a number"))
}

fn parse_ingredients_field(raw: &str) -> AppResult<Option<Vec<RecipeLine>>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(shared::parse_ingredient_list_text(raw)?))
}

fn parse_int_field(field: &str, raw: &str) -> AppResult<Option<i32>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<i32>()
        .map(Some)
        .map_err(|_| AppError::invalid_field(field, "Value must be a whole number"))
}

fn parse_bool_field(field: &str, raw: &str) -> AppResult<Option<bool>> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "true" | "1" | "on" | "yes" => Ok(Some(true)),
        "false" | "0" | "off" | "no" => Ok(Some(false)),
        _ => Err(AppError::invalid_field(field, "Value must be true or false")),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FavoriteInput {
    pub is_favorites: Option<bool>,
}

fn recipe_service(state: &AppState) -> RecipeService {
    RecipeService::new(state.db.clone(), state.media.clone())
}

/// List a store's recipes
pub async fn list_recipes(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(store_id): Path<Uuid>,
) -> AppResult<Json<Vec<RecipeSummary>>> {
    authorize_store(&state, &current_user, store_id).await?;
    let recipes = recipe_service(&state).list_recipes(store_id).await?;
    Ok(Json(recipes))
}

/// Create a recipe and deduct its ingredients from stock
pub async fn create_recipe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(store_id): Path<Uuid>,
    RecipeForm(input): RecipeForm,
) -> AppResult<(StatusCode, Json<RecipeDetail>)> {
    authorize_store(&state, &current_user, store_id).await?;
    let recipe = recipe_service(&state).create_recipe(store_id, input).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

/// Get a recipe with its ingredient lines and costs
pub async fn get_recipe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((store_id, recipe_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<RecipeDetail>> {
    authorize_store(&state, &current_user, store_id).await?;
    let recipe = recipe_service(&state).get_recipe(store_id, recipe_id).await?;
    Ok(Json(recipe))
}

/// Update a recipe, reconciling stock when the ingredient list is sent
pub async fn update_recipe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((store_id, recipe_id)): Path<(Uuid, Uuid)>,
    RecipeForm(input): RecipeForm,
) -> AppResult<Json<RecipeDetail>> {
    authorize_store(&state, &current_user, store_id).await?;
    let recipe = recipe_service(&state)
        .update_recipe(store_id, recipe_id, input)
        .await?;
    Ok(Json(recipe))
}

/// Delete a recipe and restore its stock
pub async fn delete_recipe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((store_id, recipe_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    authorize_store(&state, &current_user, store_id).await?;
    recipe_service(&state).delete_recipe(store_id, recipe_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Set or toggle the favourite flag
pub async fn set_favorite(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((store_id, recipe_id)): Path<(Uuid, Uuid)>,
    input: Option<Json<FavoriteInput>>,
) -> AppResult<Json<FavoriteStatus>> {
    authorize_store(&state, &current_user, store_id).await?;
    let is_favorites = input.and_then(|Json(body)| body.is_favorites);
    let status = recipe_service(&state)
        .set_favorite(store_id, recipe_id, is_favorites)
        .await?;
    Ok(Json(status))
}

//! Recipe service
//!
//! Every mutation that touches a recipe's ingredient list runs the stock
//! reconciliation planner inside the same database transaction that rewrites
//! the recipe items, so stock and bills of materials never diverge.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{
    calculate_recipe_cost, plan_removal, plan_replacement, Consumption, CostBreakdown,
    IngredientCost, RecipeLine,
};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::reconciliation::{apply_adjustments, lock_positions};
use crate::error::{AppError, AppResult};
use crate::external::MediaStore;

/// Folder recipe images are stored under
const IMAGE_FOLDER: &str = "recipes";

#[derive(Clone)]
pub struct RecipeService {
    db: PgPool,
    media: Arc<dyn MediaStore>,
}

#[derive(Debug, Clone, FromRow)]
struct RecipeRow {
    id: Uuid,
    name: String,
    sales_price_per_item: Option<Decimal>,
    production_quantity_per_batch: Option<i32>,
    recipe_img: Option<String>,
    is_favorites: bool,
    total_ingredient_cost: Decimal,
    production_cost: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Row of the recipe list
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RecipeSummary {
    #[serde(rename = "recipe_id")]
    pub id: Uuid,
    #[serde(rename = "recipe_name")]
    pub name: String,
    #[serde(rename = "recipe_cost")]
    pub sales_price_per_item: Option<Decimal>,
    pub recipe_img: Option<String>,
    pub is_favorites: bool,
    #[serde(rename = "production_quantity")]
    pub production_quantity_per_batch: Option<i32>,
    pub production_cost: Decimal,
}

/// One ingredient line of a recipe detail
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RecipeIngredientLine {
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub unit_price: Decimal,
    pub required_amount: Decimal,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    pub recipe_id: Uuid,
    pub recipe_name: String,
    pub recipe_cost: Option<Decimal>,
    pub recipe_img: Option<String>,
    pub is_favorites: bool,
    pub production_quantity: Option<i32>,
    pub total_ingredient_cost: Decimal,
    pub production_cost: Decimal,
    pub profit_per_item: Option<Decimal>,
    pub cost_ratio_percent: Option<Decimal>,
    pub ingredients: Vec<RecipeIngredientLine>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FavoriteStatus {
    pub recipe_id: Uuid,
    pub is_favorites: bool,
}

/// Image file received with a recipe form
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Recipe fields from a create or update request; `None` means "not sent"
#[derive(Debug, Clone, Default)]
pub struct RecipeInput {
    pub recipe_name: Option<String>,
    pub recipe_cost: Option<Decimal>,
    pub production_quantity: Option<i32>,
    pub is_favorites: Option<bool>,
    pub ingredients: Option<Vec<RecipeLine>>,
    pub image: Option<UploadedImage>,
}

impl RecipeInput {
    fn validate(&self) -> AppResult<()> {
        if let Some(name) = &self.recipe_name {
            shared::validate_name(name).map_err(|m| AppError::invalid_field("recipe_name", m))?;
        }
        if let Some(price) = self.recipe_cost {
            shared::validate_non_negative(price)
                .and_then(|_| shared::validate_currency_scale(price))
                .map_err(|m| AppError::invalid_field("recipe_cost", m))?;
        }
        shared::validate_production_quantity(self.production_quantity)
            .map_err(|m| AppError::invalid_field("production_quantity", m))?;
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct CostRow {
    unit_price: Decimal,
    quantity_used: Decimal,
}

#[derive(Debug, FromRow)]
struct ConsumptionRow {
    ingredient_id: Uuid,
    quantity_used: Decimal,
}

#[derive(Debug, FromRow)]
struct UnitRow {
    id: Uuid,
    unit: String,
}

async fn load_consumption(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
) -> AppResult<Vec<Consumption>> {
    let rows = sqlx::query_as::<_, ConsumptionRow>(
        "SELECT ingredient_id, quantity_used FROM recipe_items WHERE recipe_id = $1",
    )
    .bind(recipe_id)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| Consumption::new(r.ingredient_id, r.quantity_used))
        .collect())
}

/// Recompute and store a recipe's cached material and per-item cost
pub(crate) async fn refresh_costs(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
) -> AppResult<CostBreakdown> {
    let (sales_price, batch): (Option<Decimal>, Option<i32>) = sqlx::query_as(
        "SELECT sales_price_per_item, production_quantity_per_batch FROM recipes WHERE id = $1",
    )
    .bind(recipe_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Recipe".to_string()))?;

    let costs: Vec<IngredientCost> = sqlx::query_as::<_, CostRow>(
        r#"
        SELECT ing.unit_cost AS unit_price, ri.quantity_used
        FROM recipe_items ri
        JOIN ingredients ing ON ing.id = ri.ingredient_id
        WHERE ri.recipe_id = $1
        "#,
    )
    .bind(recipe_id)
    .fetch_all(&mut **tx)
    .await?
    .into_iter()
    .map(|r| IngredientCost::new(r.unit_price, r.quantity_used))
    .collect();

    let breakdown = calculate_recipe_cost(&costs, sales_price, batch)?.rounded();

    sqlx::query(
        r#"
        UPDATE recipes SET total_ingredient_cost = $2, production_cost = $3
        WHERE id = $1
        "#,
    )
    .bind(recipe_id)
    .bind(breakdown.total_material_cost)
    .bind(breakdown.cost_per_item)
    .execute(&mut **tx)
    .await?;

    Ok(breakdown)
}

/// Reconcile stock and rewrite the recipe items for `lines`
async fn replace_items(
    tx: &mut Transaction<'_, Postgres>,
    store_id: Uuid,
    recipe_id: Uuid,
    lines: &[RecipeLine],
) -> AppResult<()> {
    let previous = load_consumption(tx, recipe_id).await?;

    let touched: Vec<Uuid> = previous
        .iter()
        .map(|c| c.ingredient_id)
        .chain(lines.iter().map(|l| l.ingredient_id))
        .collect();
    let positions = lock_positions(tx, store_id, &touched, Some(recipe_id)).await?;

    let plan = plan_replacement(positions, &previous, lines).map_err(|e| {
        tracing::warn!(%recipe_id, error = %e, "Recipe stock reconciliation rejected");
        AppError::from(e)
    })?;

    apply_adjustments(tx, &plan.adjustments).await?;

    sqlx::query("DELETE FROM recipe_items WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tx)
        .await?;

    let line_ids: Vec<Uuid> = plan.lines.iter().map(|l| l.ingredient_id).collect();
    let units: HashMap<Uuid, String> =
        sqlx::query_as::<_, UnitRow>("SELECT id, unit FROM ingredients WHERE id = ANY($1)")
            .bind(&line_ids[..])
            .fetch_all(&mut **tx)
            .await?
            .into_iter()
            .map(|r| (r.id, r.unit))
            .collect();

    for line in &plan.lines {
        if line.was_reset() {
            tracing::warn!(
                %recipe_id,
                ingredient_id = %line.ingredient_id,
                requested = %line.requested_amount,
                "Capacity was reduced with no consumption; required amount reset to zero"
            );
        }

        let unit = match &line.unit {
            Some(unit) => unit.clone(),
            None => units.get(&line.ingredient_id).cloned().unwrap_or_default(),
        };

        sqlx::query(
            r#"
            INSERT INTO recipe_items (recipe_id, ingredient_id, quantity_used, unit)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(recipe_id)
        .bind(line.ingredient_id)
        .bind(line.quantity_used)
        .bind(unit)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

impl RecipeService {
    pub fn new(db: PgPool, media: Arc<dyn MediaStore>) -> Self {
        Self { db, media }
    }

    pub async fn list_recipes(&self, store_id: Uuid) -> AppResult<Vec<RecipeSummary>> {
        let recipes = sqlx::query_as::<_, RecipeSummary>(
            r#"
            SELECT id, name, sales_price_per_item, recipe_img, is_favorites,
                   production_quantity_per_batch, production_cost
            FROM recipes
            WHERE store_id = $1
            ORDER BY is_favorites DESC, name
            "#,
        )
        .bind(store_id)
        .fetch_all(&self.db)
        .await?;
        Ok(recipes)
    }

    pub async fn get_recipe(&self, store_id: Uuid, recipe_id: Uuid) -> AppResult<RecipeDetail> {
        let recipe = sqlx::query_as::<_, RecipeRow>(
            r#"
            SELECT id, name, sales_price_per_item, production_quantity_per_batch, recipe_img,
                   is_favorites, total_ingredient_cost, production_cost, created_at, updated_at
            FROM recipes WHERE id = $1 AND store_id = $2
            "#,
        )
        .bind(recipe_id)
        .bind(store_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Recipe".to_string()))?;

        let ingredients = sqlx::query_as::<_, RecipeIngredientLine>(
            r#"
            SELECT ri.ingredient_id, ing.name AS ingredient_name, ing.unit_cost AS unit_price,
                   ri.quantity_used AS required_amount, ri.unit
            FROM recipe_items ri
            JOIN ingredients ing ON ing.id = ri.ingredient_id
            WHERE ri.recipe_id = $1
            ORDER BY ing.name
            "#,
        )
        .bind(recipe_id)
        .fetch_all(&self.db)
        .await?;

        // Costs come from the cached columns so detail and list agree
        let breakdown = CostBreakdown::from_costs(
            recipe.total_ingredient_cost,
            recipe.production_cost,
            recipe.sales_price_per_item,
        )
        .rounded();

        Ok(RecipeDetail {
            recipe_id: recipe.id,
            recipe_name: recipe.name,
            recipe_cost: recipe.sales_price_per_item,
            recipe_img: recipe.recipe_img,
            is_favorites: recipe.is_favorites,
            production_quantity: recipe.production_quantity_per_batch,
            total_ingredient_cost: breakdown.total_material_cost,
            production_cost: breakdown.cost_per_item,
            profit_per_item: breakdown.profit_per_item,
            cost_ratio_percent: breakdown.cost_ratio_percent,
            ingredients,
            created_at: recipe.created_at,
            updated_at: recipe.updated_at,
        })
    }

    /// Create a recipe, deducting its ingredients from stock
    pub async fn create_recipe(&self, store_id: Uuid, input: RecipeInput) -> AppResult<RecipeDetail> {
        let name = input
            .recipe_name
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        shared::validate_name(&name).map_err(|m| AppError::invalid_field("recipe_name", m))?;
        input.validate()?;

        let image_url = self.store_image(input.image.as_ref()).await?;

        let recipe_id = match self
            .insert_recipe(store_id, &name, &input, image_url.as_deref())
            .await
        {
            Ok(id) => id,
            Err(e) => {
                self.discard_image(image_url.as_deref()).await;
                return Err(e);
            }
        };

        tracing::info!(%store_id, %recipe_id, "Created recipe");
        self.get_recipe(store_id, recipe_id).await
    }

    async fn insert_recipe(
        &self,
        store_id: Uuid,
        name: &str,
        input: &RecipeInput,
        image_url: Option<&str>,
    ) -> AppResult<Uuid> {
        let mut tx = self.db.begin().await?;

        let recipe_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO recipes (store_id, name, sales_price_per_item,
                                 production_quantity_per_batch, recipe_img, is_favorites)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(store_id)
        .bind(name)
        .bind(input.recipe_cost)
        .bind(input.production_quantity)
        .bind(image_url)
        .bind(input.is_favorites.unwrap_or(false))
        .fetch_one(&mut *tx)
        .await?;

        let lines = input.ingredients.as_deref().unwrap_or_default();
        replace_items(&mut tx, store_id, recipe_id, lines).await?;
        refresh_costs(&mut tx, recipe_id).await?;

        tx.commit().await?;
        Ok(recipe_id)
    }

    /// Update recipe fields; the ingredient list is reconciled only when sent
    pub async fn update_recipe(
        &self,
        store_id: Uuid,
        recipe_id: Uuid,
        input: RecipeInput,
    ) -> AppResult<RecipeDetail> {
        input.validate()?;

        let image_url = self.store_image(input.image.as_ref()).await?;

        let replaced_image = match self
            .update_in_tx(store_id, recipe_id, &input, image_url.as_deref())
            .await
        {
            Ok(old) => old,
            Err(e) => {
                self.discard_image(image_url.as_deref()).await;
                return Err(e);
            }
        };

        self.discard_image(replaced_image.as_deref()).await;

        tracing::info!(
            %store_id,
            %recipe_id,
            ingredients_replaced = input.ingredients.is_some(),
            "Updated recipe"
        );
        self.get_recipe(store_id, recipe_id).await
    }

    /// Returns the image URL that was replaced, if any
    async fn update_in_tx(
        &self,
        store_id: Uuid,
        recipe_id: Uuid,
        input: &RecipeInput,
        image_url: Option<&str>,
    ) -> AppResult<Option<String>> {
        let mut tx = self.db.begin().await?;

        let current = sqlx::query_as::<_, RecipeRow>(
            r#"
            SELECT id, name, sales_price_per_item, production_quantity_per_batch, recipe_img,
                   is_favorites, total_ingredient_cost, production_cost, created_at, updated_at
            FROM recipes WHERE id = $1 AND store_id = $2
            FOR UPDATE
            "#,
        )
        .bind(recipe_id)
        .bind(store_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Recipe".to_string()))?;

        let name = input
            .recipe_name
            .as_deref()
            .map(|n| n.trim().to_string())
            .unwrap_or(current.name);
        let new_image = image_url.map(str::to_string);
        let replaced_image = match &new_image {
            Some(_) => current.recipe_img.clone(),
            None => None,
        };

        sqlx::query(
            r#"
            UPDATE recipes SET
                name = $2, sales_price_per_item = $3, production_quantity_per_batch = $4,
                is_favorites = $5, recipe_img = $6, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(recipe_id)
        .bind(name)
        .bind(input.recipe_cost.or(current.sales_price_per_item))
        .bind(input.production_quantity.or(current.production_quantity_per_batch))
        .bind(input.is_favorites.unwrap_or(current.is_favorites))
        .bind(new_image.or(current.recipe_img))
        .execute(&mut *tx)
        .await?;

        if let Some(lines) = &input.ingredients {
            replace_items(&mut tx, store_id, recipe_id, lines).await?;
        }
        refresh_costs(&mut tx, recipe_id).await?;

        tx.commit().await?;
        Ok(replaced_image)
    }

    /// Delete a recipe, returning its consumption to stock
    pub async fn delete_recipe(&self, store_id: Uuid, recipe_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let image: Option<String> = sqlx::query_scalar::<_, Option<String>>(
            "SELECT recipe_img FROM recipes WHERE id = $1 AND store_id = $2 FOR UPDATE",
        )
        .bind(recipe_id)
        .bind(store_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Recipe".to_string()))?;

        let previous = load_consumption(&mut tx, recipe_id).await?;
        let touched: Vec<Uuid> = previous.iter().map(|c| c.ingredient_id).collect();
        let positions = lock_positions(&mut tx, store_id, &touched, Some(recipe_id)).await?;

        let plan = plan_removal(positions, &previous);
        apply_adjustments(&mut tx, &plan.adjustments).await?;

        sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(recipe_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.discard_image(image.as_deref()).await;
        tracing::info!(%store_id, %recipe_id, restored = plan.adjustments.len(), "Deleted recipe");
        Ok(())
    }

    /// Set the favourite flag, or flip it when `is_favorites` is absent
    pub async fn set_favorite(
        &self,
        store_id: Uuid,
        recipe_id: Uuid,
        is_favorites: Option<bool>,
    ) -> AppResult<FavoriteStatus> {
        let is_favorites: bool = sqlx::query_scalar(
            r#"
            UPDATE recipes SET is_favorites = COALESCE($3, NOT is_favorites), updated_at = NOW()
            WHERE id = $1 AND store_id = $2
            RETURNING is_favorites
            "#,
        )
        .bind(recipe_id)
        .bind(store_id)
        .bind(is_favorites)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Recipe".to_string()))?;

        Ok(FavoriteStatus {
            recipe_id,
            is_favorites,
        })
    }

    async fn store_image(&self, image: Option<&UploadedImage>) -> AppResult<Option<String>> {
        match image {
            Some(image) => self
                .media
                .save(IMAGE_FOLDER, &image.file_name, &image.bytes)
                .await
                .map(Some),
            None => Ok(None),
        }
    }

    /// Best-effort removal; a leftover file is logged, never surfaced
    async fn discard_image(&self, url: Option<&str>) {
        if let Some(url) = url {
            if let Err(e) = self.media.remove(url).await {
                tracing::warn!(url, error = %e, "Failed to remove recipe image");
            }
        }
    }
}

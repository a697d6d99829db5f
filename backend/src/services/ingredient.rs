//! Ingredient catalog service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{apply_capacity_change, derive_unit_cost, IngredientUnit};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct IngredientService {
    db: PgPool,
}

/// Ingredient joined with its live stock
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Ingredient {
    #[serde(rename = "ingredient_id")]
    pub id: Uuid,
    pub store_id: Uuid,
    #[serde(rename = "ingredient_name")]
    pub name: String,
    pub unit: String,
    pub unit_cost: Decimal,
    #[serde(rename = "ingredient_cost")]
    pub purchase_price: Decimal,
    #[serde(rename = "capacity")]
    pub purchase_quantity: Decimal,
    pub original_stock_before_edit: Option<Decimal>,
    pub remaining_stock: Decimal,
    #[serde(rename = "shop")]
    pub vendor: Option<String>,
    #[serde(rename = "ingredient_detail")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateIngredientInput {
    pub ingredient_name: String,
    pub unit: String,
    #[serde(default)]
    pub ingredient_cost: Decimal,
    #[serde(default)]
    pub capacity: Decimal,
    pub unit_cost: Option<Decimal>,
    pub shop: Option<String>,
    pub ingredient_detail: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateIngredientInput {
    pub ingredient_name: Option<String>,
    pub unit: Option<String>,
    pub ingredient_cost: Option<Decimal>,
    pub capacity: Option<Decimal>,
    pub unit_cost: Option<Decimal>,
    pub shop: Option<String>,
    pub ingredient_detail: Option<String>,
}

/// Columns of the ingredient row locked for an update
#[derive(Debug, FromRow)]
struct LockedIngredient {
    name: String,
    unit: String,
    unit_cost: Decimal,
    purchase_price: Decimal,
    purchase_quantity: Decimal,
    original_stock_before_edit: Option<Decimal>,
    remaining_stock: Decimal,
    vendor: Option<String>,
    notes: Option<String>,
}

const SELECT_INGREDIENT: &str = r#"
    SELECT i.id, i.store_id, i.name, i.unit, i.unit_cost, i.purchase_price,
           i.purchase_quantity, i.original_stock_before_edit,
           COALESCE(inv.remaining_stock, i.purchase_quantity) AS remaining_stock,
           i.vendor, i.notes, i.created_at, i.updated_at
    FROM ingredients i
    LEFT JOIN inventory inv ON inv.ingredient_id = i.id
"#;

fn parse_unit(unit: &str) -> AppResult<IngredientUnit> {
    IngredientUnit::parse(unit).ok_or_else(|| {
        AppError::validation(
            "unit",
            "Unit must be one of g, kg, ml, l, ea",
            "단위는 g, kg, ml, l, ea 중 하나여야 합니다",
        )
    })
}

fn validate_price(field: &str, value: Decimal) -> AppResult<()> {
    shared::validate_non_negative(value)
        .and_then(|_| shared::validate_currency_scale(value))
        .map_err(|m| AppError::invalid_field(field, m))
}

/// Capacity seeds remaining stock, so it must fit the stock column exactly
fn validate_capacity(value: Decimal) -> AppResult<()> {
    shared::validate_non_negative(value)
        .and_then(|_| shared::validate_quantity_scale(value))
        .map_err(|m| AppError::invalid_field("capacity", m))
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A supplied value replaces the current one; a blank value clears it
fn merge_text(new: Option<String>, current: Option<String>) -> Option<String> {
    match new {
        Some(value) => blank_to_none(Some(value)),
        None => current,
    }
}

async fn recipes_using(
    tx: &mut Transaction<'_, Postgres>,
    ingredient_id: Uuid,
) -> AppResult<Vec<Uuid>> {
    let ids: Vec<Uuid> = sqlx::query_scalar("SELECT DISTINCT recipe_id FROM recipe_items WHERE ingredient_id = $1")
        .bind(ingredient_id)
        .fetch_all(&mut **tx)
        .await?;
    Ok(ids)
}

/// Lock the recipes that use an ingredient, in id order
///
/// Recipe writers lock their recipe row before any ingredient row, so an
/// ingredient writer that rewrites cached recipe costs takes the recipe
/// locks before its own ingredient lock.
async fn lock_dependent_recipes(
    tx: &mut Transaction<'_, Postgres>,
    ingredient_id: Uuid,
) -> AppResult<Vec<Uuid>> {
    let ids: Vec<Uuid> = sqlx::query_scalar(
        r#"
        SELECT r.id FROM recipes r
        WHERE r.id IN (SELECT recipe_id FROM recipe_items WHERE ingredient_id = $1)
        ORDER BY r.id
        FOR UPDATE OF r
        "#,
    )
    .bind(ingredient_id)
    .fetch_all(&mut **tx)
    .await?;
    Ok(ids)
}

/// Recipes that started using the ingredient after the recipe locks were taken
fn unlocked_dependents(locked: &[Uuid], dependents: &[Uuid]) -> Vec<Uuid> {
    dependents
        .iter()
        .filter(|id| !locked.contains(id))
        .copied()
        .collect()
}

/// Recheck the dependent recipes once the ingredient row is locked
///
/// A recipe that picked up the ingredient in between is not locked and may
/// be held by a writer now waiting on this ingredient, so the request is
/// abandoned for a retry instead of blocking on it.
async fn ensure_dependents_locked(
    tx: &mut Transaction<'_, Postgres>,
    ingredient_id: Uuid,
    locked: &[Uuid],
) -> AppResult<Vec<Uuid>> {
    let dependents = recipes_using(tx, ingredient_id).await?;
    let missed = unlocked_dependents(locked, &dependents);
    if !missed.is_empty() {
        tracing::warn!(%ingredient_id, missed = missed.len(), "Recipe set changed while locking");
        return Err(dependents_changed());
    }
    Ok(dependents)
}

fn dependents_changed() -> AppError {
    AppError::Conflict {
        resource: "recipe".to_string(),
        message: "Recipes using this ingredient changed concurrently, please retry".to_string(),
        message_ko: "이 재료를 사용하는 레시피가 동시에 변경되었습니다. 다시 시도해 주세요"
            .to_string(),
    }
}

impl IngredientService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_ingredients(&self, store_id: Uuid) -> AppResult<Vec<Ingredient>> {
        let query = format!("{} WHERE i.store_id = $1 ORDER BY i.name", SELECT_INGREDIENT);
        let ingredients = sqlx::query_as::<_, Ingredient>(&query)
            .bind(store_id)
            .fetch_all(&self.db)
            .await?;
        Ok(ingredients)
    }

    pub async fn get_ingredient(&self, store_id: Uuid, ingredient_id: Uuid) -> AppResult<Ingredient> {
        let query = format!("{} WHERE i.store_id = $1 AND i.id = $2", SELECT_INGREDIENT);
        sqlx::query_as::<_, Ingredient>(&query)
            .bind(store_id)
            .bind(ingredient_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Ingredient".to_string()))
    }

    /// Register an ingredient together with a full inventory row
    pub async fn create_ingredient(
        &self,
        store_id: Uuid,
        input: CreateIngredientInput,
    ) -> AppResult<Ingredient> {
        shared::validate_name(&input.ingredient_name)
            .map_err(|m| AppError::invalid_field("ingredient_name", m))?;
        let unit = parse_unit(&input.unit)?;
        validate_price("ingredient_cost", input.ingredient_cost)?;
        validate_capacity(input.capacity)?;

        let unit_cost = match input.unit_cost {
            Some(cost) => {
                shared::validate_non_negative(cost)
                    .map_err(|m| AppError::invalid_field("unit_cost", m))?;
                cost
            }
            None => derive_unit_cost(input.ingredient_cost, input.capacity),
        };

        let mut tx = self.db.begin().await?;

        let ingredient_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO ingredients (store_id, name, unit, unit_cost, purchase_price,
                                     purchase_quantity, vendor, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(store_id)
        .bind(input.ingredient_name.trim())
        .bind(unit.as_str())
        .bind(unit_cost)
        .bind(input.ingredient_cost)
        .bind(input.capacity)
        .bind(blank_to_none(input.shop))
        .bind(blank_to_none(input.ingredient_detail))
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO inventory (ingredient_id, remaining_stock) VALUES ($1, $2)")
            .bind(ingredient_id)
            .bind(input.capacity)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(%store_id, %ingredient_id, "Created ingredient");
        self.get_ingredient(store_id, ingredient_id).await
    }

    /// Partially update an ingredient, rebasing stock when capacity changes
    pub async fn update_ingredient(
        &self,
        store_id: Uuid,
        ingredient_id: Uuid,
        input: UpdateIngredientInput,
    ) -> AppResult<Ingredient> {
        let mut tx = self.db.begin().await?;

        let locked_recipes = lock_dependent_recipes(&mut tx, ingredient_id).await?;
        super::reconciliation::ensure_inventory_rows(&mut tx, store_id, &[ingredient_id]).await?;

        let current = sqlx::query_as::<_, LockedIngredient>(
            r#"
            SELECT i.name, i.unit, i.unit_cost, i.purchase_price, i.purchase_quantity,
                   i.original_stock_before_edit, inv.remaining_stock, i.vendor, i.notes
            FROM ingredients i
            JOIN inventory inv ON inv.ingredient_id = i.id
            WHERE i.id = $1 AND i.store_id = $2
            FOR UPDATE OF i, inv
            "#,
        )
        .bind(ingredient_id)
        .bind(store_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Ingredient".to_string()))?;
        let dependents = ensure_dependents_locked(&mut tx, ingredient_id, &locked_recipes).await?;

        let name = match input.ingredient_name {
            Some(name) => {
                shared::validate_name(&name)
                    .map_err(|m| AppError::invalid_field("ingredient_name", m))?;
                name.trim().to_string()
            }
            None => current.name,
        };
        let unit = match input.unit {
            Some(unit) => parse_unit(&unit)?.as_str().to_string(),
            None => current.unit,
        };

        let purchase_price = input.ingredient_cost.unwrap_or(current.purchase_price);
        validate_price("ingredient_cost", purchase_price)?;
        let capacity = input.capacity.unwrap_or(current.purchase_quantity);
        validate_capacity(capacity)?;

        let purchase_changed =
            purchase_price != current.purchase_price || capacity != current.purchase_quantity;
        let unit_cost = match input.unit_cost {
            Some(cost) => {
                shared::validate_non_negative(cost)
                    .map_err(|m| AppError::invalid_field("unit_cost", m))?;
                cost
            }
            None if purchase_changed => derive_unit_cost(purchase_price, capacity),
            None => current.unit_cost,
        };

        let change = apply_capacity_change(
            current.remaining_stock,
            current.purchase_quantity,
            capacity,
            current.original_stock_before_edit,
        );

        sqlx::query(
            r#"
            UPDATE ingredients SET
                name = $3, unit = $4, unit_cost = $5, purchase_price = $6,
                purchase_quantity = $7, original_stock_before_edit = $8,
                vendor = $9, notes = $10, updated_at = NOW()
            WHERE id = $1 AND store_id = $2
            "#,
        )
        .bind(ingredient_id)
        .bind(store_id)
        .bind(&name)
        .bind(&unit)
        .bind(unit_cost)
        .bind(purchase_price)
        .bind(capacity)
        .bind(change.original_stock_before_edit)
        .bind(merge_text(input.shop, current.vendor))
        .bind(merge_text(input.ingredient_detail, current.notes))
        .execute(&mut *tx)
        .await?;

        if change.remaining_stock != current.remaining_stock {
            sqlx::query(
                "UPDATE inventory SET remaining_stock = $2, updated_at = NOW() WHERE ingredient_id = $1",
            )
            .bind(ingredient_id)
            .bind(change.remaining_stock)
            .execute(&mut *tx)
            .await?;

            tracing::info!(
                %ingredient_id,
                old_capacity = %current.purchase_quantity,
                new_capacity = %capacity,
                remaining = %change.remaining_stock,
                "Rebased stock after capacity change"
            );
        }

        if unit_cost != current.unit_cost {
            for recipe_id in dependents {
                super::recipe::refresh_costs(&mut tx, recipe_id).await?;
            }
        }

        tx.commit().await?;

        self.get_ingredient(store_id, ingredient_id).await
    }

    /// Delete an ingredient; inventory and recipe lines cascade
    ///
    /// Recipes that used the ingredient get their cached costs recomputed.
    pub async fn delete_ingredient(&self, store_id: Uuid, ingredient_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let locked_recipes = lock_dependent_recipes(&mut tx, ingredient_id).await?;

        let found: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM ingredients WHERE id = $1 AND store_id = $2 FOR UPDATE",
        )
        .bind(ingredient_id)
        .bind(store_id)
        .fetch_optional(&mut *tx)
        .await?;
        if found.is_none() {
            return Err(AppError::NotFound("Ingredient".to_string()));
        }

        let affected_recipes = ensure_dependents_locked(&mut tx, ingredient_id, &locked_recipes).await?;

        sqlx::query("DELETE FROM ingredients WHERE id = $1")
            .bind(ingredient_id)
            .execute(&mut *tx)
            .await?;

        for recipe_id in affected_recipes {
            super::recipe::refresh_costs(&mut tx, recipe_id).await?;
        }

        tx.commit().await?;

        tracing::info!(%store_id, %ingredient_id, "Deleted ingredient");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_limited_to_stock_scale() {
        assert!(validate_capacity(Decimal::new(1_000_500, 3)).is_ok());
        assert!(matches!(
            validate_capacity(Decimal::new(10_005, 4)),
            Err(AppError::Validation { field, .. }) if field == "capacity"
        ));
        assert!(validate_capacity(Decimal::NEGATIVE_ONE).is_err());
    }

    #[test]
    fn test_price_limited_to_currency_scale() {
        assert!(validate_price("ingredient_cost", Decimal::new(1_250_050, 2)).is_ok());
        assert!(validate_price("ingredient_cost", Decimal::new(1_005, 3)).is_err());
    }

    #[test]
    fn test_unlocked_dependents() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        assert!(unlocked_dependents(&[a, b], &[b, a]).is_empty());
        // A recipe that dropped the ingredient meanwhile is harmless
        assert!(unlocked_dependents(&[a, b], &[a]).is_empty());
        assert_eq!(unlocked_dependents(&[a], &[a, c]), vec![c]);
    }

    #[test]
    fn test_dependents_changed_is_a_conflict() {
        assert!(matches!(
            dependents_changed(),
            AppError::Conflict { resource, .. } if resource == "recipe"
        ));
    }

    #[test]
    fn test_merge_text() {
        assert_eq!(merge_text(None, Some("Mart".into())), Some("Mart".to_string()));
        assert_eq!(merge_text(Some("  ".into()), Some("Mart".into())), None);
        assert_eq!(merge_text(Some(" Costco ".into()), None), Some("Costco".to_string()));
    }
}

//! Inventory service for live ingredient stock

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::plan_direct_use;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::reconciliation::lock_positions;
use crate::error::{AppError, AppResult};

/// Inventory service for listing and drawing ingredient stock
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
}

/// Stock line of one ingredient
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InventoryItem {
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    /// Registered purchase quantity
    pub original_stock: Decimal,
    pub remaining_stock: Decimal,
    pub unit: String,
    pub unit_cost: Decimal,
}

/// Input for drawing stock directly
#[derive(Debug, Deserialize)]
pub struct UseStockInput {
    pub used_stock: Option<Decimal>,
}

impl UseStockInput {
    /// The amount to draw; it must be positive and fit the stock column exactly
    fn validated_amount(&self) -> AppResult<Decimal> {
        let used = self.used_stock.ok_or_else(|| {
            AppError::validation(
                "used_stock",
                "used_stock is required",
                "사용량을 입력해 주세요",
            )
        })?;
        shared::validate_positive(used)
            .and_then(|_| shared::validate_quantity_scale(used))
            .map_err(|m| AppError::invalid_field("used_stock", m))?;
        Ok(used)
    }
}

const SELECT_INVENTORY: &str = r#"
    SELECT i.id AS ingredient_id, i.name AS ingredient_name,
           i.purchase_quantity AS original_stock,
           COALESCE(inv.remaining_stock, i.purchase_quantity) AS remaining_stock,
           i.unit, i.unit_cost
    FROM ingredients i
    LEFT JOIN inventory inv ON inv.ingredient_id = i.id
"#;

impl InventoryService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_inventory(&self, store_id: Uuid) -> AppResult<Vec<InventoryItem>> {
        let query = format!("{} WHERE i.store_id = $1 ORDER BY i.name", SELECT_INVENTORY);
        let items = sqlx::query_as::<_, InventoryItem>(&query)
            .bind(store_id)
            .fetch_all(&self.db)
            .await?;
        Ok(items)
    }

    pub async fn get_item(&self, store_id: Uuid, ingredient_id: Uuid) -> AppResult<InventoryItem> {
        let query = format!("{} WHERE i.store_id = $1 AND i.id = $2", SELECT_INVENTORY);
        sqlx::query_as::<_, InventoryItem>(&query)
            .bind(store_id)
            .bind(ingredient_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Ingredient".to_string()))
    }

    /// Draw `used_stock` from an ingredient, bounded by `min(remaining, capacity)`
    pub async fn use_stock(
        &self,
        store_id: Uuid,
        ingredient_id: Uuid,
        input: UseStockInput,
    ) -> AppResult<InventoryItem> {
        let used = input.validated_amount()?;

        let mut tx = self.db.begin().await?;

        let position = lock_positions(&mut tx, store_id, &[ingredient_id], None)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("Ingredient".to_string()))?;

        let adjustment = plan_direct_use(position, used).map_err(|e| {
            tracing::warn!(%ingredient_id, error = %e, "Direct stock use rejected");
            AppError::from(e)
        })?;

        let remaining: Option<Decimal> = sqlx::query_scalar(
            r#"
            UPDATE inventory SET remaining_stock = remaining_stock - $2, updated_at = NOW()
            WHERE ingredient_id = $1 AND remaining_stock >= $2
            RETURNING remaining_stock
            "#,
        )
        .bind(ingredient_id)
        .bind(used)
        .fetch_optional(&mut *tx)
        .await?;

        match remaining {
            Some(value) if value == adjustment.remaining_after => {}
            _ => return Err(AppError::stock_conflict()),
        }

        tx.commit().await?;

        tracing::info!(
            %store_id,
            %ingredient_id,
            %used,
            remaining = %adjustment.remaining_after,
            "Used stock"
        );
        self.get_item(store_id, ingredient_id).await
    }
}

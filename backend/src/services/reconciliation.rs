//! Transactional side of stock reconciliation
//!
//! Loads and locks the stock positions a plan needs, then writes the plan
//! back. Callers own the transaction; nothing here commits.

use std::collections::HashMap;

use rust_decimal::Decimal;
use shared::{StockAdjustment, StockPosition};
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Locked ingredient and inventory columns
#[derive(Debug, FromRow)]
struct LockedStockRow {
    ingredient_id: Uuid,
    ingredient_name: String,
    purchase_quantity: Decimal,
    original_stock_before_edit: Option<Decimal>,
    remaining_stock: Decimal,
}

#[derive(Debug, FromRow)]
struct ConsumptionRow {
    ingredient_id: Uuid,
    total: Decimal,
}

/// Create inventory rows that are missing, starting full
pub async fn ensure_inventory_rows(
    tx: &mut Transaction<'_, Postgres>,
    store_id: Uuid,
    ingredient_ids: &[Uuid],
) -> AppResult<()> {
    if ingredient_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r#"
        INSERT INTO inventory (ingredient_id, remaining_stock)
        SELECT id, purchase_quantity FROM ingredients WHERE store_id = $1 AND id = ANY($2)
        ON CONFLICT (ingredient_id) DO NOTHING
        "#,
    )
    .bind(store_id)
    .bind(ingredient_ids)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Lock and load stock positions for `ingredient_ids` within a store
///
/// Rows are locked in ingredient id order so concurrent reconciliations
/// always acquire locks in the same sequence. Ingredients outside the store
/// are simply absent from the result. `exclude_recipe` is left out of the
/// consumption totals.
pub async fn lock_positions(
    tx: &mut Transaction<'_, Postgres>,
    store_id: Uuid,
    ingredient_ids: &[Uuid],
    exclude_recipe: Option<Uuid>,
) -> AppResult<Vec<StockPosition>> {
    let mut ids = ingredient_ids.to_vec();
    ids.sort();
    ids.dedup();
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    ensure_inventory_rows(tx, store_id, &ids).await?;

    let rows = sqlx::query_as::<_, LockedStockRow>(
        r#"
        SELECT i.id AS ingredient_id, i.name AS ingredient_name, i.purchase_quantity,
               i.original_stock_before_edit, inv.remaining_stock
        FROM ingredients i
        JOIN inventory inv ON inv.ingredient_id = i.id
        WHERE i.store_id = $1 AND i.id = ANY($2)
        ORDER BY i.id
        FOR UPDATE OF i, inv
        "#,
    )
    .bind(store_id)
    .bind(&ids[..])
    .fetch_all(&mut **tx)
    .await?;

    let consumed: HashMap<Uuid, Decimal> = sqlx::query_as::<_, ConsumptionRow>(
        r#"
        SELECT ingredient_id, COALESCE(SUM(quantity_used), 0) AS total
        FROM recipe_items
        WHERE ingredient_id = ANY($1) AND ($2::uuid IS NULL OR recipe_id <> $2)
        GROUP BY ingredient_id
        "#,
    )
    .bind(&ids[..])
    .bind(exclude_recipe)
    .fetch_all(&mut **tx)
    .await?
    .into_iter()
    .map(|row| (row.ingredient_id, row.total))
    .collect();

    Ok(rows
        .into_iter()
        .map(|row| StockPosition {
            consumed_elsewhere: consumed
                .get(&row.ingredient_id)
                .copied()
                .unwrap_or(Decimal::ZERO),
            ingredient_id: row.ingredient_id,
            ingredient_name: row.ingredient_name,
            purchase_quantity: row.purchase_quantity,
            original_stock_before_edit: row.original_stock_before_edit,
            remaining_stock: row.remaining_stock,
        })
        .collect())
}

/// Persist snapshots and stock changes from a plan
///
/// Each stock write is a compare-and-swap on the value read under lock; a
/// miss means the invariant that the row was locked has been broken and the
/// whole transaction is abandoned.
pub async fn apply_adjustments(
    tx: &mut Transaction<'_, Postgres>,
    adjustments: &[StockAdjustment],
) -> AppResult<()> {
    for adj in adjustments {
        if let Some(snapshot) = adj.snapshot_taken {
            sqlx::query(
                r#"
                UPDATE ingredients SET original_stock_before_edit = $2
                WHERE id = $1 AND original_stock_before_edit IS NULL
                "#,
            )
            .bind(adj.ingredient_id)
            .bind(snapshot)
            .execute(&mut **tx)
            .await?;
        }

        if !adj.changes_stock() {
            continue;
        }

        let result = sqlx::query(
            r#"
            UPDATE inventory SET remaining_stock = $3, updated_at = NOW()
            WHERE ingredient_id = $1 AND remaining_stock = $2
            "#,
        )
        .bind(adj.ingredient_id)
        .bind(adj.remaining_before)
        .bind(adj.remaining_after)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            tracing::warn!(
                ingredient_id = %adj.ingredient_id,
                expected = %adj.remaining_before,
                "Stock changed under lock"
            );
            return Err(AppError::stock_conflict());
        }

        tracing::debug!(
            ingredient_id = %adj.ingredient_id,
            before = %adj.remaining_before,
            after = %adj.remaining_after,
            "Stock adjusted"
        );
    }

    Ok(())
}

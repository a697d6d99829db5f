//! Stock reconciliation planning
//!
//! Every recipe mutation has to keep ingredient stock consistent:
//!
//! 1. restore what the recipe's previous items consumed, capped at the
//!    ingredient's current purchase quantity;
//! 2. snapshot the purchase quantity the first time an ingredient is touched,
//!    and zero the requested amount when the capacity has since shrunk while
//!    no recipe has ever consumed the ingredient (the recipe being saved
//!    included);
//! 3. deduct the new consumption, failing if any line exceeds remaining stock.
//!
//! The planner works on locked [`StockPosition`]s loaded by the caller and
//! returns a [`ReconciliationPlan`]; it never performs I/O, so the backend can
//! run it inside a transaction and apply the result with compare-and-swap
//! updates.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Consumption, RecipeLine};

/// Stock state of one ingredient at the start of a reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockPosition {
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub purchase_quantity: Decimal,
    pub original_stock_before_edit: Option<Decimal>,
    pub remaining_stock: Decimal,
    /// Quantity used by recipe items of recipes other than the one being saved
    pub consumed_elsewhere: Decimal,
}

impl StockPosition {
    /// Stock that may be drawn directly: never more than the registered capacity
    pub fn usable_stock(&self) -> Decimal {
        self.remaining_stock
            .min(self.purchase_quantity)
            .max(Decimal::ZERO)
    }

    /// Whether the capacity was lowered below the recorded snapshot
    pub fn capacity_shrunk(&self) -> bool {
        matches!(self.original_stock_before_edit, Some(snapshot) if self.purchase_quantity < snapshot)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StockError {
    #[error("ingredient {0} not found")]
    UnknownIngredient(Uuid),

    #[error("insufficient stock for {ingredient_name}: {available} available, {requested} requested")]
    Insufficient {
        ingredient_id: Uuid,
        ingredient_name: String,
        available: Decimal,
        requested: Decimal,
    },

    #[error("used stock must be greater than zero")]
    NonPositiveQuantity,
}

/// Net change to one ingredient's stock produced by a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockAdjustment {
    pub ingredient_id: Uuid,
    pub remaining_before: Decimal,
    pub remaining_after: Decimal,
    /// Snapshot newly taken during planning that must be persisted
    pub snapshot_taken: Option<Decimal>,
}

impl StockAdjustment {
    pub fn changes_stock(&self) -> bool {
        self.remaining_before != self.remaining_after
    }
}

/// A recipe line after reconciliation, carrying the amount actually consumed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLine {
    pub ingredient_id: Uuid,
    pub requested_amount: Decimal,
    pub quantity_used: Decimal,
    pub unit: Option<String>,
}

impl ResolvedLine {
    /// Whether the capacity-shrink rule replaced the requested amount
    pub fn was_reset(&self) -> bool {
        self.quantity_used != self.requested_amount
    }
}

/// Everything a recipe mutation must write
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationPlan {
    /// Sorted by ingredient id
    pub adjustments: Vec<StockAdjustment>,
    pub lines: Vec<ResolvedLine>,
}

#[derive(Debug, Clone)]
struct LedgerEntry {
    position: StockPosition,
    initial_remaining: Decimal,
    snapshot_taken: Option<Decimal>,
    /// What the recipe being saved consumed before this request
    prior_use: Decimal,
    deducted: Decimal,
}

/// Running stock state for the ingredients touched by one request
#[derive(Debug, Clone, Default)]
pub struct StockLedger {
    entries: BTreeMap<Uuid, LedgerEntry>,
}

impl StockLedger {
    pub fn new(positions: impl IntoIterator<Item = StockPosition>) -> Self {
        let entries = positions
            .into_iter()
            .map(|position| {
                let entry = LedgerEntry {
                    initial_remaining: position.remaining_stock,
                    snapshot_taken: None,
                    prior_use: Decimal::ZERO,
                    deducted: Decimal::ZERO,
                    position,
                };
                (entry.position.ingredient_id, entry)
            })
            .collect();
        Self { entries }
    }

    pub fn position(&self, ingredient_id: Uuid) -> Option<&StockPosition> {
        self.entries.get(&ingredient_id).map(|e| &e.position)
    }

    /// Give back `quantity` to an ingredient, capped at its purchase quantity
    ///
    /// Returns the amount effectively restored. Ingredients that no longer
    /// exist have nothing to restore. The full `quantity` still counts as
    /// historical consumption for the capacity-shrink rule.
    pub fn restore(&mut self, ingredient_id: Uuid, quantity: Decimal) -> Decimal {
        let Some(entry) = self.entries.get_mut(&ingredient_id) else {
            return Decimal::ZERO;
        };
        entry.prior_use += quantity;
        let position = &mut entry.position;
        let before = position.remaining_stock;
        let restored = (before + quantity).min(position.purchase_quantity);
        position.remaining_stock = restored;
        restored - before
    }

    /// Apply snapshot bookkeeping and the capacity-shrink rule to a request
    pub fn resolve_required(
        &mut self,
        ingredient_id: Uuid,
        requested: Decimal,
    ) -> Result<Decimal, StockError> {
        let entry = self
            .entries
            .get_mut(&ingredient_id)
            .ok_or(StockError::UnknownIngredient(ingredient_id))?;
        let position = &mut entry.position;

        if position.original_stock_before_edit.is_none() {
            position.original_stock_before_edit = Some(position.purchase_quantity);
            entry.snapshot_taken = Some(position.purchase_quantity);
        }

        let total_consumption = position.consumed_elsewhere + entry.prior_use + entry.deducted;
        if position.capacity_shrunk() && total_consumption.is_zero() {
            return Ok(Decimal::ZERO);
        }
        Ok(requested)
    }

    /// Take `amount` out of remaining stock, failing if there is not enough
    pub fn deduct(&mut self, ingredient_id: Uuid, amount: Decimal) -> Result<(), StockError> {
        let entry = self
            .entries
            .get_mut(&ingredient_id)
            .ok_or(StockError::UnknownIngredient(ingredient_id))?;
        let position = &mut entry.position;

        if position.remaining_stock < amount {
            return Err(StockError::Insufficient {
                ingredient_id,
                ingredient_name: position.ingredient_name.clone(),
                available: position.remaining_stock,
                requested: amount,
            });
        }

        position.remaining_stock -= amount;
        entry.deducted += amount;
        Ok(())
    }

    /// Draw stock directly, bounded by `min(remaining, purchase quantity)`
    pub fn consume(&mut self, ingredient_id: Uuid, used: Decimal) -> Result<Decimal, StockError> {
        if used <= Decimal::ZERO {
            return Err(StockError::NonPositiveQuantity);
        }
        let entry = self
            .entries
            .get_mut(&ingredient_id)
            .ok_or(StockError::UnknownIngredient(ingredient_id))?;
        let position = &mut entry.position;

        let available = position.usable_stock();
        if used > available {
            return Err(StockError::Insufficient {
                ingredient_id,
                ingredient_name: position.ingredient_name.clone(),
                available,
                requested: used,
            });
        }

        position.remaining_stock -= used;
        entry.deducted += used;
        Ok(position.remaining_stock)
    }

    /// Adjustments for every ingredient whose stock or snapshot changed
    pub fn into_adjustments(self) -> Vec<StockAdjustment> {
        self.entries
            .into_values()
            .filter(|e| e.snapshot_taken.is_some() || e.position.remaining_stock != e.initial_remaining)
            .map(|e| StockAdjustment {
                ingredient_id: e.position.ingredient_id,
                remaining_before: e.initial_remaining,
                remaining_after: e.position.remaining_stock,
                snapshot_taken: e.snapshot_taken,
            })
            .collect()
    }
}

/// Plan replacing a recipe's items (`previous` is empty for a new recipe)
pub fn plan_replacement(
    positions: impl IntoIterator<Item = StockPosition>,
    previous: &[Consumption],
    next: &[RecipeLine],
) -> Result<ReconciliationPlan, StockError> {
    let mut ledger = StockLedger::new(positions);

    for item in previous {
        ledger.restore(item.ingredient_id, item.quantity_used);
    }

    let mut lines = Vec::with_capacity(next.len());
    for line in next {
        let required = ledger.resolve_required(line.ingredient_id, line.required_amount)?;
        ledger.deduct(line.ingredient_id, required)?;
        lines.push(ResolvedLine {
            ingredient_id: line.ingredient_id,
            requested_amount: line.required_amount,
            quantity_used: required,
            unit: line.unit.clone(),
        });
    }

    Ok(ReconciliationPlan {
        adjustments: ledger.into_adjustments(),
        lines,
    })
}

/// Plan deleting a recipe: restore only
pub fn plan_removal(
    positions: impl IntoIterator<Item = StockPosition>,
    previous: &[Consumption],
) -> ReconciliationPlan {
    let mut ledger = StockLedger::new(positions);
    for item in previous {
        ledger.restore(item.ingredient_id, item.quantity_used);
    }
    ReconciliationPlan {
        adjustments: ledger.into_adjustments(),
        lines: Vec::new(),
    }
}

/// Plan a manual stock draw on one ingredient
pub fn plan_direct_use(position: StockPosition, used: Decimal) -> Result<StockAdjustment, StockError> {
    let ingredient_id = position.ingredient_id;
    let remaining_before = position.remaining_stock;
    let mut ledger = StockLedger::new([position]);
    let remaining_after = ledger.consume(ingredient_id, used)?;
    Ok(StockAdjustment {
        ingredient_id,
        remaining_before,
        remaining_after,
        snapshot_taken: None,
    })
}

/// Stock fields after an ingredient's purchase quantity is edited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityChange {
    pub remaining_stock: Decimal,
    pub original_stock_before_edit: Option<Decimal>,
}

/// Rebase remaining stock when the registered purchase quantity changes
///
/// The first edit records the previous capacity as the snapshot. Remaining
/// stock moves by the capacity delta and is clamped into `[0, new capacity]`.
pub fn apply_capacity_change(
    remaining_stock: Decimal,
    old_capacity: Decimal,
    new_capacity: Decimal,
    snapshot: Option<Decimal>,
) -> CapacityChange {
    if old_capacity == new_capacity {
        return CapacityChange {
            remaining_stock,
            original_stock_before_edit: snapshot,
        };
    }

    let shifted = remaining_stock + (new_capacity - old_capacity);
    CapacityChange {
        remaining_stock: shifted.max(Decimal::ZERO).min(new_capacity),
        original_stock_before_edit: snapshot.or(Some(old_capacity)),
    }
}

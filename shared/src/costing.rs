//! Recipe cost calculation
//!
//! All arithmetic is done in `Decimal` so currency values never drift the way
//! binary floats do. Rounding happens only at the storage boundary through
//! [`round_currency`].

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Decimal places kept for persisted currency values
pub const CURRENCY_SCALE: u32 = 2;

/// Price and consumed quantity of one ingredient line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientCost {
    pub unit_price: Decimal,
    pub quantity_used: Decimal,
}

impl IngredientCost {
    pub fn new(unit_price: Decimal, quantity_used: Decimal) -> Self {
        Self {
            unit_price,
            quantity_used,
        }
    }
}

/// Result of costing a recipe batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub total_material_cost: Decimal,
    /// Zero when the batch size is missing or not positive
    pub cost_per_item: Decimal,
    /// `sales_price - cost_per_item`, only when a sales price is known
    pub profit_per_item: Option<Decimal>,
    /// `cost_per_item / sales_price * 100`, only when the sales price is positive
    pub cost_ratio_percent: Option<Decimal>,
}

impl CostBreakdown {
    /// Derive profit and cost ratio from already known material and item costs
    ///
    /// Used with the costs cached on a recipe row.
    pub fn from_costs(
        total_material_cost: Decimal,
        cost_per_item: Decimal,
        sales_price_per_item: Option<Decimal>,
    ) -> Self {
        let profit_per_item = sales_price_per_item.map(|price| price - cost_per_item);
        let cost_ratio_percent = sales_price_per_item
            .filter(|price| *price > Decimal::ZERO)
            .and_then(|price| cost_per_item.checked_div(price))
            .map(|ratio| ratio * Decimal::ONE_HUNDRED);

        Self {
            total_material_cost,
            cost_per_item,
            profit_per_item,
            cost_ratio_percent,
        }
    }

    /// Copy with every amount rounded to [`CURRENCY_SCALE`] places
    pub fn rounded(&self) -> Self {
        Self {
            total_material_cost: round_currency(self.total_material_cost),
            cost_per_item: round_currency(self.cost_per_item),
            profit_per_item: self.profit_per_item.map(round_currency),
            cost_ratio_percent: self.cost_ratio_percent.map(round_currency),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CostError {
    #[error("recipe cost overflowed decimal range")]
    Overflow,
}

/// Compute the material cost of a batch and the production cost per item
pub fn calculate_recipe_cost(
    ingredients: &[IngredientCost],
    sales_price_per_item: Option<Decimal>,
    production_quantity_per_batch: Option<i32>,
) -> Result<CostBreakdown, CostError> {
    let mut total_material_cost = Decimal::ZERO;
    for line in ingredients {
        let line_cost = line
            .unit_price
            .checked_mul(line.quantity_used)
            .ok_or(CostError::Overflow)?;
        total_material_cost = total_material_cost
            .checked_add(line_cost)
            .ok_or(CostError::Overflow)?;
    }

    let cost_per_item = match production_quantity_per_batch {
        Some(batch) if batch > 0 => total_material_cost
            .checked_div(Decimal::from(batch))
            .ok_or(CostError::Overflow)?,
        _ => Decimal::ZERO,
    };

    Ok(CostBreakdown::from_costs(
        total_material_cost,
        cost_per_item,
        sales_price_per_item,
    ))
}

/// Round a currency amount for storage, half away from zero
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

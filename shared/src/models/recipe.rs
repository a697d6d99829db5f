//! Recipe bill-of-materials models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One requested ingredient line of a recipe, as parsed from a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeLine {
    pub ingredient_id: Uuid,
    pub required_amount: Decimal,
    /// Falls back to the ingredient's own unit when absent
    pub unit: Option<String>,
}

impl RecipeLine {
    pub fn new(ingredient_id: Uuid, required_amount: Decimal) -> Self {
        Self {
            ingredient_id,
            required_amount,
            unit: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

/// Stock consumed by an already persisted recipe item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumption {
    pub ingredient_id: Uuid,
    pub quantity_used: Decimal,
}

impl Consumption {
    pub fn new(ingredient_id: Uuid, quantity_used: Decimal) -> Self {
        Self {
            ingredient_id,
            quantity_used,
        }
    }
}

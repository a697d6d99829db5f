//! Ingredient catalog models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Units an ingredient can be purchased and consumed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngredientUnit {
    G,
    Kg,
    Ml,
    L,
    Ea,
}

impl IngredientUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngredientUnit::G => "g",
            IngredientUnit::Kg => "kg",
            IngredientUnit::Ml => "ml",
            IngredientUnit::L => "l",
            IngredientUnit::Ea => "ea",
        }
    }

    /// Parse a unit label, accepting common spellings
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "g" | "gram" | "grams" => Some(IngredientUnit::G),
            "kg" | "kilogram" | "kilograms" => Some(IngredientUnit::Kg),
            "ml" | "milliliter" | "milliliters" => Some(IngredientUnit::Ml),
            "l" | "liter" | "liters" => Some(IngredientUnit::L),
            "ea" | "each" | "pcs" | "piece" | "pieces" => Some(IngredientUnit::Ea),
            _ => None,
        }
    }
}

/// Derive the unit cost of an ingredient from what was paid for a purchase
///
/// Returns zero when nothing was purchased, so a freshly registered
/// ingredient never divides by zero.
pub fn derive_unit_cost(purchase_price: Decimal, purchase_quantity: Decimal) -> Decimal {
    if purchase_quantity <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    purchase_price
        .checked_div(purchase_quantity)
        .unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_unit_parse() {
        assert_eq!(IngredientUnit::parse("KG"), Some(IngredientUnit::Kg));
        assert_eq!(IngredientUnit::parse(" ml "), Some(IngredientUnit::Ml));
        assert_eq!(IngredientUnit::parse("pieces"), Some(IngredientUnit::Ea));
        assert_eq!(IngredientUnit::parse("cup"), None);
    }

    #[test]
    fn test_unit_round_trip_labels() {
        for unit in [
            IngredientUnit::G,
            IngredientUnit::Kg,
            IngredientUnit::Ml,
            IngredientUnit::L,
            IngredientUnit::Ea,
        ] {
            assert_eq!(IngredientUnit::parse(unit.as_str()), Some(unit));
        }
    }

    #[test]
    fn test_derive_unit_cost() {
        let cost = derive_unit_cost(Decimal::from(15000), Decimal::from(1000));
        assert_eq!(cost, Decimal::from_str("15").unwrap());
    }

    #[test]
    fn test_derive_unit_cost_zero_quantity() {
        assert_eq!(derive_unit_cost(Decimal::from(5000), Decimal::ZERO), Decimal::ZERO);
    }
}

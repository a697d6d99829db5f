//! WebAssembly module for LivFlow
//!
//! Lets the recipe editor preview costs and check ingredient payloads in the
//! browser with the same code the server runs:
//! - Recipe cost calculation
//! - Unit cost derivation
//! - Ingredient list validation

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

use shared::{CostBreakdown, IngredientCost, RecipeLine};

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("livflow-wasm ready"));
}

#[derive(Debug, Deserialize)]
struct CostRequest {
    #[serde(default)]
    ingredients: Vec<IngredientCost>,
    #[serde(default)]
    sales_price_per_item: Option<Decimal>,
    #[serde(default)]
    production_quantity_per_batch: Option<i32>,
}

#[derive(Debug, Serialize)]
struct LinesResponse {
    count: usize,
    lines: Vec<RecipeLine>,
}

fn cost_preview(request_json: &str) -> Result<CostBreakdown, String> {
    let request: CostRequest = serde_json::from_str(request_json)
        .map_err(|e| format!("Invalid cost request JSON: {}", e))?;

    shared::validate_production_quantity(request.production_quantity_per_batch)?;
    if let Some(price) = request.sales_price_per_item {
        shared::validate_non_negative(price)?;
    }

    shared::calculate_recipe_cost(
        &request.ingredients,
        request.sales_price_per_item,
        request.production_quantity_per_batch,
    )
    .map(|cost| cost.rounded())
    .map_err(|e| e.to_string())
}

fn ingredient_lines(payload_json: &str) -> Result<LinesResponse, String> {
    let lines = shared::parse_ingredient_list_text(payload_json).map_err(|e| e.to_string())?;
    Ok(LinesResponse {
        count: lines.len(),
        lines,
    })
}

fn to_js_error(message: String) -> JsValue {
    web_sys::console::warn_1(&JsValue::from_str(&message));
    JsValue::from_str(&message)
}

/// Cost a recipe batch; takes and returns JSON
#[wasm_bindgen(js_name = calculateRecipeCost)]
pub fn calculate_recipe_cost(request_json: &str) -> Result<String, JsValue> {
    let cost = cost_preview(request_json).map_err(to_js_error)?;
    serde_json::to_string(&cost).map_err(|e| to_js_error(e.to_string()))
}

/// Validate an ingredient list as the server would and return the parsed lines
#[wasm_bindgen(js_name = validateIngredientList)]
pub fn validate_ingredient_list(payload_json: &str) -> Result<String, JsValue> {
    let response = ingredient_lines(payload_json).map_err(to_js_error)?;
    serde_json::to_string(&response).map_err(|e| to_js_error(e.to_string()))
}

/// Unit cost of a purchase as a decimal string; `"0"` for unparseable input
#[wasm_bindgen(js_name = deriveUnitCost)]
pub fn derive_unit_cost(purchase_price: &str, purchase_quantity: &str) -> String {
    let price = purchase_price.trim().parse::<Decimal>().unwrap_or(Decimal::ZERO);
    let quantity = purchase_quantity
        .trim()
        .parse::<Decimal>()
        .unwrap_or(Decimal::ZERO);
    shared::derive_unit_cost(price, quantity).normalize().to_string()
}

/// Error message for an invalid name, or `undefined` when it is acceptable
#[wasm_bindgen(js_name = checkName)]
pub fn check_name(name: &str) -> Option<String> {
    shared::validate_name(name).err().map(str::to_string)
}


#[cfg(all(test, target_arch = "wasm32"))]
mod browser_tests {
    use super::*;
    use wasm_bindgen_test::*;

    #[wasm_bindgen_test]
    fn calculate_recipe_cost_round_trips_json() {
        let json = calculate_recipe_cost(
            r#"{"ingredients":[{"unit_price":"10","quantity_used":"1"}],"production_quantity_per_batch":3}"#,
        )
        .unwrap();
        let cost: CostBreakdown = serde_json::from_str(&json).unwrap();
        assert_eq!(cost.cost_per_item, Decimal::new(333, 2));
    }

    #[wasm_bindgen_test]
    fn validate_ingredient_list_rejects_scalars() {
        assert!(validate_ingredient_list("true").is_err());
    }
}

//! Ingredient list payload parsing
//!
//! Clients send a recipe's ingredients as a single object, a list of objects,
//! or either of those encoded as a JSON string (multipart forms can only carry
//! text). The payload is classified once into [`IngredientListPayload`] and
//! every other shape is rejected before anything touches the database.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::models::RecipeLine;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("ingredients must be an object, a list of objects, or a JSON string of either")]
    UnsupportedShape,

    #[error("nested ingredient lists are not accepted")]
    NestedList,

    #[error("ingredients string is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("ingredient #{index} is invalid: {reason}")]
    InvalidLine { index: usize, reason: String },

    #[error("ingredient #{index} has a negative required_amount")]
    NegativeAmount { index: usize },

    #[error("ingredient #{index} has more than 3 decimal places in required_amount")]
    TooPrecise { index: usize },
}

/// Accepted shapes of an ingredient list
#[derive(Debug, Clone, PartialEq)]
pub enum IngredientListPayload {
    Single(Map<String, Value>),
    Many(Vec<Map<String, Value>>),
}

/// Wire form of one line; `quantity_used` is the name older clients send
#[derive(Debug, Deserialize)]
struct RawLine {
    ingredient_id: Uuid,
    #[serde(default, alias = "quantity_used")]
    required_amount: Decimal,
    #[serde(default)]
    unit: Option<String>,
}

impl IngredientListPayload {
    /// Classify a JSON value, unwrapping at most one level of string encoding
    pub fn classify(value: Value) -> Result<Self, PayloadError> {
        match value {
            Value::String(encoded) => {
                let decoded: Value = serde_json::from_str(&encoded)
                    .map_err(|e| PayloadError::InvalidJson(e.to_string()))?;
                if decoded.is_string() {
                    return Err(PayloadError::UnsupportedShape);
                }
                Self::classify(decoded)
            }
            Value::Object(map) => Ok(Self::Single(map)),
            Value::Array(items) => {
                let mut lines = Vec::with_capacity(items.len());
                for (index, item) in items.into_iter().enumerate() {
                    match item {
                        Value::Object(map) => lines.push(map),
                        Value::Array(_) => return Err(PayloadError::NestedList),
                        other => {
                            return Err(PayloadError::InvalidLine {
                                index,
                                reason: format!("expected an object, found {}", kind_of(&other)),
                            })
                        }
                    }
                }
                Ok(Self::Many(lines))
            }
            _ => Err(PayloadError::UnsupportedShape),
        }
    }

    /// Validate every line and convert to domain lines
    pub fn into_lines(self) -> Result<Vec<RecipeLine>, PayloadError> {
        let maps = match self {
            Self::Single(map) => vec![map],
            Self::Many(maps) => maps,
        };

        maps.into_iter()
            .enumerate()
            .map(|(index, map)| parse_line(index, map))
            .collect()
    }
}

/// Parse an ingredient list from an already decoded JSON value
pub fn parse_ingredient_list(value: Value) -> Result<Vec<RecipeLine>, PayloadError> {
    IngredientListPayload::classify(value)?.into_lines()
}

/// Parse an ingredient list from raw text, as sent in a multipart field
pub fn parse_ingredient_list_text(raw: &str) -> Result<Vec<RecipeLine>, PayloadError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| PayloadError::InvalidJson(e.to_string()))?;
    parse_ingredient_list(value)
}

fn parse_line(index: usize, map: Map<String, Value>) -> Result<RecipeLine, PayloadError> {
    let raw: RawLine =
        serde_json::from_value(Value::Object(map)).map_err(|e| PayloadError::InvalidLine {
            index,
            reason: e.to_string(),
        })?;

    if raw.required_amount < Decimal::ZERO {
        return Err(PayloadError::NegativeAmount { index });
    }
    if crate::validation::validate_quantity_scale(raw.required_amount).is_err() {
        return Err(PayloadError::TooPrecise { index });
    }

    let unit = raw
        .unit
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());

    Ok(RecipeLine {
        ingredient_id: raw.ingredient_id,
        required_amount: raw.required_amount,
        unit,
    })
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

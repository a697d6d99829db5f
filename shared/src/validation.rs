//! Validation utilities for LivFlow request fields
//!
//! Each check returns a static message that the backend wraps into a
//! field-level validation error.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::costing::CURRENCY_SCALE;
use crate::types::DateRange;

// ============================================================================
// Catalog Validations
// ============================================================================

/// Longest accepted store, ingredient, recipe or category name
pub const MAX_NAME_LEN: usize = 100;

/// Validate a display name is present and not too long
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Name is required");
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err("Name must be at most 100 characters");
    }
    Ok(())
}

/// Validate an amount that may be zero (prices, capacities)
pub fn validate_non_negative(value: Decimal) -> Result<(), &'static str> {
    if value < Decimal::ZERO {
        return Err("Value cannot be negative");
    }
    Ok(())
}

/// Validate an amount that must be strictly positive (transaction amounts, stock use)
pub fn validate_positive(value: Decimal) -> Result<(), &'static str> {
    if value <= Decimal::ZERO {
        return Err("Value must be greater than zero");
    }
    Ok(())
}

/// Decimal places stored for stock quantities and recipe line amounts
pub const QUANTITY_SCALE: u32 = 3;

/// Validate a quantity fits its column without rounding
pub fn validate_quantity_scale(value: Decimal) -> Result<(), &'static str> {
    if value.normalize().scale() > QUANTITY_SCALE {
        return Err("Quantities allow at most 3 decimal places");
    }
    Ok(())
}

/// Validate a money amount fits its column without rounding
pub fn validate_currency_scale(value: Decimal) -> Result<(), &'static str> {
    if value.normalize().scale() > CURRENCY_SCALE {
        return Err("Amounts allow at most 2 decimal places");
    }
    Ok(())
}

/// Validate a batch size; absent is allowed, present must not be negative
pub fn validate_production_quantity(quantity: Option<i32>) -> Result<(), &'static str> {
    match quantity {
        Some(q) if q < 0 => Err("Production quantity cannot be negative"),
        _ => Ok(()),
    }
}

// ============================================================================
// Ledger Date Validations
// ============================================================================

fn parse_component<T: std::str::FromStr>(raw: &str) -> Result<T, &'static str> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err("Year, month and day must be numeric");
    }
    raw.parse::<T>()
        .map_err(|_| "Year, month and day must be numeric")
}

/// Parse `year`, `month`, `day` path segments into a calendar date
pub fn parse_ymd(year: &str, month: &str, day: &str) -> Result<NaiveDate, &'static str> {
    let year: i32 = parse_component(year)?;
    let month: u32 = parse_component(month)?;
    let day: u32 = parse_component(day)?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or("Date does not exist")
}

/// Build the month range for optional `year`/`month` list filters
///
/// Both must be given together; neither means no filter.
pub fn parse_month_filter(
    year: Option<&str>,
    month: Option<&str>,
) -> Result<Option<DateRange>, &'static str> {
    match (year, month) {
        (None, None) => Ok(None),
        (Some(year), Some(month)) => {
            let year: i32 = parse_component(year)?;
            let month: u32 = parse_component(month)?;
            DateRange::month(year, month)
                .map(Some)
                .ok_or("Month must be between 1 and 12")
        }
        _ => Err("Year and month must be given together"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Catalog Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Whole milk").is_ok());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"a".repeat(101)).is_err());
        assert!(validate_name(&"가".repeat(100)).is_ok());
    }

    #[test]
    fn test_validate_amounts() {
        assert!(validate_non_negative(Decimal::ZERO).is_ok());
        assert!(validate_non_negative(Decimal::NEGATIVE_ONE).is_err());
        assert!(validate_positive(Decimal::ONE).is_ok());
        assert!(validate_positive(Decimal::ZERO).is_err());
    }

    #[test]
    fn test_validate_quantity_scale() {
        assert!(validate_quantity_scale(Decimal::new(4999, 3)).is_ok());
        // Trailing zeros do not count
        assert!(validate_quantity_scale(Decimal::new(12_500_000, 6)).is_ok());
        assert!(validate_quantity_scale(Decimal::new(4, 4)).is_err());
        assert!(validate_quantity_scale(Decimal::new(-5, 4)).is_err());
    }

    #[test]
    fn test_validate_currency_scale() {
        assert!(validate_currency_scale(Decimal::new(350050, 2)).is_ok());
        assert!(validate_currency_scale(Decimal::new(35000, 0)).is_ok());
        assert!(validate_currency_scale(Decimal::new(1005, 3)).is_err());
    }

    #[test]
    fn test_validate_production_quantity() {
        assert!(validate_production_quantity(None).is_ok());
        assert!(validate_production_quantity(Some(0)).is_ok());
        assert!(validate_production_quantity(Some(-1)).is_err());
    }

    // ========================================================================
    // Date Validation Tests
    // ========================================================================

    #[test]
    fn test_parse_ymd() {
        assert_eq!(
            parse_ymd("2025", "03", "14"),
            Ok(NaiveDate::from_ymd_opt(2025, 3, 14).unwrap())
        );
        assert!(parse_ymd("2025", "march", "14").is_err());
        assert!(parse_ymd("2025", "-3", "14").is_err());
        assert_eq!(parse_ymd("2025", "2", "30"), Err("Date does not exist"));
    }

    #[test]
    fn test_parse_month_filter() {
        assert_eq!(parse_month_filter(None, None), Ok(None));
        let range = parse_month_filter(Some("2024"), Some("12")).unwrap().unwrap();
        assert_eq!(range.month_label(), "2024-12");
        assert!(parse_month_filter(Some("2024"), None).is_err());
        assert!(parse_month_filter(Some("2024"), Some("13")).is_err());
    }
}

//! Stock reconciliation tests
//!
//! Exercises the planner the recipe and inventory services run inside their
//! transactions:
//! - recipe saves deduct stock only when every line fits
//! - restores never push remaining stock above the purchase quantity
//! - replacing a recipe's items behaves like delete followed by recreate
//! - the capacity-shrink rule zeroes lines no recipe has ever consumed
//! - quantities are limited to the three decimal places stock columns store
//! - direct use is bounded by `min(remaining, capacity)`

use proptest::prelude::*;
use rust_decimal::Decimal;
use serde_json::json;
use shared::{
    apply_capacity_change, parse_ingredient_list, plan_direct_use, plan_removal,
    plan_replacement, Consumption, PayloadError, RecipeLine, StockAdjustment, StockError,
    StockPosition, QUANTITY_SCALE,
};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn position(name: &str, capacity: Decimal, remaining: Decimal) -> StockPosition {
    StockPosition {
        ingredient_id: Uuid::new_v4(),
        ingredient_name: name.to_string(),
        purchase_quantity: capacity,
        original_stock_before_edit: Some(capacity),
        remaining_stock: remaining,
        consumed_elsewhere: Decimal::ZERO,
    }
}

/// Remaining stock per ingredient after applying `adjustments` to `positions`
fn remaining_after(
    positions: &[StockPosition],
    adjustments: &[StockAdjustment],
) -> HashMap<Uuid, Decimal> {
    let mut remaining: HashMap<Uuid, Decimal> = positions
        .iter()
        .map(|p| (p.ingredient_id, p.remaining_stock))
        .collect();
    for adjustment in adjustments {
        remaining.insert(adjustment.ingredient_id, adjustment.remaining_after);
    }
    remaining
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Milk 1000ml with 800 left, a latte needs 200
    #[test]
    fn test_new_recipe_deducts_stock() {
        let milk = position("Milk", dec("1000"), dec("800"));
        let lines = vec![RecipeLine::new(milk.ingredient_id, dec("200")).with_unit("ml")];

        let plan = plan_replacement(vec![milk.clone()], &[], &lines).unwrap();

        assert_eq!(plan.adjustments.len(), 1);
        assert_eq!(plan.adjustments[0].remaining_before, dec("800"));
        assert_eq!(plan.adjustments[0].remaining_after, dec("600"));
        assert_eq!(plan.lines[0].quantity_used, dec("200"));
        assert_eq!(plan.lines[0].unit.as_deref(), Some("ml"));
        assert!(!plan.lines[0].was_reset());
    }

    #[test]
    fn test_insufficient_stock_names_the_ingredient() {
        let beans = position("Espresso beans", dec("500"), dec("15"));
        let lines = vec![RecipeLine::new(beans.ingredient_id, dec("18"))];

        let err = plan_replacement(vec![beans.clone()], &[], &lines).unwrap_err();

        assert_eq!(
            err,
            StockError::Insufficient {
                ingredient_id: beans.ingredient_id,
                ingredient_name: "Espresso beans".to_string(),
                available: dec("15"),
                requested: dec("18"),
            }
        );
    }

    /// Two lines of the same ingredient draw from one running balance
    #[test]
    fn test_repeated_ingredient_accumulates() {
        let sugar = position("Sugar", dec("1000"), dec("30"));
        let lines = vec![
            RecipeLine::new(sugar.ingredient_id, dec("20")),
            RecipeLine::new(sugar.ingredient_id, dec("20")),
        ];

        assert!(matches!(
            plan_replacement(vec![sugar], &[], &lines),
            Err(StockError::Insufficient { available, .. }) if available == dec("10")
        ));
    }

    #[test]
    fn test_unknown_ingredient_is_rejected() {
        let milk = position("Milk", dec("1000"), dec("1000"));
        let stranger = Uuid::new_v4();
        let lines = vec![RecipeLine::new(stranger, dec("1"))];

        assert_eq!(
            plan_replacement(vec![milk], &[], &lines),
            Err(StockError::UnknownIngredient(stranger))
        );
    }

    /// Editing a recipe restores its old usage before deducting the new one
    #[test]
    fn test_update_restores_previous_usage() {
        let milk = position("Milk", dec("1000"), dec("100"));
        let previous = vec![Consumption::new(milk.ingredient_id, dec("200"))];
        let lines = vec![RecipeLine::new(milk.ingredient_id, dec("250"))];

        let plan = plan_replacement(vec![milk], &previous, &lines).unwrap();

        // 100 + 200 restored = 300, minus 250
        assert_eq!(plan.adjustments[0].remaining_after, dec("50"));
    }

    #[test]
    fn test_update_to_same_usage_is_a_no_op() {
        let milk = position("Milk", dec("1000"), dec("600"));
        let previous = vec![Consumption::new(milk.ingredient_id, dec("200"))];
        let lines = vec![RecipeLine::new(milk.ingredient_id, dec("200"))];

        let plan = plan_replacement(vec![milk], &previous, &lines).unwrap();

        assert!(plan.adjustments.iter().all(|a| !a.changes_stock()));
    }

    #[test]
    fn test_delete_restore_is_capped_at_capacity() {
        let syrup = position("Vanilla syrup", dec("750"), dec("700"));
        let previous = vec![Consumption::new(syrup.ingredient_id, dec("100"))];

        let plan = plan_removal(vec![syrup], &previous);

        assert_eq!(plan.adjustments[0].remaining_after, dec("750"));
        assert!(plan.lines.is_empty());
    }

    /// Ingredients deleted since the recipe was saved have nothing to restore
    #[test]
    fn test_delete_skips_missing_ingredients() {
        let milk = position("Milk", dec("1000"), dec("800"));
        let previous = vec![
            Consumption::new(milk.ingredient_id, dec("200")),
            Consumption::new(Uuid::new_v4(), dec("5")),
        ];

        let plan = plan_removal(vec![milk], &previous);

        assert_eq!(plan.adjustments.len(), 1);
        assert_eq!(plan.adjustments[0].remaining_after, dec("1000"));
    }

    #[test]
    fn test_first_touch_takes_snapshot() {
        let mut cream = position("Cream", dec("500"), dec("500"));
        cream.original_stock_before_edit = None;
        let lines = vec![RecipeLine::new(cream.ingredient_id, dec("50"))];

        let plan = plan_replacement(vec![cream], &[], &lines).unwrap();

        assert_eq!(plan.adjustments[0].snapshot_taken, Some(dec("500")));
        assert_eq!(plan.adjustments[0].remaining_after, dec("450"));
    }

    /// Capacity lowered from 1000 to 500 and no recipe uses the ingredient
    #[test]
    fn test_shrunk_capacity_resets_unconsumed_line() {
        let mut milk = position("Milk", dec("500"), dec("500"));
        milk.original_stock_before_edit = Some(dec("1000"));
        let lines = vec![RecipeLine::new(milk.ingredient_id, dec("200"))];

        let plan = plan_replacement(vec![milk], &[], &lines).unwrap();

        assert_eq!(plan.lines[0].quantity_used, Decimal::ZERO);
        assert!(plan.lines[0].was_reset());
        assert!(plan.adjustments.iter().all(|a| !a.changes_stock()));
    }

    #[test]
    fn test_shrunk_capacity_consumed_elsewhere_deducts() {
        let mut milk = position("Milk", dec("500"), dec("300"));
        milk.original_stock_before_edit = Some(dec("1000"));
        milk.consumed_elsewhere = dec("200");
        let lines = vec![RecipeLine::new(milk.ingredient_id, dec("100"))];

        let plan = plan_replacement(vec![milk], &[], &lines).unwrap();

        assert_eq!(plan.lines[0].quantity_used, dec("100"));
        assert_eq!(plan.adjustments[0].remaining_after, dec("200"));
    }

    /// The only consumer is the recipe being edited; its old usage still counts
    #[test]
    fn test_shrunk_capacity_own_previous_usage_deducts() {
        let mut cream = position("Cream", dec("400"), dec("300"));
        cream.original_stock_before_edit = Some(dec("1000"));
        let previous = vec![Consumption::new(cream.ingredient_id, dec("100"))];
        let lines = vec![RecipeLine::new(cream.ingredient_id, dec("50"))];

        let plan = plan_replacement(vec![cream], &previous, &lines).unwrap();

        assert_eq!(plan.lines[0].quantity_used, dec("50"));
        assert_eq!(plan.adjustments[0].remaining_after, dec("350"));
    }

    /// Only the first line is reset; the second sees the first's consumption
    #[test]
    fn test_shrunk_capacity_second_line_counts_first() {
        let mut milk = position("Milk", dec("500"), dec("500"));
        milk.original_stock_before_edit = Some(dec("1000"));
        let lines = vec![
            RecipeLine::new(milk.ingredient_id, dec("0")),
            RecipeLine::new(milk.ingredient_id, dec("100")),
        ];

        let plan = plan_replacement(vec![milk], &[], &lines).unwrap();

        // A zero deduction leaves the running consumption at zero
        assert_eq!(plan.lines[1].quantity_used, Decimal::ZERO);
    }

    /// Lines finer than the stock column would be rounded away on insert
    #[test]
    fn test_sub_gram_line_rejected_before_planning() {
        let id = Uuid::new_v4();
        let result = parse_ingredient_list(json!([{ "ingredient_id": id, "required_amount": "0.0004" }]));
        assert_eq!(result, Err(PayloadError::TooPrecise { index: 0 }));
    }

    #[test]
    fn test_three_decimal_line_plans_exactly() {
        let salt = position("Salt", dec("5"), dec("5"));
        let id = salt.ingredient_id;
        let lines = parse_ingredient_list(json!({ "ingredient_id": id, "required_amount": "0.125" })).unwrap();

        let plan = plan_replacement(vec![salt], &[], &lines).unwrap();

        let after = plan.adjustments[0].remaining_after;
        assert_eq!(after, dec("4.875"));
        assert!(after.normalize().scale() <= QUANTITY_SCALE);
    }

    #[test]
    fn test_direct_use_until_empty() {
        let milk = position("Milk", dec("1000"), dec("5"));
        let id = milk.ingredient_id;

        let first = plan_direct_use(milk.clone(), dec("5")).unwrap();
        assert_eq!(first.remaining_after, Decimal::ZERO);

        let drained = StockPosition {
            remaining_stock: first.remaining_after,
            ..milk
        };
        assert_eq!(
            plan_direct_use(drained, dec("1")),
            Err(StockError::Insufficient {
                ingredient_id: id,
                ingredient_name: "Milk".to_string(),
                available: Decimal::ZERO,
                requested: dec("1"),
            })
        );
    }

    #[test]
    fn test_direct_use_bounded_by_capacity() {
        // Remaining above capacity can only happen through legacy rows
        let milk = position("Milk", dec("10"), dec("12"));
        assert!(matches!(
            plan_direct_use(milk, dec("11")),
            Err(StockError::Insufficient { available, .. }) if available == dec("10")
        ));
    }

    #[test]
    fn test_direct_use_rejects_non_positive() {
        let milk = position("Milk", dec("1000"), dec("1000"));
        assert_eq!(
            plan_direct_use(milk.clone(), Decimal::ZERO),
            Err(StockError::NonPositiveQuantity)
        );
        assert_eq!(
            plan_direct_use(milk, dec("-3")),
            Err(StockError::NonPositiveQuantity)
        );
    }

    #[test]
    fn test_capacity_edit_shifts_remaining() {
        let change = apply_capacity_change(dec("800"), dec("1000"), dec("500"), None);
        assert_eq!(change.remaining_stock, dec("300"));
        assert_eq!(change.original_stock_before_edit, Some(dec("1000")));

        let grown = apply_capacity_change(dec("300"), dec("500"), dec("2000"), Some(dec("1000")));
        assert_eq!(grown.remaining_stock, dec("1800"));
        assert_eq!(grown.original_stock_before_edit, Some(dec("1000")));
    }

    #[test]
    fn test_capacity_edit_clamps_at_zero() {
        let change = apply_capacity_change(dec("100"), dec("1000"), dec("200"), Some(dec("1000")));
        assert_eq!(change.remaining_stock, Decimal::ZERO);
    }

    #[test]
    fn test_capacity_unchanged_keeps_snapshot_empty() {
        let change = apply_capacity_change(dec("40"), dec("100"), dec("100"), None);
        assert_eq!(change.remaining_stock, dec("40"));
        assert_eq!(change.original_stock_before_edit, None);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Amounts with up to two decimal places, as entered in the UI
    fn amount_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..200_000i64).prop_map(|cents| Decimal::new(cents, 2))
    }

    /// `(capacity, remaining, requested)` with remaining within capacity
    fn stock_strategy() -> impl Strategy<Value = (Decimal, Decimal, Decimal)> {
        (1i64..200_000i64, 0u32..=100u32, amount_strategy()).prop_map(|(cap, pct, requested)| {
            let capacity = Decimal::new(cap, 2);
            let remaining = (capacity * Decimal::from(pct) / Decimal::ONE_HUNDRED).round_dp(2);
            (capacity, remaining, requested)
        })
    }

    fn positions_from(stock: &[(Decimal, Decimal, Decimal)]) -> Vec<StockPosition> {
        stock
            .iter()
            .enumerate()
            .map(|(i, (capacity, remaining, _))| position(&format!("item-{i}"), *capacity, *remaining))
            .collect()
    }

    proptest! {
        /// A recipe save deducts exactly when every line fits its stock
        #[test]
        fn prop_save_deducts_iff_all_lines_fit(
            stock in prop::collection::vec(stock_strategy(), 1..6)
        ) {
            let positions = positions_from(&stock);
            let lines: Vec<RecipeLine> = positions
                .iter()
                .zip(&stock)
                .map(|(p, (_, _, requested))| RecipeLine::new(p.ingredient_id, *requested))
                .collect();
            let all_fit = stock.iter().all(|(_, remaining, requested)| requested <= remaining);

            match plan_replacement(positions.clone(), &[], &lines) {
                Ok(plan) => {
                    prop_assert!(all_fit);
                    let remaining = remaining_after(&positions, &plan.adjustments);
                    for (p, (_, before, requested)) in positions.iter().zip(&stock) {
                        prop_assert_eq!(remaining[&p.ingredient_id], *before - *requested);
                    }
                }
                Err(StockError::Insufficient { .. }) => prop_assert!(!all_fit),
                Err(other) => prop_assert!(false, "unexpected error: {}", other),
            }
        }

        /// Remaining stock never goes negative after a successful plan
        #[test]
        fn prop_remaining_never_negative(
            stock in prop::collection::vec(stock_strategy(), 1..6),
            previous_use in prop::collection::vec(amount_strategy(), 6)
        ) {
            let positions = positions_from(&stock);
            let previous: Vec<Consumption> = positions
                .iter()
                .zip(&previous_use)
                .map(|(p, q)| Consumption::new(p.ingredient_id, *q))
                .collect();
            let lines: Vec<RecipeLine> = positions
                .iter()
                .zip(&stock)
                .map(|(p, (_, _, requested))| RecipeLine::new(p.ingredient_id, *requested))
                .collect();

            if let Ok(plan) = plan_replacement(positions.clone(), &previous, &lines) {
                for adjustment in &plan.adjustments {
                    prop_assert!(adjustment.remaining_after >= Decimal::ZERO);
                }
            }
        }

        /// Deleting a recipe restores usage capped at the purchase quantity
        #[test]
        fn prop_removal_restore_is_capped(
            (capacity, remaining, used) in stock_strategy()
        ) {
            let p = position("item", capacity, remaining);
            let previous = vec![Consumption::new(p.ingredient_id, used)];

            let plan = plan_removal(vec![p.clone()], &previous);
            let after = remaining_after(&[p.clone()], &plan.adjustments)[&p.ingredient_id];

            prop_assert_eq!(after, (remaining + used).min(capacity));
            prop_assert!(after <= capacity);
        }

        /// Replacing items ends where deleting and recreating the recipe would
        #[test]
        fn prop_replace_equals_delete_then_create(
            stock in prop::collection::vec(stock_strategy(), 1..5),
            previous_use in prop::collection::vec(amount_strategy(), 5)
        ) {
            let positions = positions_from(&stock);
            let previous: Vec<Consumption> = positions
                .iter()
                .zip(&previous_use)
                .map(|(p, q)| Consumption::new(p.ingredient_id, *q))
                .collect();
            let lines: Vec<RecipeLine> = positions
                .iter()
                .zip(&stock)
                .map(|(p, (_, _, requested))| RecipeLine::new(p.ingredient_id, *requested))
                .collect();

            let replaced = plan_replacement(positions.clone(), &previous, &lines);

            let removal = plan_removal(positions.clone(), &previous);
            let restored = remaining_after(&positions, &removal.adjustments);
            let after_delete: Vec<StockPosition> = positions
                .iter()
                .map(|p| StockPosition {
                    remaining_stock: restored[&p.ingredient_id],
                    ..p.clone()
                })
                .collect();
            let recreated = plan_replacement(after_delete.clone(), &[], &lines);

            match (replaced, recreated) {
                (Ok(a), Ok(b)) => {
                    prop_assert_eq!(
                        remaining_after(&positions, &a.adjustments),
                        remaining_after(&after_delete, &b.adjustments)
                    );
                    prop_assert_eq!(a.lines, b.lines);
                }
                (Err(a), Err(b)) => prop_assert_eq!(a, b),
                (a, b) => prop_assert!(false, "diverged: {:?} vs {:?}", a, b),
            }
        }

        /// A shrunk capacity with no consumers records zero and leaves stock alone
        #[test]
        fn prop_shrunk_capacity_resets_to_zero(
            (capacity, remaining, requested) in stock_strategy(),
            extra in 1i64..100_000i64
        ) {
            let mut p = position("item", capacity, remaining);
            p.original_stock_before_edit = Some(capacity + Decimal::new(extra, 2));
            let lines = vec![RecipeLine::new(p.ingredient_id, requested)];

            let plan = plan_replacement(vec![p.clone()], &[], &lines).unwrap();

            prop_assert_eq!(plan.lines[0].quantity_used, Decimal::ZERO);
            prop_assert_eq!(
                remaining_after(&[p.clone()], &plan.adjustments)[&p.ingredient_id],
                remaining
            );
        }

        /// Direct use succeeds iff `0 < used <= min(remaining, capacity)`
        #[test]
        fn prop_direct_use_bounds(
            (capacity, remaining, used) in stock_strategy()
        ) {
            let p = position("item", capacity, remaining);
            let bound = remaining.min(capacity);

            match plan_direct_use(p, used) {
                Ok(adjustment) => {
                    prop_assert!(used > Decimal::ZERO && used <= bound);
                    prop_assert_eq!(adjustment.remaining_after, remaining - used);
                }
                Err(StockError::NonPositiveQuantity) => prop_assert!(used <= Decimal::ZERO),
                Err(StockError::Insufficient { .. }) => prop_assert!(used > bound),
                Err(other) => prop_assert!(false, "unexpected error: {}", other),
            }
        }

        /// Capacity edits keep remaining stock within `[0, new capacity]`
        #[test]
        fn prop_capacity_change_stays_in_range(
            (old_capacity, remaining, _) in stock_strategy(),
            new_capacity in amount_strategy()
        ) {
            let change = apply_capacity_change(remaining, old_capacity, new_capacity, None);

            if old_capacity != new_capacity {
                prop_assert!(change.remaining_stock >= Decimal::ZERO);
                prop_assert!(change.remaining_stock <= new_capacity);
                prop_assert_eq!(change.original_stock_before_edit, Some(old_capacity));
            } else {
                prop_assert_eq!(change.remaining_stock, remaining);
            }
        }
    }
}

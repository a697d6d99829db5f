//! Ledger tests
//!
//! Date filters used by the ledger listing, daily view and monthly summary,
//! plus the income/expense totals they feed.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{parse_month_filter, parse_ymd, DateRange, LedgerSummary, TransactionType};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_daily_lookup_date() {
        assert_eq!(parse_ymd("2025", "1", "31"), Ok(date(2025, 1, 31)));
        assert_eq!(parse_ymd(" 2024 ", "02", "29"), Ok(date(2024, 2, 29)));
        assert_eq!(parse_ymd("2023", "02", "29"), Err("Date does not exist"));
        assert_eq!(
            parse_ymd("2025", "1.5", "3"),
            Err("Year, month and day must be numeric")
        );
        assert_eq!(parse_ymd("", "1", "3"), Err("Year, month and day must be numeric"));
    }

    #[test]
    fn test_month_filter_requires_both_parts() {
        assert_eq!(parse_month_filter(None, None), Ok(None));
        assert_eq!(
            parse_month_filter(None, Some("3")),
            Err("Year and month must be given together")
        );
        assert_eq!(
            parse_month_filter(Some("2025"), Some("0")),
            Err("Month must be between 1 and 12")
        );
    }

    #[test]
    fn test_month_filter_range() {
        let range = parse_month_filter(Some("2025"), Some("3")).unwrap().unwrap();
        assert_eq!(range, DateRange::month(2025, 3).unwrap());
        assert!(range.contains(date(2025, 3, 1)));
        assert!(range.contains(date(2025, 3, 31)));
        assert!(!range.contains(date(2025, 4, 1)));
        assert!(!range.contains(date(2025, 2, 28)));
    }

    /// Sales of 45,000 and 30,000 against 12,500 of supplies
    #[test]
    fn test_monthly_summary() {
        let entries = vec![
            (TransactionType::Income, Decimal::from(45000)),
            (TransactionType::Income, Decimal::from(30000)),
            (TransactionType::Expense, Decimal::new(125000, 1)),
        ];

        let summary = LedgerSummary::from_entries(entries.iter().map(|(t, a)| (*t, a)));

        assert_eq!(summary.total_income, Decimal::from(75000));
        assert_eq!(summary.total_expense, Decimal::from(12500));
        assert_eq!(summary.balance, Decimal::from(62500));
        assert_eq!(summary.transaction_count, 3);
    }

    #[test]
    fn test_negative_balance() {
        let entries = vec![(TransactionType::Expense, Decimal::from(900))];
        let summary = LedgerSummary::from_entries(entries.iter().map(|(t, a)| (*t, a)));
        assert_eq!(summary.balance, Decimal::from(-900));
    }

    #[test]
    fn test_transaction_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&TransactionType::Expense).unwrap(),
            "\"expense\""
        );
        let parsed: TransactionType = serde_json::from_str("\"income\"").unwrap();
        assert_eq!(parsed, TransactionType::Income);
        assert!(serde_json::from_str::<TransactionType>("\"Income\"").is_err());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn entry_strategy() -> impl Strategy<Value = (TransactionType, Decimal)> {
        (
            prop::bool::ANY,
            1i64..100_000_000i64,
        )
            .prop_map(|(income, cents)| {
                let kind = if income {
                    TransactionType::Income
                } else {
                    TransactionType::Expense
                };
                (kind, Decimal::new(cents, 2))
            })
    }

    proptest! {
        /// Balance is income minus expense and every entry is counted once
        #[test]
        fn prop_summary_balances(entries in prop::collection::vec(entry_strategy(), 0..50)) {
            let summary = LedgerSummary::from_entries(entries.iter().map(|(t, a)| (*t, a)));

            let income: Decimal = entries
                .iter()
                .filter(|(t, _)| *t == TransactionType::Income)
                .map(|(_, a)| *a)
                .sum();
            let expense: Decimal = entries
                .iter()
                .filter(|(t, _)| *t == TransactionType::Expense)
                .map(|(_, a)| *a)
                .sum();

            prop_assert_eq!(summary.total_income, income);
            prop_assert_eq!(summary.total_expense, expense);
            prop_assert_eq!(summary.balance, income - expense);
            prop_assert_eq!(summary.transaction_count, entries.len() as i64);
        }

        /// Every day of a month falls in exactly that month's range
        #[test]
        fn prop_month_range_contains_its_days(year in 2000i32..2100, month in 1u32..=12, day in 1u32..=31) {
            let range = DateRange::month(year, month).unwrap();
            match NaiveDate::from_ymd_opt(year, month, day) {
                Some(d) => {
                    prop_assert!(range.contains(d));
                    prop_assert_eq!(parse_ymd(&year.to_string(), &month.to_string(), &day.to_string()), Ok(d));
                }
                None => prop_assert!(parse_ymd(&year.to_string(), &month.to_string(), &day.to_string()).is_err()),
            }
            prop_assert!(!range.contains(range.end));
        }

        /// Daily ranges cover one day only
        #[test]
        fn prop_day_range_is_one_day(days in 0i64..40_000) {
            let d = date(2000, 1, 1) + chrono::Duration::days(days);
            let range = DateRange::day(d).unwrap();

            prop_assert!(range.contains(d));
            prop_assert!(!range.contains(range.end));
            prop_assert_eq!((range.end - range.start).num_days(), 1);
        }
    }
}

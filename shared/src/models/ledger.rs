//! Ledger models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a ledger transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "income" => Some(TransactionType::Income),
            "expense" => Some(TransactionType::Expense),
            _ => None,
        }
    }
}

/// Totals over a set of ledger transactions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub balance: Decimal,
    pub transaction_count: i64,
}

impl LedgerSummary {
    /// Fold `(type, amount)` pairs into income, expense and balance totals
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (TransactionType, &'a Decimal)>,
    {
        let mut total_income = Decimal::ZERO;
        let mut total_expense = Decimal::ZERO;
        let mut transaction_count = 0;

        for (kind, amount) in entries {
            match kind {
                TransactionType::Income => total_income += amount,
                TransactionType::Expense => total_expense += amount,
            }
            transaction_count += 1;
        }

        Self {
            total_income,
            total_expense,
            balance: total_income - total_expense,
            transaction_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_type_str() {
        assert_eq!(TransactionType::Income.as_str(), "income");
        assert_eq!(TransactionType::from_str("expense"), Some(TransactionType::Expense));
        assert_eq!(TransactionType::from_str("refund"), None);
    }

    #[test]
    fn test_summary_balance() {
        let entries = vec![
            (TransactionType::Income, Decimal::from(50000)),
            (TransactionType::Expense, Decimal::from(12000)),
            (TransactionType::Income, Decimal::from(8000)),
        ];
        let summary = LedgerSummary::from_entries(entries.iter().map(|(t, a)| (*t, a)));

        assert_eq!(summary.total_income, Decimal::from(58000));
        assert_eq!(summary.total_expense, Decimal::from(12000));
        assert_eq!(summary.balance, Decimal::from(46000));
        assert_eq!(summary.transaction_count, 3);
    }

    #[test]
    fn test_summary_empty() {
        let summary = LedgerSummary::from_entries(std::iter::empty());
        assert_eq!(summary.balance, Decimal::ZERO);
        assert_eq!(summary.transaction_count, 0);
    }
}

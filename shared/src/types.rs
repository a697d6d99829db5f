//! Common types used across the platform

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Half-open date range `[start, end)` for ledger queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// The single day `date`
    pub fn day(date: NaiveDate) -> Option<Self> {
        Some(Self {
            start: date,
            end: date.succ_opt()?,
        })
    }

    /// The calendar month `month` of `year`
    pub fn month(year: i32, month: u32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let end = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Some(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    /// `YYYY-MM` label of the month the range starts in
    pub fn month_label(&self) -> String {
        format!("{}-{:02}", self.start.year(), self.start.month())
    }
}

//! Inclusive calendar-date ranges used by history queries.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use swagstock_core::{DomainError, DomainResult};

/// `[from, to]`, both days included, interpreted in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    from: NaiveDate,
    to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> DomainResult<Self> {
        if from > to {
            return Err(DomainError::validation(format!(
                "date range start {from} is after end {to}"
            )));
        }
        Ok(Self { from, to })
    }

    /// A single day.
    pub fn day(day: NaiveDate) -> Self {
        Self { from: day, to: day }
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }

    /// First instant of the range.
    pub fn start(&self) -> DateTime<Utc> {
        self.from.and_time(chrono::NaiveTime::MIN).and_utc()
    }

    /// First instant after the range (exclusive upper bound).
    pub fn end_exclusive(&self) -> DateTime<Utc> {
        self.to
            .checked_add_days(Days::new(1))
            .unwrap_or(NaiveDate::MAX)
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start() && at < self.end_exclusive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn both_ends_are_inclusive() {
        let range = DateRange::new(date(2025, 1, 1), date(2025, 1, 31)).unwrap();
        let first = date(2025, 1, 1).and_hms_opt(0, 0, 0).unwrap().and_utc();
        let last = date(2025, 1, 31).and_hms_opt(23, 59, 59).unwrap().and_utc();
        let after = date(2025, 2, 1).and_hms_opt(0, 0, 0).unwrap().and_utc();

        assert!(range.contains(first));
        assert!(range.contains(last));
        assert!(!range.contains(after));
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(DateRange::new(date(2025, 2, 1), date(2025, 1, 1)).is_err());
    }
}

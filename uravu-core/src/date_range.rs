use chrono::{NaiveDate, TimeDelta};
use std::mem::replace;

/// A date range iterator that yields each date from the start date
/// through the end date (inclusive).
#[derive(Clone, Eq, PartialEq, Copy, Debug)]
pub struct DateRange(pub NaiveDate, pub NaiveDate);

impl DateRange {
    /// Number of calendar days covered, inclusive on both ends.
    pub fn num_days(&self) -> usize {
        let days = (self.1 - self.0).num_days() + 1;
        usize::try_from(days).unwrap_or(0)
    }
}

impl Iterator for DateRange {
    type Item = NaiveDate;
    fn next(&mut self) -> Option<Self::Item> {
        if self.0 <= self.1 {
            let next = self.0 + TimeDelta::days(1);
            Some(replace(&mut self.0, next))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DateRange;
    use chrono::NaiveDate;

    #[test]
    fn test_date_range_iteration() {
        let start = NaiveDate::from_ymd_opt(2024, 12, 15).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 12, 20).unwrap();
        let range = DateRange(start, end);
        assert_eq!(range.num_days(), 6);
        let dates: Vec<NaiveDate> = range.collect();
        assert_eq!(dates.len(), 6);
        assert_eq!(dates[0], start);
        assert_eq!(dates[5], end);
    }

    #[test]
    fn test_date_range_single_day() {
        let start = NaiveDate::from_ymd_opt(2024, 12, 15).unwrap();
        let range = DateRange(start, start);
        assert_eq!(range.num_days(), 1);
        assert_eq!(range.count(), 1);
    }

    #[test]
    fn test_date_range_empty() {
        let start = NaiveDate::from_ymd_opt(2022, 3, 15).unwrap();
        let end = NaiveDate::from_ymd_opt(2022, 3, 14).unwrap();
        let range = DateRange(start, end);
        assert_eq!(range.num_days(), 0);
        assert_eq!(range.count(), 0);
    }

    #[test]
    fn test_date_range_leap_year() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert_eq!(DateRange(start, end).num_days(), 366);
    }
}

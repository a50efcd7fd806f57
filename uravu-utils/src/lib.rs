//! Shared utility functions for Uravu crates.

/// Date utility functions
pub mod dates {
    use crate::error::DateError;
    use chrono::{Datelike, NaiveDate};

    /// Date format used for API query parameters and report labels: "YYYY-MM-DD"
    pub const DATE_FORMAT: &str = "%Y-%m-%d";

    /// Format a NaiveDate as "YYYY-MM-DD"
    pub fn format_date(date: &NaiveDate) -> String {
        date.format(DATE_FORMAT).to_string()
    }

    /// Parse a date string in "YYYY-MM-DD" format
    pub fn parse_date(s: &str) -> Result<NaiveDate, DateError> {
        NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
            .map_err(|e| DateError::Parse(format!("{s}: {e}")))
    }

    /// Last calendar day of the given month.
    pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
    }

    /// Last day of the month `date` falls in.
    pub fn month_end(date: &NaiveDate) -> Option<NaiveDate> {
        last_day_of_month(date.year(), date.month())
    }

    /// Dec 31 of the year `date` falls in.
    pub fn year_end(date: &NaiveDate) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(date.year(), 12, 31)
    }

    fn split_year_month(s: &str) -> Result<(i32, u32), DateError> {
        let (y, m) = s
            .split_once('-')
            .ok_or_else(|| DateError::Parse(s.to_string()))?;
        let year: i32 = y.parse().map_err(|_| DateError::Parse(s.to_string()))?;
        let month: u32 = m.parse().map_err(|_| DateError::Parse(s.to_string()))?;
        if !(1..=12).contains(&month) {
            return Err(DateError::Parse(s.to_string()));
        }
        Ok((year, month))
    }

    /// Expand the start of a range to a full calendar date.
    ///
    /// `YYYY` becomes Jan 1, `YYYY-MM` the first of the month, and a full
    /// `YYYY-MM-DD` is returned unchanged.
    pub fn expand_start(s: &str) -> Result<NaiveDate, DateError> {
        let s = s.trim();
        match s.len() {
            4 => {
                let year: i32 = s.parse().map_err(|_| DateError::Parse(s.to_string()))?;
                NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(|| DateError::Parse(s.to_string()))
            }
            7 => {
                let (year, month) = split_year_month(s)?;
                NaiveDate::from_ymd_opt(year, month, 1)
                    .ok_or_else(|| DateError::Parse(s.to_string()))
            }
            _ => parse_date(s),
        }
    }

    /// Expand the end of a range to a full calendar date.
    ///
    /// `YYYY` becomes Dec 31, `YYYY-MM` the last day of the month, and a full
    /// `YYYY-MM-DD` is returned unchanged.
    pub fn expand_end(s: &str) -> Result<NaiveDate, DateError> {
        let s = s.trim();
        match s.len() {
            4 => {
                let year: i32 = s.parse().map_err(|_| DateError::Parse(s.to_string()))?;
                NaiveDate::from_ymd_opt(year, 12, 31)
                    .ok_or_else(|| DateError::Parse(s.to_string()))
            }
            7 => {
                let (year, month) = split_year_month(s)?;
                last_day_of_month(year, month).ok_or_else(|| DateError::Parse(s.to_string()))
            }
            _ => parse_date(s),
        }
    }

    /// Expand a (start, end) pair to full calendar dates and check ordering.
    pub fn expand_range(start: &str, end: &str) -> Result<(NaiveDate, NaiveDate), DateError> {
        let start_date = expand_start(start)?;
        let end_date = expand_end(end)?;
        if start_date > end_date {
            return Err(DateError::Inverted {
                start: format_date(&start_date),
                end: format_date(&end_date),
            });
        }
        Ok((start_date, end_date))
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use chrono::NaiveDate;

        #[test]
        fn test_expand_year() {
            let (start, end) = expand_range("2023", "2024").unwrap();
            assert_eq!(start, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
            assert_eq!(end, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        }

        #[test]
        fn test_expand_year_month() {
            let (start, end) = expand_range("2024-02", "2024-02").unwrap();
            assert_eq!(start, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
            // leap year
            assert_eq!(end, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

            let (_, end) = expand_range("2023-11", "2023-12").unwrap();
            assert_eq!(end, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
        }

        #[test]
        fn test_expansion_is_idempotent() {
            let (start, end) = expand_range("2024-03", "2024-04").unwrap();
            let (start2, end2) = expand_range(&format_date(&start), &format_date(&end)).unwrap();
            assert_eq!((start, end), (start2, end2));

            let (start, end) = expand_range("2024-12-15", "2024-12-20").unwrap();
            assert_eq!(format_date(&start), "2024-12-15");
            assert_eq!(format_date(&end), "2024-12-20");
        }

        #[test]
        fn test_inverted_range_is_rejected() {
            let err = expand_range("2024-12-20", "2024-12-15").unwrap_err();
            assert!(matches!(err, DateError::Inverted { .. }));
        }

        #[test]
        fn test_bad_inputs() {
            assert!(expand_start("2024-13").is_err());
            assert!(expand_end("abcd").is_err());
            assert!(parse_date("2024/12/15").is_err());
        }

        #[test]
        fn test_period_ends() {
            let date = NaiveDate::from_ymd_opt(2023, 2, 14).unwrap();
            assert_eq!(
                month_end(&date),
                NaiveDate::from_ymd_opt(2023, 2, 28)
            );
            assert_eq!(year_end(&date), NaiveDate::from_ymd_opt(2023, 12, 31));
            assert_eq!(
                last_day_of_month(2023, 12),
                NaiveDate::from_ymd_opt(2023, 12, 31)
            );
        }

        #[test]
        fn test_format_and_parse() {
            let date = NaiveDate::from_ymd_opt(2023, 6, 15).unwrap();
            let formatted = format_date(&date);
            assert_eq!(formatted, "2023-06-15");
            let parsed = parse_date(&formatted).unwrap();
            assert_eq!(parsed, date);
        }
    }
}

/// Error types
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum DateError {
        #[error("Date error: cannot parse {0:?} (expected YYYY, YYYY-MM or YYYY-MM-DD)")]
        Parse(String),

        #[error("Date error: start {start} is after end {end}")]
        Inverted { start: String, end: String },
    }
}

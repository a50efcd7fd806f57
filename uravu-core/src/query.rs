//! Request input and its normalized form.

use crate::date_range::DateRange;
use crate::error::QueryError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uravu_utils::dates::{expand_range, format_date};

/// Aggregation interval requested by the caller.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    #[default]
    Daily,
    Monthly,
    Yearly,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Daily => "daily",
            Interval::Monthly => "monthly",
            Interval::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Interval::Daily),
            "monthly" => Ok(Interval::Monthly),
            "yearly" => Ok(Interval::Yearly),
            other => Err(QueryError::UnknownInterval(other.to_string())),
        }
    }
}

/// Raw request as received from the caller. Dates may be `YYYY`,
/// `YYYY-MM` or `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq)]
pub struct CityQuery {
    pub city: String,
    pub start_date: String,
    pub end_date: String,
    pub interval: Interval,
}

impl Default for CityQuery {
    fn default() -> Self {
        Self {
            city: "Bangalore".to_string(),
            start_date: "2024-12-15".to_string(),
            end_date: "2024-12-20".to_string(),
            interval: Interval::Daily,
        }
    }
}

impl CityQuery {
    pub fn new(city: &str, start_date: &str, end_date: &str, interval: Interval) -> Self {
        Self {
            city: city.to_string(),
            start_date: start_date.to_string(),
            end_date: end_date.to_string(),
            interval,
        }
    }

    /// Expand partial dates to full calendar dates and validate the city.
    pub fn normalize(&self) -> Result<NormalizedQuery, QueryError> {
        let city = self.city.trim();
        if city.is_empty() {
            return Err(QueryError::EmptyCity);
        }
        let (start_date, end_date) = expand_range(&self.start_date, &self.end_date)?;
        Ok(NormalizedQuery {
            city: city.to_string(),
            interval: self.interval,
            start_date,
            end_date,
        })
    }
}

/// A query whose dates are full calendar dates with `start_date <= end_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedQuery {
    pub city: String,
    pub interval: Interval,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl NormalizedQuery {
    pub fn days(&self) -> DateRange {
        DateRange(self.start_date, self.end_date)
    }

    pub fn num_days(&self) -> usize {
        self.days().num_days()
    }

    /// Deterministic cache key for this request.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint(format!(
            "flux:{}:{}:{}:{}",
            self.city.to_lowercase(),
            self.interval,
            format_date(&self.start_date),
            format_date(&self.end_date)
        ))
    }
}

/// Cache key derived from a [`NormalizedQuery`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_parses_case_insensitively() {
        assert_eq!("Monthly".parse::<Interval>().unwrap(), Interval::Monthly);
        assert_eq!(" yearly ".parse::<Interval>().unwrap(), Interval::Yearly);
        assert!(matches!(
            "weekly".parse::<Interval>(),
            Err(QueryError::UnknownInterval(_))
        ));
    }

    #[test]
    fn normalize_expands_monthly_range() {
        let query = CityQuery::new("Chennai", "2024-01", "2024-03", Interval::Monthly);
        let normalized = query.normalize().unwrap();
        assert_eq!(normalized.start_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(normalized.end_date, NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
        assert_eq!(normalized.num_days(), 91);
    }

    #[test]
    fn normalize_rejects_blank_city() {
        let query = CityQuery::new("   ", "2024", "2024", Interval::Yearly);
        assert_eq!(query.normalize(), Err(QueryError::EmptyCity));
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let a = CityQuery::new("Bangalore", "2024-12", "2024-12", Interval::Monthly)
            .normalize()
            .unwrap();
        let b = CityQuery::new(" bangalore", "2024-12-01", "2024-12-31", Interval::Monthly)
            .normalize()
            .unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(
            a.fingerprint().as_str(),
            "flux:bangalore:monthly:2024-12-01:2024-12-31"
        );
    }

    #[test]
    fn fingerprint_separates_intervals() {
        let daily = CityQuery::new("Pune", "2024-12-01", "2024-12-31", Interval::Daily)
            .normalize()
            .unwrap();
        let monthly = CityQuery::new("Pune", "2024-12-01", "2024-12-31", Interval::Monthly)
            .normalize()
            .unwrap();
        assert_ne!(daily.fingerprint(), monthly.fingerprint());
    }
}

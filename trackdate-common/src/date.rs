//! Partial release-date parsing
//!
//! Streaming services and discography catalogs both report dates as
//! `YYYY`, `YYYY-MM`, or `YYYY-MM-DD`. Components that are absent or fail
//! validation come back as the `"N/A"` sentinel.

use crate::model::NOT_AVAILABLE;
use chrono::{Datelike, Utc};

/// Earliest release year the pipeline accepts
pub const MIN_YEAR: i32 = 1900;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// The current calendar year (upper bound for year validation)
pub fn current_year() -> i32 {
    Utc::now().year()
}

/// True when `year` parses as a four-digit year within `[1900, current]`
pub fn is_valid_year(year: &str, current: i32) -> bool {
    year.len() == 4
        && year
            .parse::<i32>()
            .map(|y| (MIN_YEAR..=current).contains(&y))
            .unwrap_or(false)
}

/// English month name for a 1-based month number
pub fn month_name(month: u32) -> Option<&'static str> {
    MONTH_NAMES.get(month.checked_sub(1)? as usize).copied()
}

/// A partial date split into display-ready components
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDate {
    /// Four-digit year string, or `"N/A"`
    pub year: String,
    /// English month name, or `"N/A"`
    pub month: String,
    /// Numeric day string, or `"N/A"`
    pub day: String,
}

impl ReleaseDate {
    /// Parse a `YYYY[-MM[-DD]]` string.
    ///
    /// A year outside `[1900, current]` invalidates the whole date: a month
    /// or day without a trustworthy year is not worth displaying.
    pub fn parse(raw: &str, current: i32) -> Self {
        let mut parts = raw.trim().splitn(3, '-');

        let year = match parts.next() {
            Some(y) if is_valid_year(y.trim(), current) => y.trim().to_string(),
            _ => return Self::not_available(),
        };

        let month = parts
            .next()
            .and_then(|m| m.trim().parse::<u32>().ok())
            .and_then(month_name)
            .unwrap_or(NOT_AVAILABLE)
            .to_string();

        let day = parts
            .next()
            .and_then(|d| d.trim().parse::<u32>().ok())
            .filter(|d| (1..=31).contains(d))
            .map(|d| d.to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());

        Self { year, month, day }
    }

    /// All three components unknown
    pub fn not_available() -> Self {
        Self {
            year: NOT_AVAILABLE.to_string(),
            month: NOT_AVAILABLE.to_string(),
            day: NOT_AVAILABLE.to_string(),
        }
    }
}

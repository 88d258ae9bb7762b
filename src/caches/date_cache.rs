//! Memoised date parsing.
//!
//! Schedule exports repeat the same handful of timestamps across thousands
//! of rows, in whichever locale pattern the exporting machine used. Each
//! distinct input string is parsed once.

use crate::constants::{
    CANONICAL_DATETIME_FORMAT, INPUT_DATE_FORMATS, INPUT_DATETIME_FORMATS, MIN_VALID_YEAR,
};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use dashmap::DashMap;
use once_cell::sync::Lazy;

static DATES: Lazy<DashMap<Box<str>, Option<NaiveDateTime>>> = Lazy::new(DashMap::new);

/// Parse a date string into an instant; `None` for blank, unrecognised or
/// sentinel (year <= 1900) values
pub fn parse_date(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(cached) = DATES.get(trimmed) {
        return *cached;
    }
    let parsed = parse_uncached(trimmed);
    DATES.insert(Box::from(trimmed), parsed);
    parsed
}

/// Reformat a date string into `yyyy-MM-dd HH:mm:ss`; unset dates become ""
pub fn format_date(value: &str) -> String {
    parse_date(value)
        .map(|dt| dt.format(CANONICAL_DATETIME_FORMAT).to_string())
        .unwrap_or_default()
}

fn parse_uncached(value: &str) -> Option<NaiveDateTime> {
    // A pattern can succeed with the wrong year width ("24" read by %Y), so
    // keep trying until one yields a usable year.
    INPUT_DATETIME_FORMATS
        .iter()
        .filter_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .chain(
            INPUT_DATE_FORMATS
                .iter()
                .filter_map(|format| NaiveDate::parse_from_str(value, format).ok())
                .filter_map(|date| date.and_hms_opt(0, 0, 0)),
        )
        .find(|dt| dt.year() > MIN_VALID_YEAR)
}

/// Number of memoised inputs
pub fn len() -> usize {
    DATES.len()
}

/// Forget every memoised input
pub fn clear() {
    DATES.clear();
}

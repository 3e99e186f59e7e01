//! Date helpers for the census form.
//!
//! Form date inputs carry `YYYY-MM-DD` strings. The backend sometimes sends
//! full timestamps for date columns instead, so everything coming back from it
//! goes through [`normalize_date_input`] before it reaches a section.

use chrono::{DateTime, Datelike, Local, NaiveDate};
use std::fmt;

/// Today's date in the local timezone
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parse a form or backend date.
///
/// Accepts `YYYY-MM-DD`, an RFC 3339 timestamp (its UTC calendar date is
/// used), or a `YYYY-MM-DD` prefix followed by a time part.
pub fn parse_date_string(date_str: &str) -> Option<NaiveDate> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(timestamp.naive_utc().date());
    }

    let date_part = trimmed.get(..10)?;
    let rest = &trimmed[10..];
    if !(rest.is_empty() || rest.starts_with('T') || rest.starts_with(' ')) {
        return None;
    }
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Normalize a date value for a form date field.
///
/// Parseable values become `YYYY-MM-DD`; anything else is kept as typed so the
/// user can see and correct it.
pub fn normalize_date_input(raw: &str) -> String {
    match parse_date_string(raw) {
        Some(date) => format_iso_date(date),
        None => raw.trim().to_string(),
    }
}

pub fn format_iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Whole calendar years from `dob` to `today`.
///
/// The year difference is reduced by one while this year's birthday (by
/// month and day) has not been reached yet. Negative when `dob` is after
/// `today`.
pub fn whole_years_between(dob: NaiveDate, today: NaiveDate) -> i32 {
    let mut years = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        years -= 1;
    }
    years
}

/// Value of the read-only `Age` field of a child section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedAge {
    Years(u32),
    /// Date of birth missing or not a date
    InvalidDate,
    /// Date of birth after today
    FutureDate,
}

impl DerivedAge {
    pub fn years(&self) -> Option<u32> {
        match self {
            DerivedAge::Years(years) => Some(*years),
            _ => None,
        }
    }
}

impl fmt::Display for DerivedAge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DerivedAge::Years(years) => write!(f, "{}", years),
            DerivedAge::InvalidDate => write!(f, "Invalid Date"),
            DerivedAge::FutureDate => write!(f, "Invalid DOB"),
        }
    }
}

/// Compute a child's age from the raw `Date_of_Birth` input
pub fn derive_age(dob_input: &str, today: NaiveDate) -> DerivedAge {
    let Some(dob) = parse_date_string(dob_input) else {
        return DerivedAge::InvalidDate;
    };
    match u32::try_from(whole_years_between(dob, today)) {
        Ok(years) => DerivedAge::Years(years),
        Err(_) => DerivedAge::FutureDate,
    }
}

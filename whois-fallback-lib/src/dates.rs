//! Registry date parsing.
//!
//! Registries print dates in whatever format their software was written
//! with. Known layouts are tried in turn; anything unrecognized is `None`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Layouts carrying an explicit UTC offset.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S %z",
];

/// Layouts without an offset; interpreted as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y.%m.%d %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y%m%d",
    "%d-%b-%Y",
    "%d-%B-%Y",
    "%Y.%m.%d",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%d/%m/%Y",
    "%b %d %Y",
    "%d %b %Y",
];

/// Parse a registry date string into a UTC timestamp.
///
/// Returns `None` for blank or unrecognized input.
pub fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let cleaned = input
        .trim()
        .trim_end_matches(" (UTC)")
        .trim_end_matches(" UTC")
        .trim_end_matches(" GMT")
        .trim();

    if cleaned.is_empty() {
        return None;
    }

    parse_exact(cleaned).or_else(|| {
        // Values like "20240314 #1234567" or "2024-03-14 (renewal pending)"
        let first = cleaned.split_whitespace().next()?;
        if first.len() < cleaned.len() {
            parse_exact(first)
        } else {
            None
        }
    })
}

fn parse_exact(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d.and_hms_opt(0, 0, 0)?.and_utc());
        }
    }

    None
}

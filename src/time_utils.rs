// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and month ranges.

use chrono::{DateTime, Datelike, Months, NaiveDate, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Current time as RFC3339.
pub fn now_rfc3339() -> String {
    format_utc_rfc3339(Utc::now())
}

/// One calendar month as inclusive `YYYY-MM-DD` bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthRange {
    /// `YYYY-MM`
    pub key: String,
    pub start: String,
    pub end: String,
}

/// Parse `YYYY-MM` into the first day of that month.
pub fn parse_month(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", value.trim()), "%Y-%m-%d").ok()
}

/// Parse `YYYY-MM-DD`.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Every month from `start`'s month through `end`'s month, inclusive.
pub fn months_between(start: NaiveDate, end: NaiveDate) -> Vec<MonthRange> {
    let mut out = Vec::new();
    let Some(mut cursor) = start.with_day(1) else {
        return out;
    };

    while cursor <= end {
        let Some(next) = cursor.checked_add_months(Months::new(1)) else {
            break;
        };
        let last = next.pred_opt().unwrap_or(cursor);
        out.push(MonthRange {
            key: cursor.format("%Y-%m").to_string(),
            start: cursor.format("%Y-%m-%d").to_string(),
            end: last.format("%Y-%m-%d").to_string(),
        });
        cursor = next;
    }
    out
}

/// Inclusive upper bound for comparing a date against timestamps.
pub fn end_of_day(date: NaiveDate) -> String {
    format!("{}T23:59:59.999Z", date.format("%Y-%m-%d"))
}

/// Extract "YYYY-MM" from an ISO 8601 date string.
pub fn month_key(date: &str) -> Option<String> {
    // ISO 8601: "2024-01-15T10:30:00Z" -> "2024-01"
    let key = date.get(..7)?;
    let bytes = key.as_bytes();
    let well_formed = bytes[4] == b'-'
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[5..].iter().all(u8::is_ascii_digit);
    well_formed.then(|| key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn months_between_spans_year_boundary() {
        let months = months_between(
            parse_month("2023-11").unwrap(),
            parse_month("2024-02").unwrap(),
        );
        let keys: Vec<&str> = months.iter().map(|m| m.key.as_str()).collect();
        assert_eq!(keys, ["2023-11", "2023-12", "2024-01", "2024-02"]);
        assert_eq!(months[3].start, "2024-02-01");
        assert_eq!(months[3].end, "2024-02-29");
    }

    #[test]
    fn months_between_empty_when_reversed() {
        assert!(months_between(
            parse_month("2024-05").unwrap(),
            parse_month("2024-04").unwrap()
        )
        .is_empty());
    }

    #[test]
    fn month_key_requires_iso_prefix() {
        assert_eq!(month_key("2024-01-15T10:30:00Z").as_deref(), Some("2024-01"));
        assert_eq!(month_key("2024-01"), Some("2024-01".to_string()));
        assert_eq!(month_key("Jan 2024"), None);
        assert_eq!(month_key("2024"), None);
    }

    #[test]
    fn parse_helpers() {
        assert!(parse_month("2024-13").is_none());
        assert!(parse_date("2024-02-30").is_none());
        assert_eq!(
            end_of_day(parse_date("2024-01-31").unwrap()),
            "2024-01-31T23:59:59.999Z"
        );
    }
}

//! Invoice date parsing.
//!
//! Danish invoices print dates as "9. januar 2026", "09.01.2026", or ISO.
//! Formats are tried in a fixed order; an unrecognized string yields `None`
//! with a warning, never an error.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

static DANISH_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d{1,2})\.?\s+([\pL]+)\s+(\d{4})").expect("valid regex")
});

fn danish_month(name: &str) -> Option<u32> {
    match name.to_lowercase().as_str() {
        "januar" => Some(1),
        "februar" => Some(2),
        "marts" => Some(3),
        "april" => Some(4),
        "maj" => Some(5),
        "juni" => Some(6),
        "juli" => Some(7),
        "august" => Some(8),
        "september" => Some(9),
        "oktober" => Some(10),
        "november" => Some(11),
        "december" => Some(12),
        _ => None,
    }
}

/// Parse an invoice date in any of the accepted formats.
#[must_use]
pub fn parse_invoice_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    // "9. januar 2026" / "9 januar 2026"
    if let Some(caps) = DANISH_DATE.captures(trimmed) {
        let day: u32 = caps[1].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        if let Some(month) = danish_month(&caps[2]) {
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                return Some(date);
            }
        }
    }

    // ISO, including full timestamps with a Z suffix
    if let Ok(date) = trimmed.parse::<NaiveDate>() {
        return Some(date);
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(&trimmed.replace('Z', "+00:00")) {
        return Some(dt.date_naive());
    }

    for fmt in ["%d.%m.%Y", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(date);
        }
    }

    warn!(value = %raw, "Could not parse invoice date");
    None
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[rstest]
    #[case("9. januar 2026", d(2026, 1, 9))]
    #[case("9 januar 2026", d(2026, 1, 9))]
    #[case("24. December 2025", d(2025, 12, 24))]
    #[case("2026-01-09", d(2026, 1, 9))]
    #[case("2026-01-09T10:30:00Z", d(2026, 1, 9))]
    #[case("09.01.2026", d(2026, 1, 9))]
    #[case("09/01/2026", d(2026, 1, 9))]
    #[case("09-01-2026", d(2026, 1, 9))]
    #[case("2026/01/09", d(2026, 1, 9))]
    fn test_accepted_formats(#[case] input: &str, #[case] expected: NaiveDate) {
        assert_eq!(parse_invoice_date(input), Some(expected));
    }

    #[rstest]
    #[case("")]
    #[case("not a date")]
    #[case("32. januar 2026")]
    #[case("9. frimaire 2026")]
    fn test_rejected_formats(#[case] input: &str) {
        assert_eq!(parse_invoice_date(input), None);
    }
}

//! Value coercion into canonical text forms
//!
//! Samples carry every cell as text next to its native column type. When two
//! samples disagree on a column's type, cells are coerced into the canonical
//! text form of the reference's harmonized type so equal values compare
//! equal regardless of how each platform rendered them.

use crate::harmonize::{DATE, DECIMAL, FLOAT, INT, STRING, TIMESTAMP};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const TIMESTAMP_INPUTS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];
const TIMESTAMP_TZ_INPUTS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];

/// Coerce a rendered value into the canonical form of a harmonized type.
///
/// Returns `None` when the value cannot be represented in that type, or
/// when the type has no canonical form (complex and unknown types).
/// Surrounding whitespace is ignored by the numeric and temporal parsers
/// only; string values are kept verbatim.
pub fn coerce(value: &str, harmonized_type: &str) -> Option<String> {
    if harmonized_type == STRING {
        return Some(value.to_string());
    }

    let value = value.trim();
    match harmonized_type {
        INT => coerce_int(value),
        FLOAT => value
            .parse::<f64>()
            .ok()
            .filter(|f| !f.is_nan())
            .map(|f| f.to_string()),
        DECIMAL => coerce_decimal(value),
        DATE => parse_timestamp(value)
            .filter(|ts| ts.num_seconds_from_midnight() == 0 && ts.nanosecond() == 0)
            .map(|ts| ts.date().format(DATE_FORMAT).to_string()),
        TIMESTAMP => parse_timestamp(value).map(|ts| ts.format(TIMESTAMP_FORMAT).to_string()),
        _ => None,
    }
}

fn coerce_int(value: &str) -> Option<String> {
    if let Ok(n) = value.parse::<i128>() {
        return Some(n.to_string());
    }
    // Integral decimals and floats ("42.00", "4.2e1") are still integers.
    let canonical = coerce_decimal(value)?;
    if canonical.contains('.') {
        None
    } else {
        Some(canonical)
    }
}

/// Canonical decimal text: no leading zeros, no trailing fractional zeros,
/// no negative zero
fn coerce_decimal(value: &str) -> Option<String> {
    let (negative, unsigned) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };

    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, f),
        None => (unsigned, ""),
    };

    let plain = !unsigned.is_empty()
        && (!int_part.is_empty() || !frac_part.is_empty())
        && int_part.bytes().all(|b| b.is_ascii_digit())
        && frac_part.bytes().all(|b| b.is_ascii_digit());
    if !plain {
        // Scientific notation and the like go through f64.
        let f = value.parse::<f64>().ok().filter(|f| f.is_finite())?;
        return coerce_decimal(&format!("{f}"));
    }

    let int_digits = int_part.trim_start_matches('0');
    let frac_digits = frac_part.trim_end_matches('0');
    let int_digits = if int_digits.is_empty() { "0" } else { int_digits };

    let is_zero = int_digits == "0" && frac_digits.is_empty();
    let sign = if negative && !is_zero { "-" } else { "" };

    if frac_digits.is_empty() {
        Some(format!("{sign}{int_digits}"))
    } else {
        Some(format!("{sign}{int_digits}.{frac_digits}"))
    }
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if let Ok(date) = NaiveDate::parse_from_str(value, DATE_FORMAT) {
        return date.and_hms_opt(0, 0, 0);
    }
    for format in TIMESTAMP_INPUTS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Some(ts);
        }
    }
    for format in TIMESTAMP_TZ_INPUTS {
        if let Ok(ts) = DateTime::parse_from_str(value, format) {
            return Some(ts.naive_utc());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_int() {
        assert_eq!(coerce("42", INT).as_deref(), Some("42"));
        assert_eq!(coerce(" -7 ", INT).as_deref(), Some("-7"));
        assert_eq!(coerce("42.00", INT).as_deref(), Some("42"));
        assert_eq!(coerce("4.2e1", INT).as_deref(), Some("42"));
        assert_eq!(coerce("42.5", INT), None);
        assert_eq!(coerce("abc", INT), None);
    }

    #[test]
    fn test_coerce_decimal() {
        assert_eq!(coerce("10.50", DECIMAL).as_deref(), Some("10.5"));
        assert_eq!(coerce("010.000", DECIMAL).as_deref(), Some("10"));
        assert_eq!(coerce("-0.00", DECIMAL).as_deref(), Some("0"));
        assert_eq!(coerce(".5", DECIMAL).as_deref(), Some("0.5"));
        assert_eq!(coerce("1e3", DECIMAL).as_deref(), Some("1000"));
        assert_eq!(
            coerce("12345678901234567890.123", DECIMAL).as_deref(),
            Some("12345678901234567890.123")
        );
        assert_eq!(coerce("ten", DECIMAL), None);
        assert_eq!(coerce("-", DECIMAL), None);
    }

    #[test]
    fn test_coerce_float() {
        assert_eq!(coerce("1.50", FLOAT).as_deref(), Some("1.5"));
        assert_eq!(coerce("2", FLOAT).as_deref(), Some("2"));
        assert_eq!(coerce("x", FLOAT), None);
    }

    #[test]
    fn test_coerce_date() {
        assert_eq!(coerce("2024-03-01", DATE).as_deref(), Some("2024-03-01"));
        assert_eq!(
            coerce("2024-03-01 00:00:00", DATE).as_deref(),
            Some("2024-03-01")
        );
        assert_eq!(coerce("2024-03-01 10:30:00", DATE), None);
        assert_eq!(coerce("March 1st", DATE), None);
    }

    #[test]
    fn test_coerce_timestamp() {
        assert_eq!(
            coerce("2024-03-01", TIMESTAMP).as_deref(),
            Some("2024-03-01 00:00:00")
        );
        assert_eq!(
            coerce("2024-03-01T10:30:00.250", TIMESTAMP).as_deref(),
            Some("2024-03-01 10:30:00.250")
        );
        assert_eq!(
            coerce("2024-03-01 12:00:00+02", TIMESTAMP).as_deref(),
            Some("2024-03-01 10:00:00")
        );
    }

    #[test]
    fn test_coerce_string_and_unknown() {
        assert_eq!(coerce("anything", STRING).as_deref(), Some("anything"));
        assert_eq!(coerce("  padded ", STRING).as_deref(), Some("  padded "));
        assert_eq!(coerce(" 42 ", INT).as_deref(), Some("42"));
        assert_eq!(coerce("{'x': 1}", "struct(x integer)"), None);
        assert_eq!(coerce("true", "boolean"), None);
    }
}

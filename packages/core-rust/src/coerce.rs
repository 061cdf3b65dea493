//! Value coercion for loosely-typed operator input.
//!
//! Every conversion from a raw command-line string into a [`Value`] goes
//! through [`coerce_value`]. Temporal detection is shape-based: a value that
//! starts with four digits and contains a hyphen is treated as a date. A
//! hyphenated identifier such as `2024-acme` is therefore tried as a date
//! first; it only stays a string because it fails to parse. Quote the value
//! (`name=="2024-01"`) to force a string.

use std::sync::LazyLock;

use chrono::{DateTime, Days, Months, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use regex::Regex;

use crate::error::ParseError;
use crate::types::Value;

/// `YYYY`, `YYYY-MM` or `YYYY-MM-DD`.
static PARTIAL_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})(?:-(\d{1,2})(?:-(\d{1,2}))?)?$").expect("static regex")
});

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// How the caller wants a raw value interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueHint {
    /// Sniff the type from the value's shape.
    Infer,
    /// The caller knows the value is temporal (`--from`, `--to`).
    /// Anything that does not parse as a timestamp is an error.
    Temporal,
}

/// Which end of a partial date a timestamp should resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// First instant of the period (`2025-01` -> `2025-01-01T00:00:00`).
    Start,
    /// Last millisecond of the period (`2025-01` -> `2025-01-31T23:59:59.999`).
    End,
}

/// Converts a raw operator-supplied string into a typed [`Value`].
///
/// Order: quoted literal, temporal (explicit or sniffed), integer, float,
/// boolean literal, string.
///
/// # Errors
///
/// Returns [`ParseError::InvalidTimestamp`] when `hint` is
/// [`ValueHint::Temporal`] and the value is not a recognised date shape.
pub fn coerce_value(raw: &str, hint: ValueHint) -> Result<Value, ParseError> {
    let raw = raw.trim();

    if hint == ValueHint::Temporal {
        return parse_timestamp(raw, Bound::Start).map(Value::Timestamp);
    }

    if let Some(inner) = strip_quotes(raw) {
        return Ok(Value::String(inner.to_string()));
    }

    if looks_temporal(raw) {
        if let Ok(ts) = parse_timestamp(raw, Bound::Start) {
            return Ok(Value::Timestamp(ts));
        }
    }

    if let Ok(i) = raw.parse::<i64>() {
        return Ok(Value::Int(i));
    }
    if let Some(x) = parse_finite_float(raw) {
        return Ok(Value::Float(x));
    }

    match raw {
        "true" => Ok(Value::Bool(true)),
        "false" => Ok(Value::Bool(false)),
        _ => Ok(Value::String(raw.to_string())),
    }
}

/// Shape test for date-like strings: four leading digits and a hyphen.
#[must_use]
pub fn looks_temporal(raw: &str) -> bool {
    raw.len() >= 5 && raw.bytes().take(4).all(|b| b.is_ascii_digit()) && raw.contains('-')
}

/// Parses a full or partial ISO-8601 date/time into a UTC instant.
///
/// Partial dates resolve to the start or end of the period per `bound`.
/// Timestamps without an offset are taken as UTC.
///
/// # Errors
///
/// Returns [`ParseError::InvalidTimestamp`] for anything else.
pub fn parse_timestamp(raw: &str, bound: Bound) -> Result<DateTime<Utc>, ParseError> {
    let raw = raw.trim();
    let invalid = || ParseError::InvalidTimestamp {
        input: raw.to_string(),
    };

    if let Some(caps) = PARTIAL_DATE.captures(raw) {
        let year: i32 = caps[1].parse().map_err(|_| invalid())?;
        let month = caps
            .get(2)
            .map(|m| m.as_str().parse::<u32>())
            .transpose()
            .map_err(|_| invalid())?;
        let day = caps
            .get(3)
            .map(|m| m.as_str().parse::<u32>())
            .transpose()
            .map_err(|_| invalid())?;
        return period_bound(year, month, day, bound).ok_or_else(invalid);
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(invalid)
}

fn period_bound(
    year: i32,
    month: Option<u32>,
    day: Option<u32>,
    bound: Bound,
) -> Option<DateTime<Utc>> {
    let start = NaiveDate::from_ymd_opt(year, month.unwrap_or(1), day.unwrap_or(1))?;
    let start_instant = start.and_hms_opt(0, 0, 0)?.and_utc();
    if bound == Bound::Start {
        return Some(start_instant);
    }

    let next = match (month, day) {
        (Some(_), Some(_)) => start.checked_add_days(Days::new(1))?,
        (Some(_), None) => start.checked_add_months(Months::new(1))?,
        _ => start.checked_add_months(Months::new(12))?,
    };
    let next_instant = next.and_hms_opt(0, 0, 0)?.and_utc();
    next_instant.checked_sub_signed(TimeDelta::milliseconds(1))
}

fn strip_quotes(raw: &str) -> Option<&str> {
    let bytes = raw.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return Some(&raw[1..raw.len() - 1]);
        }
    }
    None
}

/// `f64::from_str` also accepts `inf`, `NaN` and friends; those stay strings.
fn parse_finite_float(raw: &str) -> Option<f64> {
    if !raw.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<f64>().ok().filter(|x| x.is_finite())
}

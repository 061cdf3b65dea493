use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::coerce::{parse_timestamp, Bound};
use crate::error::ParseError;

/// Inclusive timestamp range every query is anchored on.
///
/// Invariant: `from <= to`. Construction rejects inverted ranges instead of
/// swapping them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

impl DateRange {
    /// # Errors
    ///
    /// Returns [`ParseError::InvertedRange`] when `from > to`.
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, ParseError> {
        if from > to {
            return Err(ParseError::InvertedRange {
                from: render(from),
                to: render(to),
            });
        }
        Ok(Self { from, to })
    }

    /// Parses `--from` / `--to` input. A bare date (or month, or year) in
    /// `to` is widened to the last millisecond of that period.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] when either bound is not a date or the range
    /// is inverted.
    pub fn parse(from: &str, to: &str) -> Result<Self, ParseError> {
        let from = parse_timestamp(from, Bound::Start)?;
        let to = parse_timestamp(to, Bound::End)?;
        Self::new(from, to)
    }

    /// Lower bound (`--from`), inclusive.
    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.from
    }

    /// Upper bound (`--to`), inclusive.
    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.to
    }

    /// Inclusive on both ends.
    #[must_use]
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.from <= ts && ts <= self.to
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", render(self.from), render(self.to))
    }
}

fn render(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

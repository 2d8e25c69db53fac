//! Parsing of raw event start values into concrete times.

use chrono::{DateTime, FixedOffset, NaiveDate};
use thiserror::Error;

/// Failures turning raw start values into concrete times. Both variants are
/// per-event and recoverable: the engine logs them and skips the event for
/// the current pass only.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventTimeError {
    #[error("unparseable start timestamp: {0:?}")]
    MalformedTimestamp(String),
    #[error("unparseable all-day date: {0:?}")]
    MalformedDate(String),
}

/// Parse a timed start. RFC 3339 first, then the compact-offset variant
/// (`2024-05-14T09:00:00+0530`) some exporters produce.
pub fn parse_start_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, EventTimeError> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
        .map_err(|_| EventTimeError::MalformedTimestamp(raw.to_string()))
}

/// Parse an all-day start date (`%Y-%m-%d`).
pub fn parse_all_day_date(raw: &str) -> Result<NaiveDate, EventTimeError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| EventTimeError::MalformedDate(raw.to_string()))
}

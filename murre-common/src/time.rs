//! Timestamp utilities
//!
//! Recordings carry offset-aware timestamps end to end; the offset a
//! sensor stamped into a filename is part of the fact and is preserved
//! through parsing, serialization, and the archival rename layout.

use crate::{Error, Result};
use chrono::{DateTime, FixedOffset, SecondsFormat};

/// Parse an RFC 3339 timestamp, preserving its UTC offset
pub fn parse_rfc3339(s: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s)
        .map_err(|e| Error::InvalidInput(format!("Invalid timestamp '{}': {}", s, e)))
}

/// Format a timestamp as RFC 3339 with second precision
pub fn format_rfc3339(dt: &DateTime<FixedOffset>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Format a timestamp in the compact archival layout used for
/// recommended file names: `YYYYMMDDTHHMMSS+HHMM` (`Z` for UTC).
pub fn archival_timestamp(dt: &DateTime<FixedOffset>) -> String {
    if dt.offset().local_minus_utc() == 0 {
        dt.format("%Y%m%dT%H%M%SZ").to_string()
    } else {
        dt.format("%Y%m%dT%H%M%S%z").to_string()
    }
}

/// Signed difference `b - a` in seconds
pub fn seconds_between(a: &DateTime<FixedOffset>, b: &DateTime<FixedOffset>) -> f64 {
    let delta = b.signed_duration_since(*a);
    delta.num_milliseconds() as f64 / 1000.0
}

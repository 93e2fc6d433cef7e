//! Filename parsing seam
//!
//! **[MX-FN-010]** Field recorders encode capture metadata in file names.
//! The pipeline consumes this through the [`FilenameParser`] trait so the
//! grammar can evolve (or be replaced by sensor-specific parsers) without
//! touching the pipeline. The built-in [`ConventionParser`] recognizes the
//! common stem layouts:
//!
//! - `20240204T213000+1000.wav` (compact timestamp with UTC offset)
//! - `PILLIGA_20121204_234600.wav` (site prefix, offset-less timestamp)
//! - `20240204T213000Z_-27.455+153.039.flac` (trailing GPS token)
//!
//! A timestamp without a UTC offset is *ambiguous*, not an error: the
//! parser returns no date and the reconciliation pass records the gap.

use crate::models::Location;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use murre_common::{Error, Result};
use regex::Regex;
use std::path::Path;

/// Facts extracted from one file name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFilename {
    /// Extension including the leading period
    pub extension: Option<String>,
    /// File name without the extension
    pub stem: Option<String>,
    /// Start date, only when unambiguously resolvable
    pub start_date: Option<DateTime<FixedOffset>>,
    /// GPS position embedded in the name
    pub location: Option<Location>,
}

/// A filename grammar. Must not fail for merely ambiguous input.
pub trait FilenameParser: Send + Sync {
    fn parse(&self, file_name: &str) -> ParsedFilename;
}

/// Parser for the conventional field-recorder stem layouts
pub struct ConventionParser {
    datetime: Regex,
    location: Regex,
}

impl ConventionParser {
    pub fn new() -> Result<Self> {
        // 8-digit date and 6-digit time, separated by `T` or `_`, with an
        // optional `Z`/`+HHMM` offset. The leading alternation keeps the
        // date from matching inside a longer digit run.
        let datetime = Regex::new(
            r"(?:^|[^0-9])(?P<date>\d{8})[T_](?P<time>\d{6})(?P<offset>Z|[+-]\d{4})?",
        )
        .map_err(|e| Error::Internal(format!("datetime pattern: {}", e)))?;

        // Signed latitude and longitude glued together, e.g. `-27.455+153.039`
        let location = Regex::new(
            r"(?P<lat>[+-]\d{1,2}(?:\.\d+)?)(?P<lon>[+-]\d{1,3}(?:\.\d+)?)(?:$|[^0-9.])",
        )
        .map_err(|e| Error::Internal(format!("location pattern: {}", e)))?;

        Ok(Self { datetime, location })
    }

    fn parse_date(&self, stem: &str) -> Option<DateTime<FixedOffset>> {
        let captures = self.datetime.captures(stem)?;

        let date = NaiveDate::parse_from_str(&captures["date"], "%Y%m%d").ok()?;
        let time = NaiveTime::parse_from_str(&captures["time"], "%H%M%S").ok()?;

        // Without an offset the instant cannot be pinned down; report the
        // date as unresolved rather than guessing a zone.
        let offset_text = captures.name("offset")?.as_str();
        let offset = if offset_text == "Z" {
            FixedOffset::east_opt(0)?
        } else {
            let sign = if offset_text.starts_with('-') { -1 } else { 1 };
            let hours: i32 = offset_text[1..3].parse().ok()?;
            let minutes: i32 = offset_text[3..5].parse().ok()?;
            FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))?
        };

        date.and_time(time).and_local_timezone(offset).single()
    }

    fn parse_location(&self, stem: &str) -> Option<Location> {
        let captures = self.location.captures(stem)?;
        let latitude: f64 = captures["lat"].parse().ok()?;
        let longitude: f64 = captures["lon"].parse().ok()?;

        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }

        Some(Location {
            latitude,
            longitude,
        })
    }
}

impl FilenameParser for ConventionParser {
    fn parse(&self, file_name: &str) -> ParsedFilename {
        let path = Path::new(file_name);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned());
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()));

        let (start_date, location) = match stem.as_deref() {
            Some(stem) => (self.parse_date(stem), self.parse_location(stem)),
            None => (None, None),
        };

        if start_date.is_none() {
            tracing::debug!(file_name, "No unambiguous start date in file name");
        }

        ParsedFilename {
            extension,
            stem,
            start_date,
            location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> ConventionParser {
        ConventionParser::new().unwrap()
    }

    #[test]
    fn test_compact_timestamp_with_offset() {
        let parsed = parser().parse("20240204T213000+1000.wav");
        let date = parsed.start_date.unwrap();
        assert_eq!(date.to_rfc3339(), "2024-02-04T21:30:00+10:00");
        assert_eq!(parsed.extension.as_deref(), Some(".wav"));
        assert_eq!(parsed.stem.as_deref(), Some("20240204T213000+1000"));
    }

    #[test]
    fn test_utc_timestamp() {
        let parsed = parser().parse("20240204T213000Z.flac");
        let date = parsed.start_date.unwrap();
        assert_eq!(date.offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_offsetless_timestamp_is_ambiguous() {
        // The instant cannot be resolved without a zone
        let parsed = parser().parse("PILLIGA_20121204_234600.wav");
        assert!(parsed.start_date.is_none());
        assert_eq!(parsed.stem.as_deref(), Some("PILLIGA_20121204_234600"));
    }

    #[test]
    fn test_prefixed_stem_with_offset() {
        let parsed = parser().parse("SM4_20160514_004302+0930.wav");
        let date = parsed.start_date.unwrap();
        assert_eq!(date.to_rfc3339(), "2016-05-14T00:43:02+09:30");
    }

    #[test]
    fn test_gps_token() {
        let parsed = parser().parse("20240204T213000Z_-27.455+153.039.flac");
        let location = parsed.location.unwrap();
        assert_eq!(location.latitude, -27.455);
        assert_eq!(location.longitude, 153.039);
    }

    #[test]
    fn test_out_of_range_gps_rejected() {
        let parsed = parser().parse("20240204T213000Z_-97.455+153.039.flac");
        assert!(parsed.location.is_none());
    }

    #[test]
    fn test_invalid_calendar_date_rejected() {
        // Month 13 does not exist; digit shape alone is not enough
        let parsed = parser().parse("20241304T213000Z.wav");
        assert!(parsed.start_date.is_none());
    }

    #[test]
    fn test_unrelated_name_yields_nothing() {
        let parsed = parser().parse("notes.txt");
        assert!(parsed.start_date.is_none());
        assert!(parsed.location.is_none());
        assert_eq!(parsed.extension.as_deref(), Some(".txt"));
    }
}

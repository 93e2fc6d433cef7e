//! The reconciled recording aggregate
//!
//! **[MX-REC-010]** One `Recording` per input file: identity, the
//! provenance-tagged facts adopted by reconciliation, structural context,
//! and the ordered diagnostics raised along the way.
//!
//! A `Recording` is exclusively owned by the pipeline invocation that
//! created it until handed to the output writer, which only ever takes a
//! shared reference.

use super::notice::Notice;
use super::provenance::Sourced;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A checksum as `(algorithm, value)`. Checksums from different origins
/// are kept in separate fields and are never merged; disagreement is a
/// diagnostic, not a correction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checksum {
    pub algorithm: String,
    pub value: String,
}

impl Checksum {
    pub fn new(algorithm: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            value: value.into(),
        }
    }
}

/// The sensor that produced a recording
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sensor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firmware: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
}

/// A position captured while the recording was running
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// An audio recording captured by a field sensor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Recording {
    /// Path to the file as read by the tool
    pub source_path: PathBuf,

    /// File extension, including the leading period
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,

    /// File name without the extension
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stem: Option<String>,

    /// Suggested archival-quality name, set only by the rename step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_name: Option<String>,

    /// Start date of the recording
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<Sourced<DateTime<FixedOffset>>>,

    /// Date at which the recording ended, as seen by the sensor.
    /// Useful for calculating clock drift during recording.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<Sourced<DateTime<FixedOffset>>>,

    /// Duration of the recording in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<Sourced<f64>>,

    /// Duration the sensor schedule said this recording should have
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_duration_seconds: Option<f64>,

    /// Checksum calculated by this tool
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculated_checksum: Option<Checksum>,

    /// Checksum produced by the sensor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedded_checksum: Option<Checksum>,

    /// Number of audio channels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<u8>,

    /// Sample rate in hertz
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate_hertz: Option<Sourced<u32>>,

    /// Bit rate in bits per second
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bits_per_second: Option<u32>,

    /// Bits used to quantize each sample
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bit_depth: Option<Sourced<u8>>,

    /// IANA media type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<Sourced<String>>,

    /// File length in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_length_bytes: Option<u64>,

    /// The sensor that produced this recording
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor: Option<Sensor>,

    /// Sensor position when the recording started
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,

    /// All positions captured while the recording ran, in observation order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub all_locations: Vec<Location>,

    /// Unique identifier of the storage card the recording was written to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_card_identifier: Option<Sourced<String>>,

    /// Facts not yet modeled by a dedicated field
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub other_fields: BTreeMap<String, String>,

    /// Errors found in this recording, in the order they were raised
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Notice>,

    /// Warnings found in this recording, in the order they were raised
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Notice>,

    /// Path the file was renamed to; absent when no rename occurred
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renamed_path: Option<PathBuf>,
}

impl Recording {
    /// Start a record for one input path, capturing stem and extension
    pub fn for_path(path: &Path) -> Self {
        Self {
            source_path: path.to_path_buf(),
            stem: path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned()),
            extension: path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy())),
            ..Self::default()
        }
    }

    /// Directory holding the recording, derived from the source path
    pub fn directory(&self) -> Option<&Path> {
        self.source_path.parent()
    }

    /// Original file name, derived from stem and extension
    pub fn name(&self) -> Option<String> {
        let stem = self.stem.as_deref()?;
        Some(format!("{}{}", stem, self.extension.as_deref().unwrap_or("")))
    }

    /// Append an error, preserving raise order
    pub fn push_error(&mut self, notice: Notice) {
        self.errors.push(notice);
    }

    /// Append a warning, preserving raise order
    pub fn push_warning(&mut self, notice: Notice) {
        self.warnings.push(notice);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::notice::codes;
    use crate::models::provenance::Provenance;

    #[test]
    fn test_for_path_captures_identity() {
        let rec = Recording::for_path(Path::new("/data/cards/20240204_213000.wav"));
        assert_eq!(rec.stem.as_deref(), Some("20240204_213000"));
        assert_eq!(rec.extension.as_deref(), Some(".wav"));
        assert_eq!(rec.name().as_deref(), Some("20240204_213000.wav"));
    }

    #[test]
    fn test_directory_is_derived_from_path() {
        let rec = Recording::for_path(Path::new("/data/cards/a.wav"));
        assert_eq!(rec.directory(), Some(Path::new("/data/cards")));

        // Changing the path changes the derived directory; there is no
        // cached field to fall out of sync.
        let mut rec = rec;
        rec.source_path = PathBuf::from("/other/b.wav");
        assert_eq!(rec.directory(), Some(Path::new("/other")));
    }

    #[test]
    fn test_diagnostic_order_is_preserved() {
        let mut rec = Recording::for_path(Path::new("a.wav"));
        rec.push_warning(Notice::new(codes::MISSING_DATE, "first", ""));
        rec.push_warning(Notice::new(codes::DURATION_DRIFT, "second", ""));
        assert_eq!(rec.warnings[0].code, codes::MISSING_DATE);
        assert_eq!(rec.warnings[1].code, codes::DURATION_DRIFT);
    }

    #[test]
    fn test_serde_round_trip() {
        let mut rec = Recording::for_path(Path::new("/data/20240204T213000+1000.wav"));
        rec.start_date = Some(Provenance::Filename.tag(
            chrono::DateTime::parse_from_rfc3339("2024-02-04T21:30:00+10:00").unwrap(),
        ));
        rec.duration_seconds = Some(Provenance::EmbeddedHeader.tag(3600.0));
        rec.channels = Some(2);
        rec.calculated_checksum = Some(Checksum::new("SHA-256", "abc123"));
        rec.other_fields
            .insert("gain".to_string(), "12dB".to_string());
        rec.all_locations.push(Location {
            latitude: -27.455,
            longitude: 153.039,
        });

        let json = serde_json::to_string(&rec).unwrap();
        let back: Recording = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);
    }
}

//! Reconciliation and validation pass
//!
//! **[MX-RECON-010]** Takes every observation gathered for one recording
//! and decides the canonical value per field. Disagreement becomes a
//! warning naming both sources and both values — never a silent
//! last-write-wins overwrite.
//!
//! Source priority: `EmbeddedHeader > SensorReported > Filename >
//! Calculated > Unknown`. Identifiers and categorical values must agree
//! exactly; timestamps and durations agree within the configured
//! tolerances.

use crate::models::{codes, Notice, Provenance, Recording, Sourced};
use chrono::{DateTime, FixedOffset};
use murre_common::config::Tolerances;
use murre_common::time;

/// All observations gathered for one recording before reconciliation.
/// The analogue of the per-field candidate lists the extractors fill in.
#[derive(Debug, Clone, Default)]
pub struct Observations {
    pub start_date: Vec<Sourced<DateTime<FixedOffset>>>,
    pub end_date: Vec<Sourced<DateTime<FixedOffset>>>,
    pub duration_seconds: Vec<Sourced<f64>>,
    pub sample_rate_hertz: Vec<Sourced<u32>>,
    pub bit_depth: Vec<Sourced<u8>>,
    pub media_type: Vec<Sourced<String>>,
    pub storage_card_identifier: Vec<Sourced<String>>,
}

/// Reconciliation pass over one recording's observations
pub struct Reconciler {
    tolerances: Tolerances,
}

impl Reconciler {
    pub fn new(tolerances: Tolerances) -> Self {
        Self { tolerances }
    }

    /// Run the pass: adopt canonical values, then cross-validate.
    /// Diagnostics are appended in the order the checks run.
    pub fn reconcile(&self, recording: &mut Recording, observations: Observations) {
        let tolerances = self.tolerances;
        let mut warnings = Vec::new();

        recording.start_date = adopt(
            "start date",
            codes::AMBIGUOUS_DATE,
            &observations.start_date,
            |a, b| time::seconds_between(a, b).abs() <= tolerances.date_tolerance_seconds,
            |d| d.to_rfc3339(),
            &mut warnings,
        );

        // The start date is expected to come from the filename; its
        // absence is a data-quality gap, not a processing failure.
        if recording.start_date.is_none() {
            warnings.push(Notice::new(
                codes::MISSING_DATE,
                "Missing start date",
                format!(
                    "No source produced a start date for {}",
                    recording.source_path.display()
                ),
            ));
        }

        recording.end_date = adopt(
            "end date",
            codes::AMBIGUOUS_DATE,
            &observations.end_date,
            |a, b| time::seconds_between(a, b).abs() <= tolerances.date_tolerance_seconds,
            |d| d.to_rfc3339(),
            &mut warnings,
        );

        recording.duration_seconds = adopt(
            "duration",
            codes::AMBIGUOUS_DURATION,
            &observations.duration_seconds,
            |a, b| (a - b).abs() <= tolerances.duration_tolerance_seconds,
            |d| format!("{:.3}s", d),
            &mut warnings,
        );

        recording.sample_rate_hertz = adopt(
            "sample rate",
            codes::AMBIGUOUS_SAMPLE_RATE,
            &observations.sample_rate_hertz,
            |a, b| a == b,
            |v| format!("{} Hz", v),
            &mut warnings,
        );

        recording.bit_depth = adopt(
            "bit depth",
            codes::AMBIGUOUS_BIT_DEPTH,
            &observations.bit_depth,
            |a, b| a == b,
            |v| format!("{} bit", v),
            &mut warnings,
        );

        recording.media_type = adopt(
            "media type",
            codes::AMBIGUOUS_MEDIA_TYPE,
            &observations.media_type,
            |a, b| a == b,
            Clone::clone,
            &mut warnings,
        );

        recording.storage_card_identifier = adopt(
            "storage card identifier",
            codes::AMBIGUOUS_CARD_ID,
            &observations.storage_card_identifier,
            |a, b| a == b,
            Clone::clone,
            &mut warnings,
        );

        // Cross-field: an observed end date must agree with start + duration
        if let (Some(start), Some(end), Some(duration)) = (
            &recording.start_date,
            &recording.end_date,
            &recording.duration_seconds,
        ) {
            let span = time::seconds_between(&start.value, &end.value);
            let drift = span - duration.value;
            if drift.abs() > tolerances.duration_tolerance_seconds {
                warnings.push(Notice::new(
                    codes::DURATION_DRIFT,
                    "Clock drift detected",
                    format!(
                        "End date ({}) is {:.3}s away from start + duration ({:.3}s)",
                        end.source, drift, duration.value
                    ),
                ));
            }
        }

        // Derive the end date when only start and duration were observed
        if recording.end_date.is_none() {
            if let (Some(start), Some(duration)) =
                (&recording.start_date, &recording.duration_seconds)
            {
                let millis = (duration.value * 1000.0).round() as i64;
                if let Some(end) = start
                    .value
                    .checked_add_signed(chrono::Duration::milliseconds(millis))
                {
                    recording.end_date = Some(Provenance::Calculated.tag(end));
                }
            }
        }

        // Cross-field: schedule says the recording should be this long
        if let (Some(expected), Some(duration)) = (
            recording.expected_duration_seconds,
            &recording.duration_seconds,
        ) {
            if (expected - duration.value).abs() > tolerances.duration_tolerance_seconds {
                warnings.push(Notice::new(
                    codes::DURATION_DRIFT,
                    "Duration differs from schedule",
                    format!(
                        "Recording lasted {:.3}s but {:.3}s was expected",
                        duration.value, expected
                    ),
                ));
            }
        }

        // Cross-field: the two checksums are compared, never merged
        if let (Some(calculated), Some(embedded)) = (
            &recording.calculated_checksum,
            &recording.embedded_checksum,
        ) {
            if calculated != embedded {
                warnings.push(Notice::new(
                    codes::CHECKSUM_MISMATCH,
                    "Checksum mismatch",
                    format!(
                        "Calculated {}:{} but sensor reported {}:{}",
                        calculated.algorithm, calculated.value,
                        embedded.algorithm, embedded.value
                    ),
                ));
            }
        }

        for warning in &warnings {
            tracing::warn!(path = %recording.source_path.display(), "{}", warning);
        }
        recording.warnings.extend(warnings);
    }
}

/// Pick the highest-priority candidate (first observation wins ties) and
/// warn once per candidate that disagrees with it.
fn adopt<T: Clone>(
    field: &str,
    code: &str,
    candidates: &[Sourced<T>],
    agrees: impl Fn(&T, &T) -> bool,
    show: impl Fn(&T) -> String,
    warnings: &mut Vec<Notice>,
) -> Option<Sourced<T>> {
    let mut winner: Option<&Sourced<T>> = None;
    for candidate in candidates {
        match winner {
            Some(current) if candidate.source.priority() <= current.source.priority() => {}
            _ => winner = Some(candidate),
        }
    }
    let winner = winner?;

    for candidate in candidates {
        if !agrees(&candidate.value, &winner.value) {
            warnings.push(Notice::new(
                code,
                format!("Ambiguous {}", field),
                format!(
                    "{} reports {} but {} reports {}; adopted the {} value",
                    winner.source,
                    show(&winner.value),
                    candidate.source,
                    show(&candidate.value),
                    winner.source
                ),
            ));
        }
    }

    Some(winner.clone())
}

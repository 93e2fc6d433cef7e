//! murre-mx - Field recording metadata extraction
//!
//! Extracts, reconciles, and reports metadata about audio recordings
//! collected from field sensors. The same fact (capture timestamp,
//! checksum, duration) may be observable from several independent,
//! occasionally conflicting sources; every observation is tagged with
//! its provenance and conflicts surface as diagnostics on the record
//! rather than silent overwrites.
//!
//! Reconciled records stream to a JSON or CSV document that is valid
//! (or a recoverable prefix) at every flush boundary, even while
//! concurrent workers are still producing.

pub mod models;
pub mod output;
pub mod services;

pub use models::{codes, Checksum, Location, Notice, Provenance, Recording, Sensor, Sourced};
pub use output::{CsvSerializer, JsonSerializer, OutputWriter, RecordSerializer};
pub use services::{BatchSummary, Observations, Processor, Reconciler};

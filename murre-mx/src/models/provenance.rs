//! Provenance tracking for extracted metadata
//!
//! **[MX-PROV-010]** Every externally-observed fact is representable as a
//! `(value, source)` pair so that conflicting observations can be detected
//! and reported instead of silently overwritten.

use serde::{Deserialize, Serialize};

/// Source of an extracted metadata value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provenance {
    /// Parsed out of the file name
    Filename,
    /// Read from a metadata header embedded in the file
    EmbeddedHeader,
    /// Derived by this tool from other facts
    Calculated,
    /// Reported by the sensor (log files, calibration data)
    SensorReported,
    /// Origin could not be attributed
    Unknown,
}

impl Provenance {
    /// Priority used when reconciling conflicting observations.
    /// Higher wins. `Unknown` is never authoritative in a conflict.
    pub fn priority(self) -> u8 {
        match self {
            Self::EmbeddedHeader => 4,
            Self::SensorReported => 3,
            Self::Filename => 2,
            Self::Calculated => 1,
            Self::Unknown => 0,
        }
    }

    /// Wrap a value with this source
    pub fn tag<T>(self, value: T) -> Sourced<T> {
        Sourced {
            value,
            source: self,
        }
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Filename => "Filename",
            Self::EmbeddedHeader => "EmbeddedHeader",
            Self::Calculated => "Calculated",
            Self::SensorReported => "SensorReported",
            Self::Unknown => "Unknown",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for Provenance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Filename" => Ok(Self::Filename),
            "EmbeddedHeader" => Ok(Self::EmbeddedHeader),
            "Calculated" => Ok(Self::Calculated),
            "SensorReported" => Ok(Self::SensorReported),
            "Unknown" => Ok(Self::Unknown),
            other => Err(format!("Unknown provenance '{}'", other)),
        }
    }
}

/// A metadata value paired with the source that produced it.
///
/// Immutable once constructed: adopting a derived or chosen value means
/// constructing a new `Sourced` (typically with `Provenance::Calculated`),
/// never mutating an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sourced<T> {
    pub value: T,
    pub source: Provenance,
}

impl<T> Sourced<T> {
    pub fn new(value: T, source: Provenance) -> Self {
        Self { value, source }
    }

    /// Map the inner value, keeping the source
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Sourced<U> {
        Sourced {
            value: f(self.value),
            source: self.source,
        }
    }
}

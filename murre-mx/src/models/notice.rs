//! Diagnostic notices attached to a recording
//!
//! A notice carries a stable machine-readable code for scripting and
//! filtering, plus a human-readable title and message. Errors and
//! warnings use the same shape and differ only by which list they are
//! appended to.

use serde::{Deserialize, Serialize};

/// Stable machine-readable diagnostic codes
pub mod codes {
    /// Input path does not exist
    pub const FILE_NOT_FOUND: &str = "FILE_NOT_FOUND";
    /// Input path exists but could not be opened or read
    pub const UNREADABLE: &str = "UNREADABLE";
    /// Conflicting start or end date observations
    pub const AMBIGUOUS_DATE: &str = "AMBIGUOUS_DATE";
    /// No source produced a start date
    pub const MISSING_DATE: &str = "MISSING_DATE";
    /// Conflicting duration observations
    pub const AMBIGUOUS_DURATION: &str = "AMBIGUOUS_DURATION";
    /// end − start disagrees with the duration beyond tolerance
    pub const DURATION_DRIFT: &str = "DURATION_DRIFT";
    /// Calculated and embedded checksums disagree
    pub const CHECKSUM_MISMATCH: &str = "CHECKSUM_MISMATCH";
    /// No checksum could be produced
    pub const CHECKSUM_MISSING: &str = "CHECKSUM_MISSING";
    /// Conflicting sample rate observations
    pub const AMBIGUOUS_SAMPLE_RATE: &str = "AMBIGUOUS_SAMPLE_RATE";
    /// Conflicting bit depth observations
    pub const AMBIGUOUS_BIT_DEPTH: &str = "AMBIGUOUS_BIT_DEPTH";
    /// Conflicting media type observations
    pub const AMBIGUOUS_MEDIA_TYPE: &str = "AMBIGUOUS_MEDIA_TYPE";
    /// Conflicting storage card identifier observations
    pub const AMBIGUOUS_CARD_ID: &str = "AMBIGUOUS_CARD_ID";
    /// Requested rename could not be performed
    pub const RENAME_FAILED: &str = "RENAME_FAILED";
    /// Record could not be appended to the output document
    pub const WRITE_FAILED: &str = "WRITE_FAILED";
}

/// A single diagnostic raised while processing a recording
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub title: String,
    pub message: String,
    pub code: String,
}

impl Notice {
    pub fn new(code: &str, title: impl Into<String>, message: impl Into<String>) -> Self {
        debug_assert!(!code.is_empty(), "notice codes must be non-empty");
        Self {
            title: title.into(),
            message: message.into(),
            code: code.to_string(),
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.title, self.message)
    }
}

//! JSON document format
//!
//! Records are streamed as one JSON array: `[\n` before the first record,
//! `,\n` between records, `\n]` at finalization. A stream truncated
//! before finalization is a valid prefix — appending the closer recovers
//! a parseable array.

use super::RecordSerializer;
use crate::models::Recording;
use murre_common::{Error, Result};

/// Serializer for the JSON array document format
#[derive(Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    pub fn new() -> Self {
        Self
    }
}

impl RecordSerializer for JsonSerializer {
    fn header(&mut self, _first: &Recording) -> Result<Vec<u8>> {
        Ok(b"[\n".to_vec())
    }

    fn separator(&self) -> &'static [u8] {
        b",\n"
    }

    fn record(&mut self, recording: &Recording) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(recording)
            .map_err(|e| Error::Serialization(format!("JSON record: {}", e)))
    }

    fn footer(&mut self, records_written: usize) -> Result<Vec<u8>> {
        if records_written == 0 {
            // No header was ever emitted; the whole document is the footer
            Ok(b"[]".to_vec())
        } else {
            Ok(b"\n]".to_vec())
        }
    }
}

/// Parse a finished JSON document back into records
pub fn read_records(document: &str) -> Result<Vec<Recording>> {
    serde_json::from_str(document)
        .map_err(|e| Error::Serialization(format!("JSON document: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_empty_document_is_valid_array() {
        let mut serializer = JsonSerializer::new();
        let footer = serializer.footer(0).unwrap();
        let records = read_records(std::str::from_utf8(&footer).unwrap()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_record_is_self_contained_json() {
        let mut serializer = JsonSerializer::new();
        let rec = Recording::for_path(Path::new("/cards/a.wav"));
        let bytes = serializer.record(&rec).unwrap();
        let parsed: Recording = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed, rec);
    }
}

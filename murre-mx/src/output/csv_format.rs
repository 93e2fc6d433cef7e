//! CSV tabular format
//!
//! Nested entities flatten to dotted column names (`startDate.value`,
//! `sensor.name`, …). List-valued fields (locations, diagnostics) are
//! carried as JSON inside their cell, the same way flat stores carry
//! array-valued columns. `other_fields` entries become extra columns
//! named after their key.
//!
//! The column set is fixed when the header row is written: the schema
//! columns plus the first record's `other_fields` keys in sorted order.
//! Later records with keys outside that set keep them in the document
//! formats only.

use super::RecordSerializer;
use crate::models::{Checksum, Location, Provenance, Recording, Sensor, Sourced};
use chrono::{DateTime, FixedOffset};
use murre_common::{Error, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Fixed schema columns, in output order
const SCHEMA_COLUMNS: &[&str] = &[
    "sourcePath",
    "extension",
    "stem",
    "recommendedName",
    "startDate.value",
    "startDate.source",
    "endDate.value",
    "endDate.source",
    "durationSeconds.value",
    "durationSeconds.source",
    "expectedDurationSeconds",
    "calculatedChecksum.algorithm",
    "calculatedChecksum.value",
    "embeddedChecksum.algorithm",
    "embeddedChecksum.value",
    "channels",
    "sampleRateHertz.value",
    "sampleRateHertz.source",
    "bitsPerSecond",
    "bitDepth.value",
    "bitDepth.source",
    "mediaType.value",
    "mediaType.source",
    "fileLengthBytes",
    "sensor.name",
    "sensor.firmware",
    "sensor.serialNumber",
    "location.latitude",
    "location.longitude",
    "allLocations",
    "storageCardIdentifier.value",
    "storageCardIdentifier.source",
    "errors",
    "warnings",
    "renamedPath",
];

/// Columns read back as `(value, source)` or `(algorithm, value)` pairs
const PAIRED_COLUMNS: &[&str] = &[
    "startDate.value",
    "startDate.source",
    "endDate.value",
    "endDate.source",
    "durationSeconds.value",
    "durationSeconds.source",
    "calculatedChecksum.algorithm",
    "calculatedChecksum.value",
    "embeddedChecksum.algorithm",
    "embeddedChecksum.value",
    "sampleRateHertz.value",
    "sampleRateHertz.source",
    "bitDepth.value",
    "bitDepth.source",
    "mediaType.value",
    "mediaType.source",
    "storageCardIdentifier.value",
    "storageCardIdentifier.source",
];

/// Serializer for the CSV tabular format
#[derive(Default)]
pub struct CsvSerializer {
    columns: Option<Vec<String>>,
}

impl CsvSerializer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordSerializer for CsvSerializer {
    fn header(&mut self, first: &Recording) -> Result<Vec<u8>> {
        let mut columns: Vec<String> =
            SCHEMA_COLUMNS.iter().map(|c| c.to_string()).collect();
        for key in first.other_fields.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }

        let row = write_row(&columns)?;
        self.columns = Some(columns);
        Ok(row)
    }

    fn separator(&self) -> &'static [u8] {
        // Rows carry their own terminator
        b""
    }

    fn record(&mut self, recording: &Recording) -> Result<Vec<u8>> {
        let columns = self
            .columns
            .as_ref()
            .ok_or_else(|| Error::Internal("CSV record before header".to_string()))?;

        let cells = flatten(recording)?;
        for key in recording.other_fields.keys() {
            if !columns.iter().any(|c| c == key) {
                tracing::debug!(key, "Field not in CSV header, dropped from row");
            }
        }

        let fields: Vec<String> = columns
            .iter()
            .map(|column| cells.get(column.as_str()).cloned().unwrap_or_default())
            .collect();
        write_row(&fields)
    }

    fn footer(&mut self, _records_written: usize) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }
}

fn write_row<S: AsRef<[u8]>>(fields: &[S]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer
        .write_record(fields)
        .map_err(|e| Error::Serialization(format!("CSV row: {}", e)))?;
    writer
        .into_inner()
        .map_err(|e| Error::Serialization(format!("CSV row: {}", e)))
}

fn flatten(recording: &Recording) -> Result<BTreeMap<String, String>> {
    let mut cells: BTreeMap<String, String> = BTreeMap::new();
    let mut put = |name: &str, value: String| {
        cells.insert(name.to_string(), value);
    };

    put(
        "sourcePath",
        recording.source_path.to_string_lossy().into_owned(),
    );
    if let Some(ref v) = recording.extension {
        put("extension", v.clone());
    }
    if let Some(ref v) = recording.stem {
        put("stem", v.clone());
    }
    if let Some(ref v) = recording.recommended_name {
        put("recommendedName", v.clone());
    }
    if let Some(ref v) = recording.start_date {
        put("startDate.value", v.value.to_rfc3339());
        put("startDate.source", v.source.to_string());
    }
    if let Some(ref v) = recording.end_date {
        put("endDate.value", v.value.to_rfc3339());
        put("endDate.source", v.source.to_string());
    }
    if let Some(ref v) = recording.duration_seconds {
        put("durationSeconds.value", v.value.to_string());
        put("durationSeconds.source", v.source.to_string());
    }
    if let Some(v) = recording.expected_duration_seconds {
        put("expectedDurationSeconds", v.to_string());
    }
    if let Some(ref v) = recording.calculated_checksum {
        put("calculatedChecksum.algorithm", v.algorithm.clone());
        put("calculatedChecksum.value", v.value.clone());
    }
    if let Some(ref v) = recording.embedded_checksum {
        put("embeddedChecksum.algorithm", v.algorithm.clone());
        put("embeddedChecksum.value", v.value.clone());
    }
    if let Some(v) = recording.channels {
        put("channels", v.to_string());
    }
    if let Some(ref v) = recording.sample_rate_hertz {
        put("sampleRateHertz.value", v.value.to_string());
        put("sampleRateHertz.source", v.source.to_string());
    }
    if let Some(v) = recording.bits_per_second {
        put("bitsPerSecond", v.to_string());
    }
    if let Some(ref v) = recording.bit_depth {
        put("bitDepth.value", v.value.to_string());
        put("bitDepth.source", v.source.to_string());
    }
    if let Some(ref v) = recording.media_type {
        put("mediaType.value", v.value.clone());
        put("mediaType.source", v.source.to_string());
    }
    if let Some(v) = recording.file_length_bytes {
        put("fileLengthBytes", v.to_string());
    }
    if let Some(ref sensor) = recording.sensor {
        if let Some(ref v) = sensor.name {
            put("sensor.name", v.clone());
        }
        if let Some(ref v) = sensor.firmware {
            put("sensor.firmware", v.clone());
        }
        if let Some(ref v) = sensor.serial_number {
            put("sensor.serialNumber", v.clone());
        }
    }
    if let Some(ref location) = recording.location {
        put("location.latitude", location.latitude.to_string());
        put("location.longitude", location.longitude.to_string());
    }
    if !recording.all_locations.is_empty() {
        put("allLocations", encode_json(&recording.all_locations)?);
    }
    if let Some(ref v) = recording.storage_card_identifier {
        put("storageCardIdentifier.value", v.value.clone());
        put("storageCardIdentifier.source", v.source.to_string());
    }
    if !recording.errors.is_empty() {
        put("errors", encode_json(&recording.errors)?);
    }
    if !recording.warnings.is_empty() {
        put("warnings", encode_json(&recording.warnings)?);
    }
    if let Some(ref v) = recording.renamed_path {
        put("renamedPath", v.to_string_lossy().into_owned());
    }

    for (key, value) in &recording.other_fields {
        cells.insert(key.clone(), value.clone());
    }

    Ok(cells)
}

fn encode_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Serialization(format!("CSV cell: {}", e)))
}

/// Parse a finished CSV document back into records
pub fn read_records(document: &str) -> Result<Vec<Recording>> {
    let mut reader = csv::Reader::from_reader(document.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| Error::Serialization(format!("CSV header: {}", e)))?
        .clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| Error::Serialization(format!("CSV row: {}", e)))?;
        records.push(assemble(&headers, &row)?);
    }
    Ok(records)
}

fn assemble(headers: &csv::StringRecord, row: &csv::StringRecord) -> Result<Recording> {
    let mut rec = Recording::default();
    let mut sensor = Sensor::default();
    let mut latitude: Option<f64> = None;
    let mut longitude: Option<f64> = None;

    // Sourced fields arrive as (value, source) cell pairs
    let mut pending: BTreeMap<&str, String> = BTreeMap::new();

    for (name, cell) in headers.iter().zip(row.iter()) {
        if cell.is_empty() {
            continue;
        }
        match name {
            "sourcePath" => rec.source_path = PathBuf::from(cell),
            "extension" => rec.extension = Some(cell.to_string()),
            "stem" => rec.stem = Some(cell.to_string()),
            "recommendedName" => rec.recommended_name = Some(cell.to_string()),
            "expectedDurationSeconds" => {
                rec.expected_duration_seconds = Some(parse_cell(name, cell)?)
            }
            _ if PAIRED_COLUMNS.contains(&name) => {
                pending.insert(name, cell.to_string());
            }
            "channels" => rec.channels = Some(parse_cell(name, cell)?),
            "bitsPerSecond" => rec.bits_per_second = Some(parse_cell(name, cell)?),
            "fileLengthBytes" => rec.file_length_bytes = Some(parse_cell(name, cell)?),
            "sensor.name" => sensor.name = Some(cell.to_string()),
            "sensor.firmware" => sensor.firmware = Some(cell.to_string()),
            "sensor.serialNumber" => sensor.serial_number = Some(cell.to_string()),
            "location.latitude" => latitude = Some(parse_cell(name, cell)?),
            "location.longitude" => longitude = Some(parse_cell(name, cell)?),
            "allLocations" => rec.all_locations = decode_json(name, cell)?,
            "errors" => rec.errors = decode_json(name, cell)?,
            "warnings" => rec.warnings = decode_json(name, cell)?,
            "renamedPath" => rec.renamed_path = Some(PathBuf::from(cell)),
            other => {
                rec.other_fields.insert(other.to_string(), cell.to_string());
            }
        }
    }

    rec.start_date = sourced_date(&pending, "startDate")?;
    rec.end_date = sourced_date(&pending, "endDate")?;
    rec.duration_seconds = sourced_parsed(&pending, "durationSeconds")?;
    rec.sample_rate_hertz = sourced_parsed(&pending, "sampleRateHertz")?;
    rec.bit_depth = sourced_parsed(&pending, "bitDepth")?;
    rec.media_type = sourced_string(&pending, "mediaType")?;
    rec.storage_card_identifier = sourced_string(&pending, "storageCardIdentifier")?;
    rec.calculated_checksum = checksum_pair(&pending, "calculatedChecksum")?;
    rec.embedded_checksum = checksum_pair(&pending, "embeddedChecksum")?;

    if sensor != Sensor::default() {
        rec.sensor = Some(sensor);
    }
    if let (Some(latitude), Some(longitude)) = (latitude, longitude) {
        rec.location = Some(Location {
            latitude,
            longitude,
        });
    }

    Ok(rec)
}

fn parse_cell<T: std::str::FromStr>(name: &str, cell: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    cell.parse()
        .map_err(|e| Error::Serialization(format!("CSV column {}: {}", name, e)))
}

fn decode_json<T: serde::de::DeserializeOwned>(name: &str, cell: &str) -> Result<T> {
    serde_json::from_str(cell)
        .map_err(|e| Error::Serialization(format!("CSV column {}: {}", name, e)))
}

fn source_of(pending: &BTreeMap<&str, String>, field: &str) -> Result<Provenance> {
    match pending.get(format!("{}.source", field).as_str()) {
        Some(cell) => cell.parse().map_err(Error::Serialization),
        None => Ok(Provenance::Unknown),
    }
}

fn sourced_date(
    pending: &BTreeMap<&str, String>,
    field: &str,
) -> Result<Option<Sourced<DateTime<FixedOffset>>>> {
    let Some(cell) = pending.get(format!("{}.value", field).as_str()) else {
        return Ok(None);
    };
    let value = DateTime::parse_from_rfc3339(cell)
        .map_err(|e| Error::Serialization(format!("CSV column {}.value: {}", field, e)))?;
    Ok(Some(Sourced::new(value, source_of(pending, field)?)))
}

fn sourced_parsed<T: std::str::FromStr>(
    pending: &BTreeMap<&str, String>,
    field: &str,
) -> Result<Option<Sourced<T>>>
where
    T::Err: std::fmt::Display,
{
    let Some(cell) = pending.get(format!("{}.value", field).as_str()) else {
        return Ok(None);
    };
    let value = parse_cell(field, cell)?;
    Ok(Some(Sourced::new(value, source_of(pending, field)?)))
}

fn sourced_string(
    pending: &BTreeMap<&str, String>,
    field: &str,
) -> Result<Option<Sourced<String>>> {
    let Some(cell) = pending.get(format!("{}.value", field).as_str()) else {
        return Ok(None);
    };
    Ok(Some(Sourced::new(cell.clone(), source_of(pending, field)?)))
}

fn checksum_pair(
    pending: &BTreeMap<&str, String>,
    field: &str,
) -> Result<Option<Checksum>> {
    let algorithm = pending.get(format!("{}.algorithm", field).as_str());
    let value = pending.get(format!("{}.value", field).as_str());
    match (algorithm, value) {
        (Some(algorithm), Some(value)) => {
            Ok(Some(Checksum::new(algorithm.as_str(), value.as_str())))
        }
        (None, None) => Ok(None),
        _ => Err(Error::Serialization(format!(
            "CSV column {}: algorithm and value must appear together",
            field
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{codes, Notice};
    use std::path::Path;

    fn full_record() -> Recording {
        let mut rec = Recording::for_path(Path::new("/cards/20240204T213000+1000.wav"));
        rec.start_date = Some(Provenance::Filename.tag(
            DateTime::parse_from_rfc3339("2024-02-04T21:30:00+10:00").unwrap(),
        ));
        rec.duration_seconds = Some(Provenance::EmbeddedHeader.tag(3600.5));
        rec.sample_rate_hertz = Some(Provenance::EmbeddedHeader.tag(44_100));
        rec.bit_depth = Some(Provenance::EmbeddedHeader.tag(16));
        rec.media_type = Some(Provenance::Calculated.tag("audio/wave".to_string()));
        rec.channels = Some(2);
        rec.bits_per_second = Some(1_411_200);
        rec.file_length_bytes = Some(635_040_044);
        rec.calculated_checksum = Some(Checksum::new("SHA-256", "abc123"));
        rec.location = Some(Location {
            latitude: -27.455,
            longitude: 153.039,
        });
        rec.all_locations = vec![Location {
            latitude: -27.455,
            longitude: 153.039,
        }];
        rec.warnings
            .push(Notice::new(codes::MISSING_DATE, "t", "m"));
        rec.other_fields
            .insert("gain".to_string(), "12dB".to_string());
        rec
    }

    fn serialize(records: &[Recording]) -> String {
        let mut serializer = CsvSerializer::new();
        let mut bytes = serializer.header(&records[0]).unwrap();
        for record in records {
            bytes.extend(serializer.record(record).unwrap());
        }
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_flatten_and_assemble_round_trip() {
        let rec = full_record();
        let document = serialize(std::slice::from_ref(&rec));
        let records = read_records(&document).unwrap();
        assert_eq!(records, vec![rec]);
    }

    #[test]
    fn test_other_fields_become_columns() {
        let rec = full_record();
        let document = serialize(std::slice::from_ref(&rec));
        let first_line = document.lines().next().unwrap();
        assert!(first_line.ends_with(",gain"));
    }

    #[test]
    fn test_later_unknown_keys_are_dropped() {
        let first = full_record();
        let mut second = full_record();
        second
            .other_fields
            .insert("battery".to_string(), "3.9V".to_string());

        let document = serialize(&[first, second]);
        let records = read_records(&document).unwrap();

        // The column set was fixed by the first record
        assert!(!records[1].other_fields.contains_key("battery"));
        assert_eq!(records[1].other_fields["gain"], "12dB");
    }

    #[test]
    fn test_sparse_record_round_trip() {
        let rec = Recording::for_path(Path::new("/cards/b.wav"));
        let document = serialize(std::slice::from_ref(&rec));
        let records = read_records(&document).unwrap();
        assert_eq!(records, vec![rec]);
    }

    #[test]
    fn test_bad_provenance_cell_is_serialization_error() {
        let rec = full_record();
        let document = serialize(std::slice::from_ref(&rec))
            .replace("EmbeddedHeader", "Telepathy");
        assert!(read_records(&document).is_err());
    }
}

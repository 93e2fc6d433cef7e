//! Shared fixtures for integration tests
#![allow(dead_code)]

use chrono::DateTime;
use murre_mx::models::{Checksum, Location, Provenance, Recording, Sourced};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// A cloneable in-memory sink so tests can inspect the byte stream at
/// arbitrary flush boundaries while a writer still owns it.
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Deterministic fully-populated recording, distinct per index
pub fn sample_recording(index: usize) -> Recording {
    let start = DateTime::parse_from_rfc3339(&format!(
        "2024-02-{:02}T21:30:00+10:00",
        (index % 27) + 1
    ))
    .unwrap();

    let mut rec = Recording::for_path(Path::new(&format!("/cards/rec-{:03}.wav", index)));
    rec.start_date = Some(Sourced::new(start, Provenance::Filename));
    rec.duration_seconds = Some(Provenance::EmbeddedHeader.tag(3600.0 + index as f64));
    rec.sample_rate_hertz = Some(Provenance::EmbeddedHeader.tag(44_100));
    rec.bit_depth = Some(Provenance::EmbeddedHeader.tag(16));
    rec.media_type = Some(Provenance::Filename.tag("audio/wave".to_string()));
    rec.channels = Some(2);
    rec.bits_per_second = Some(1_411_200);
    rec.file_length_bytes = Some(1_000_000 + index as u64);
    rec.calculated_checksum = Some(Checksum::new("SHA-256", format!("{:064x}", index)));
    rec.storage_card_identifier =
        Some(Provenance::SensorReported.tag(format!("CARD{:04}", index)));
    rec.location = Some(Location {
        latitude: -27.455,
        longitude: 153.039,
    });
    rec.all_locations = vec![Location {
        latitude: -27.455,
        longitude: 153.039,
    }];
    rec.other_fields
        .insert("gain".to_string(), format!("{}dB", index));
    rec
}

/// Write a minimal 16-bit PCM WAVE file with `seconds` of silence
pub fn write_wave_fixture(
    path: &Path,
    channels: u16,
    sample_rate: u32,
    bit_depth: u16,
    seconds: f64,
) {
    let byte_rate = sample_rate * channels as u32 * bit_depth as u32 / 8;
    let block_align = channels * bit_depth / 8;
    let data_len = (byte_rate as f64 * seconds) as u32;

    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
    bytes.extend_from_slice(&channels.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&byte_rate.to_le_bytes());
    bytes.extend_from_slice(&block_align.to_le_bytes());
    bytes.extend_from_slice(&bit_depth.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    bytes.resize(bytes.len() + data_len as usize, 0);

    std::fs::write(path, bytes).unwrap();
}

/// Stems of the given records' source paths, for order assertions
pub fn stems(records: &[Recording]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.stem.clone().unwrap_or_default())
        .collect()
}

/// Sorted copy of paths, for set comparisons
pub fn sorted_paths(records: &[Recording]) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = records.iter().map(|r| r.source_path.clone()).collect();
    paths.sort();
    paths
}

//! Embedded header probe
//!
//! **[MX-HDR-010]** Contributes `EmbeddedHeader` observations by reading
//! file header *structure* only — chunk ids, sizes, and the format block.
//! Audio sample data is never read; the data chunk is sized, not decoded.
//!
//! Formats without a built-in probe simply contribute no observations;
//! deep frame-level inspection belongs to external collaborators behind
//! the same trait.

use murre_common::Result;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Facts read from an embedded file header
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderFacts {
    pub media_type: String,
    pub channels: u8,
    pub sample_rate_hertz: u32,
    pub bits_per_second: u32,
    pub bit_depth: u8,
    /// Derived from the payload size and byte rate; absent when the
    /// header carries no payload size
    pub duration_seconds: Option<f64>,
}

/// A header reader. `Ok(None)` means the format was not recognized and
/// the file contributes no header observations.
pub trait HeaderProbe: Send + Sync {
    fn probe(&self, path: &Path) -> Result<Option<HeaderFacts>>;
}

/// Probe for RIFF/WAVE headers
pub struct WaveHeaderProbe;

impl WaveHeaderProbe {
    const RIFF: &'static [u8; 4] = b"RIFF";
    const WAVE: &'static [u8; 4] = b"WAVE";

    fn read_header(file: &mut File) -> std::io::Result<Option<HeaderFacts>> {
        let mut riff = [0u8; 12];
        if file.read_exact(&mut riff).is_err() {
            // Too small to carry a RIFF header
            return Ok(None);
        }
        if &riff[0..4] != Self::RIFF || &riff[8..12] != Self::WAVE {
            return Ok(None);
        }

        let mut format: Option<(u16, u32, u32, u16)> = None; // channels, rate, byte rate, bits
        let mut data_length: Option<u64> = None;

        // Walk the chunk list; chunk payloads are padded to even lengths
        loop {
            let mut chunk_header = [0u8; 8];
            if file.read_exact(&mut chunk_header).is_err() {
                break;
            }
            let chunk_id = &chunk_header[0..4];
            let chunk_size =
                u32::from_le_bytes([chunk_header[4], chunk_header[5], chunk_header[6], chunk_header[7]])
                    as u64;

            match chunk_id {
                b"fmt " if chunk_size >= 16 => {
                    let mut fmt = [0u8; 16];
                    file.read_exact(&mut fmt)?;
                    let channels = u16::from_le_bytes([fmt[2], fmt[3]]);
                    let sample_rate = u32::from_le_bytes([fmt[4], fmt[5], fmt[6], fmt[7]]);
                    let byte_rate = u32::from_le_bytes([fmt[8], fmt[9], fmt[10], fmt[11]]);
                    let bit_depth = u16::from_le_bytes([fmt[14], fmt[15]]);
                    format = Some((channels, sample_rate, byte_rate, bit_depth));
                    file.seek(SeekFrom::Current(padded(chunk_size) as i64 - 16))?;
                }
                b"data" => {
                    data_length = Some(chunk_size);
                    // Size only; never read the samples themselves
                    file.seek(SeekFrom::Current(padded(chunk_size) as i64))?;
                }
                _ => {
                    file.seek(SeekFrom::Current(padded(chunk_size) as i64))?;
                }
            }

            if format.is_some() && data_length.is_some() {
                break;
            }
        }

        let Some((channels, sample_rate, byte_rate, bit_depth)) = format else {
            tracing::debug!("RIFF file without a fmt chunk");
            return Ok(None);
        };

        if channels == 0 || channels > u8::MAX as u16 || sample_rate == 0 {
            tracing::debug!(channels, sample_rate, "Implausible fmt chunk ignored");
            return Ok(None);
        }

        let duration_seconds = match (data_length, byte_rate) {
            (Some(bytes), rate) if rate > 0 => Some(bytes as f64 / rate as f64),
            _ => None,
        };

        Ok(Some(HeaderFacts {
            media_type: "audio/wave".to_string(),
            channels: channels as u8,
            sample_rate_hertz: sample_rate,
            bits_per_second: byte_rate.saturating_mul(8),
            bit_depth: bit_depth.min(u8::MAX as u16) as u8,
            duration_seconds,
        }))
    }
}

fn padded(chunk_size: u64) -> u64 {
    chunk_size + (chunk_size & 1)
}

impl HeaderProbe for WaveHeaderProbe {
    fn probe(&self, path: &Path) -> Result<Option<HeaderFacts>> {
        let mut file = File::open(path)?;
        let facts = Self::read_header(&mut file)?;
        if let Some(ref facts) = facts {
            tracing::debug!(
                path = %path.display(),
                sample_rate = facts.sample_rate_hertz,
                channels = facts.channels,
                "Read embedded header"
            );
        }
        Ok(facts)
    }
}

/// A probe that recognizes nothing; stands in where header inspection is
/// supplied externally or deliberately disabled.
pub struct NoopHeaderProbe;

impl HeaderProbe for NoopHeaderProbe {
    fn probe(&self, _path: &Path) -> Result<Option<HeaderFacts>> {
        Ok(None)
    }
}

//! File checksum calculation
//!
//! Calculates SHA-256 over the file content in 1 MB chunks, off the async
//! runtime. The result is recorded as the *calculated* checksum; a
//! sensor-produced checksum lives in its own field and the two are only
//! ever compared, never merged.

use crate::models::Checksum;
use murre_common::{Error, Result};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Algorithm label attached to calculated checksums
pub const ALGORITHM: &str = "SHA-256";

/// Checksum calculator service
pub struct ChecksumCalculator;

impl ChecksumCalculator {
    /// Calculate the SHA-256 checksum of a file.
    ///
    /// Runs on the blocking pool; the file is read in 1 MB chunks so
    /// arbitrarily large recordings never land in memory at once.
    pub async fn calculate(&self, path: &Path) -> Result<Checksum> {
        let path = path.to_path_buf();
        tracing::debug!(path = %path.display(), "Calculating checksum");

        let value = tokio::task::spawn_blocking(move || -> Result<String> {
            use std::fs::File;
            use std::io::Read;

            let mut file = File::open(&path)?;
            let mut hasher = Sha256::new();
            let mut buffer = vec![0u8; 1024 * 1024];

            loop {
                let bytes_read = file.read(&mut buffer)?;
                if bytes_read == 0 {
                    break;
                }
                hasher.update(&buffer[..bytes_read]);
            }

            Ok(format!("{:x}", hasher.finalize()))
        })
        .await
        .map_err(|e| Error::Internal(format!("Checksum task failed: {}", e)))??;

        Ok(Checksum::new(ALGORITHM, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_calculate_known_content() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"test content").unwrap();
        temp_file.flush().unwrap();

        let checksum = ChecksumCalculator
            .calculate(temp_file.path())
            .await
            .unwrap();

        assert_eq!(checksum.algorithm, ALGORITHM);
        assert_eq!(checksum.value, format!("{:x}", Sha256::digest(b"test content")));
        assert_eq!(checksum.value.len(), 64);
    }

    #[tokio::test]
    async fn test_calculate_empty_file() {
        let temp_file = NamedTempFile::new().unwrap();

        let checksum = ChecksumCalculator
            .calculate(temp_file.path())
            .await
            .unwrap();

        assert_eq!(checksum.value, format!("{:x}", Sha256::digest(b"")));
    }

    #[tokio::test]
    async fn test_calculate_missing_file() {
        let result = ChecksumCalculator
            .calculate(Path::new("/nonexistent/file.wav"))
            .await;
        assert!(result.is_err());
    }
}

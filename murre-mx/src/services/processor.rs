//! Recording processing pipeline
//!
//! **[MX-PIPE-010]** Drives each input path through the processing steps:
//! validate → parse filename → probe header → checksum → reconcile →
//! (optional) rename → write. Failures are isolated per item; the batch
//! always continues with the next path.
//!
//! All paths converge on one shared [`OutputWriter`]; its lock is the
//! only point of contention. There are no await points inside the
//! writer's critical section, so a task cancelled while *waiting* simply
//! never acquires the lock and contributes no output, while an append in
//! flight always runs to completion.

use crate::models::{codes, Notice, Provenance, Recording};
use crate::output::OutputWriter;
use crate::services::checksum::ChecksumCalculator;
use crate::services::filename_parser::{ConventionParser, FilenameParser};
use crate::services::header_probe::{HeaderProbe, WaveHeaderProbe};
use crate::services::reconciler::{Observations, Reconciler};
use murre_common::config::Tolerances;
use murre_common::{time, Error, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Outcome of one batch run
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Items fully processed and written
    pub processed: usize,
    /// Items that failed fatally
    pub failed: usize,
    /// Per-item failure descriptions, in completion order
    pub failures: Vec<(PathBuf, String)>,
}

/// Processes each audio recording: metadata extraction, reconciliation,
/// optional rename, and output.
pub struct Processor<W: Write + Send + 'static> {
    parser: Box<dyn FilenameParser>,
    probe: Box<dyn HeaderProbe>,
    checksums: ChecksumCalculator,
    reconciler: Reconciler,
    rename: bool,
    writer: Arc<OutputWriter<W>>,
}

impl<W: Write + Send + 'static> Processor<W> {
    /// Create a processor with the built-in filename grammar and header
    /// probe.
    pub fn new(
        writer: Arc<OutputWriter<W>>,
        tolerances: Tolerances,
        rename: bool,
    ) -> Result<Self> {
        Ok(Self {
            parser: Box::new(ConventionParser::new()?),
            probe: Box::new(WaveHeaderProbe),
            checksums: ChecksumCalculator,
            reconciler: Reconciler::new(tolerances),
            rename,
            writer,
        })
    }

    /// Swap the filename grammar (sensor-specific parsers)
    pub fn with_parser(mut self, parser: Box<dyn FilenameParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Swap the header probe (external deep-check integrations)
    pub fn with_probe(mut self, probe: Box<dyn HeaderProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Process a single recording, without writing it.
    ///
    /// Returns `Err` only for failures that make the whole item
    /// unusable (missing or unreadable file); data-quality findings
    /// land in the recording's diagnostics instead.
    pub async fn process_file(&self, path: &Path) -> Result<Recording> {
        tracing::info!(path = %path.display(), "Processing recording");

        // Step 0: validate
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(format!("Could not find the file {}", path.display()))
            } else {
                Error::Io(e)
            }
        })?;
        if !metadata.is_file() {
            return Err(Error::InvalidInput(format!(
                "{} is not a regular file",
                path.display()
            )));
        }

        let mut recording = Recording::for_path(path);
        recording.file_length_bytes = Some(metadata.len());

        let mut observations = Observations::default();

        // Step 1: parse filename
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parsed = self.parser.parse(&file_name);
        tracing::debug!(path = %path.display(), ?parsed, "Parsed filename");

        recording.extension = parsed.extension.or(recording.extension);
        recording.stem = parsed.stem.or(recording.stem);

        match parsed.start_date {
            Some(date) => observations
                .start_date
                .push(Provenance::Filename.tag(date)),
            None => {
                tracing::warn!(
                    path = %path.display(),
                    "Could not unambiguously parse a date from the filename"
                );
            }
        }
        if let Some(location) = parsed.location {
            recording.location = Some(location);
            recording.all_locations.push(location);
        }
        if let Some(media_type) = recording
            .extension
            .as_deref()
            .and_then(media_type_for_extension)
        {
            observations
                .media_type
                .push(Provenance::Filename.tag(media_type.to_string()));
        }

        // Step 2: probe the embedded header (structure only)
        match self.probe.probe(path) {
            Ok(Some(facts)) => {
                observations
                    .sample_rate_hertz
                    .push(Provenance::EmbeddedHeader.tag(facts.sample_rate_hertz));
                observations
                    .bit_depth
                    .push(Provenance::EmbeddedHeader.tag(facts.bit_depth));
                observations
                    .media_type
                    .push(Provenance::EmbeddedHeader.tag(facts.media_type));
                if let Some(duration) = facts.duration_seconds {
                    observations
                        .duration_seconds
                        .push(Provenance::EmbeddedHeader.tag(duration));
                }
                recording.channels = Some(facts.channels);
                recording.bits_per_second = Some(facts.bits_per_second);
            }
            Ok(None) => {
                tracing::debug!(path = %path.display(), "No readable embedded header");
            }
            // The file passed the existence check but cannot be read
            Err(e) => return Err(e),
        }

        // Step 3: calculate checksum
        match self.checksums.calculate(path).await {
            Ok(checksum) => recording.calculated_checksum = Some(checksum),
            Err(e) => {
                tracing::warn!(path = %path.display(), "Checksum failed: {}", e);
                recording.push_error(Notice::new(
                    codes::CHECKSUM_MISSING,
                    "Checksum could not be calculated",
                    e.to_string(),
                ));
            }
        }

        // Step 4: reconcile all observations
        self.reconciler.reconcile(&mut recording, observations);

        // Step 5: recommend an archival name; rename only on request
        if let Some(ref start) = recording.start_date {
            recording.recommended_name = Some(format!(
                "{}{}",
                time::archival_timestamp(&start.value),
                recording.extension.as_deref().unwrap_or_default()
            ));
        }
        if self.rename {
            self.rename_file(&mut recording).await;
        }

        tracing::debug!(path = %path.display(), "Completed recording");
        Ok(recording)
    }

    /// Rename to the recommended archival name. Failure is a warning on
    /// the recording, never fatal to the batch.
    async fn rename_file(&self, recording: &mut Recording) {
        let Some(new_name) = recording.recommended_name.clone() else {
            tracing::debug!(
                path = %recording.source_path.display(),
                "No recommended name; rename skipped"
            );
            return;
        };
        if recording.name().as_deref() == Some(new_name.as_str()) {
            return;
        }

        let target = match recording.directory() {
            Some(dir) => dir.join(&new_name),
            None => PathBuf::from(&new_name),
        };

        match tokio::fs::rename(&recording.source_path, &target).await {
            Ok(()) => {
                tracing::info!(
                    from = %recording.source_path.display(),
                    to = %target.display(),
                    "Renamed recording"
                );
                recording.renamed_path = Some(target);
            }
            Err(e) => {
                recording.push_warning(Notice::new(
                    codes::RENAME_FAILED,
                    "Rename failed",
                    format!("Could not rename to {}: {}", target.display(), e),
                ));
            }
        }
    }

    /// Process one path and append the result to the shared writer.
    ///
    /// A cancellation that arrives while waiting for the writer lock
    /// means the lock is never acquired and no output is produced for
    /// this record.
    pub async fn process_one(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<Recording> {
        let recording = self.process_file(path).await?;

        tokio::select! {
            _ = cancel.cancelled() => Err(Error::Internal(format!(
                "Cancelled before writing {}",
                path.display()
            ))),
            result = self.writer.write(&recording) => {
                result?;
                Ok(recording)
            }
        }
    }

    /// Process a batch of paths concurrently, one worker per path up to
    /// `workers` in flight. Items fail in isolation; the summary reports
    /// per-item failures in completion order.
    pub async fn process_batch(
        self: Arc<Self>,
        paths: Vec<PathBuf>,
        workers: usize,
        cancel: CancellationToken,
    ) -> BatchSummary {
        let semaphore = Arc::new(Semaphore::new(workers.max(1)));
        let mut join_set = JoinSet::new();

        for path in paths {
            let processor = Arc::clone(&self);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();

            join_set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (path, Err(Error::Internal("worker pool closed".to_string())))
                    }
                };
                if cancel.is_cancelled() {
                    return (
                        path,
                        Err(Error::Internal("cancelled before processing".to_string())),
                    );
                }
                let result = processor.process_one(&path, &cancel).await;
                (path, result)
            });
        }

        let mut summary = BatchSummary::default();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((path, Ok(recording))) => {
                    summary.processed += 1;
                    tracing::info!(
                        path = %path.display(),
                        errors = recording.errors.len(),
                        warnings = recording.warnings.len(),
                        "Recording written"
                    );
                }
                Ok((path, Err(e))) => {
                    summary.failed += 1;
                    tracing::error!(path = %path.display(), "Recording failed: {}", e);
                    summary.failures.push((path, e.to_string()));
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!("Worker task failed: {}", e);
                    summary.failures.push((PathBuf::new(), e.to_string()));
                }
            }
        }

        summary
    }
}

/// Media type implied by a file extension (leading period included)
fn media_type_for_extension(extension: &str) -> Option<&'static str> {
    let media_type = match extension.to_ascii_lowercase().as_str() {
        ".wav" => "audio/wave",
        ".flac" => "audio/flac",
        ".mp3" => "audio/mpeg",
        ".ogg" | ".oga" => "audio/ogg",
        ".m4a" => "audio/mp4",
        ".aac" => "audio/aac",
        ".opus" => "audio/opus",
        ".aiff" => "audio/aiff",
        _ => return None,
    };
    Some(media_type)
}

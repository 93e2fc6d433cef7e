//! Streaming output writer
//!
//! **[MX-WRT-010]** Serializes an unbounded, incrementally-produced
//! sequence of recordings without buffering the result set. The document
//! on disk is a valid instance (or recoverable prefix) of the target
//! format at every flush boundary.
//!
//! **[MX-WRT-020]** The append path is one critical section: workers
//! share a single writer per destination and block on its lock, so each
//! record reaches the sink as one contiguous run of bytes.

pub mod csv_format;
pub mod json_format;

use crate::models::Recording;
use murre_common::{Error, Result};
use std::io::Write;
use tokio::sync::Mutex;

pub use csv_format::CsvSerializer;
pub use json_format::JsonSerializer;

/// A wire format, polymorphic over header / record / footer emission.
///
/// Implementations serialize into memory and let [`OutputWriter`] own all
/// sink I/O, so a record that cannot be represented never corrupts bytes
/// already written.
pub trait RecordSerializer: Send {
    /// Opening bytes, emitted once before the first record
    fn header(&mut self, first: &Recording) -> Result<Vec<u8>>;

    /// Bytes emitted between two consecutive records
    fn separator(&self) -> &'static [u8];

    /// One serialized record
    fn record(&mut self, recording: &Recording) -> Result<Vec<u8>>;

    /// Closing bytes, emitted once at finalization
    fn footer(&mut self, records_written: usize) -> Result<Vec<u8>>;
}

struct WriterInner<W: Write> {
    sink: W,
    serializer: Box<dyn RecordSerializer>,
    written: usize,
    finalized: bool,
}

/// Streaming writer over an opaque byte sink.
///
/// One instance per output destination; the internal lock is the only
/// shared mutable state in the pipeline. Callers block (not spin) for
/// their turn, and an in-flight append always runs to completion.
pub struct OutputWriter<W: Write + Send> {
    inner: Mutex<WriterInner<W>>,
}

impl<W: Write + Send> OutputWriter<W> {
    pub fn new(serializer: Box<dyn RecordSerializer>, sink: W) -> Self {
        Self {
            inner: Mutex::new(WriterInner {
                sink,
                serializer,
                written: 0,
                finalized: false,
            }),
        }
    }

    /// Append one record.
    ///
    /// Serialization happens before any sink I/O: a record the format
    /// cannot represent is reported to the caller, the sink is left
    /// untouched, and the writer remains usable for later records.
    pub async fn write(&self, recording: &Recording) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        if inner.finalized {
            return Err(Error::InvalidInput(
                "write called after finalize".to_string(),
            ));
        }

        let header = if inner.written == 0 {
            Some(inner.serializer.header(recording)?)
        } else {
            None
        };
        let body = inner.serializer.record(recording)?;

        match header {
            Some(header) => inner.sink.write_all(&header)?,
            None => inner.sink.write_all(inner.serializer.separator())?,
        }
        inner.sink.write_all(&body)?;
        inner.sink.flush()?;
        inner.written += 1;

        Ok(())
    }

    /// Emit the closing sequence and flush. Writing after this is an
    /// error; so is finalizing twice.
    pub async fn finalize(&self) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        if inner.finalized {
            return Err(Error::InvalidInput("finalize called twice".to_string()));
        }

        let footer = inner.serializer.footer(inner.written)?;
        inner.sink.write_all(&footer)?;
        inner.sink.flush()?;
        inner.finalized = true;

        tracing::debug!(records = inner.written, "Finalized output document");
        Ok(())
    }

    /// Number of records appended so far
    pub async fn records_written(&self) -> usize {
        self.inner.lock().await.written
    }

    /// Recover the sink (tests and buffer-backed callers)
    pub fn into_inner(self) -> W {
        self.inner.into_inner().sink
    }
}

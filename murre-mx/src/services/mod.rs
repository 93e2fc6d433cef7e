//! Processing services for the metadata pipeline

pub mod checksum;
pub mod filename_parser;
pub mod header_probe;
pub mod processor;
pub mod reconciler;
pub mod scanner;

pub use checksum::ChecksumCalculator;
pub use filename_parser::{ConventionParser, FilenameParser, ParsedFilename};
pub use header_probe::{HeaderFacts, HeaderProbe, NoopHeaderProbe, WaveHeaderProbe};
pub use processor::{BatchSummary, Processor};
pub use reconciler::{Observations, Reconciler};
pub use scanner::FileScanner;

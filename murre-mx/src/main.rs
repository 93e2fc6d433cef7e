//! murre-mx - Field recording metadata extraction tool
//!
//! Walks the given files or directories, extracts and reconciles
//! metadata for each recording, and streams the results to a JSON or
//! CSV document. Logs go to stderr so the document can go to stdout.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use murre_mx::output::{CsvSerializer, JsonSerializer, OutputWriter, RecordSerializer};
use murre_mx::services::{FileScanner, Processor};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Output document format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

/// Command-line arguments for murre-mx
#[derive(Parser, Debug)]
#[command(name = "murre-mx")]
#[command(about = "Extract and reconcile field recording metadata")]
#[command(version)]
struct Args {
    /// Audio files or directories to process
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output document format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json, env = "MURRE_FORMAT")]
    format: OutputFormat,

    /// Write the document to this file instead of stdout
    #[arg(short, long, env = "MURRE_OUTPUT")]
    output: Option<PathBuf>,

    /// Rename files to their recommended archival names
    #[arg(long)]
    rename: bool,

    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum number of recordings processed concurrently
    #[arg(short, long, default_value_t = 4, env = "MURRE_WORKERS")]
    workers: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = murre_common::config::load_config(args.config.as_deref())
        .context("Failed to load configuration")?;

    // Initialize tracing; RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!(
                    "murre_mx={0},murre_common={0}",
                    config.logging.level
                ))
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting murre-mx (metadata extraction)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Expand inputs into the work list
    let files = FileScanner::new().collect(&args.inputs);
    if files.is_empty() {
        info!("Nothing to process");
        return Ok(());
    }
    info!("Processing {} recording(s)", files.len());

    // One writer per destination, shared by all workers
    let sink: Box<dyn Write + Send> = match args.output {
        Some(ref path) => Box::new(
            std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout()),
    };
    let serializer: Box<dyn RecordSerializer> = match args.format {
        OutputFormat::Json => Box::new(JsonSerializer::new()),
        OutputFormat::Csv => Box::new(CsvSerializer::new()),
    };
    let writer = Arc::new(OutputWriter::new(serializer, sink));

    let processor = Arc::new(
        Processor::new(Arc::clone(&writer), config.tolerances, args.rename)
            .context("Failed to initialize processor")?,
    );

    // Ctrl-C stops accepting new work; records mid-write still complete
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after in-flight records");
            signal_token.cancel();
        }
    });

    let summary = processor
        .process_batch(files, args.workers, cancel)
        .await;

    // Close the document even when some items failed: everything that
    // was written must remain a valid document.
    writer
        .finalize()
        .await
        .context("Failed to finalize output document")?;

    info!(
        processed = summary.processed,
        failed = summary.failed,
        "Batch complete"
    );
    for (path, reason) in &summary.failures {
        tracing::error!(path = %path.display(), "{}", reason);
    }

    if summary.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

//! gfm - split a byte stream into erasure-coded shard files
//!
//! Encode: `gfm STUB N M` reads standard input and writes N data plus
//! M parity shard files along with an MD5 manifest. Decode: `gfm STUB`
//! rebuilds the stream from whichever shards still exist and writes it
//! to standard output.

use clap::Parser;
use gfm::error::{Error, Result};
use gfm::shard::DecodeOutcome;
use gfm::{diag, selftest, shard};
use std::fs::File;
use std::io;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Galois-field erasure coding for split-file archives
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Filename stub the shard files derive from. Without shard
    /// counts, decode mode: rebuild the stream onto standard output
    /// (or, when no shards exist, write the embedded recovery archive
    /// to STUB, "-" meaning standard output).
    stub: String,

    /// Number of data files, 1-249 (encode mode)
    num_data: Option<u16>,

    /// Number of parity files, 1-249 (encode mode)
    num_parity: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

// =============================================================================
// Main
// =============================================================================

fn main() {
    let args = Args::parse();
    init_logging(&args);

    if let Err(err) = run(&args) {
        eprintln!("gfm: {err}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    // Built-in test first, normal operation only after it passes
    if std::env::var_os("BIT").is_some() {
        eprintln!("BIT ...");
        selftest::run()?;
        eprintln!("BIT OK");
    }

    if std::env::var_os("DMP").is_some() {
        enable_dumps(&args.stub)?;
    }

    match (args.num_data, args.num_parity) {
        (None, None) => decode(args),
        (Some(num_data), Some(num_parity)) => encode(args, num_data, num_parity),
        _ => Err(Error::InvalidArgument(
            "encode mode needs both NUM_DATA and NUM_PARITY".to_string(),
        )),
    }
}

// =============================================================================
// Modes
// =============================================================================

fn encode(args: &Args, num_data: u16, num_parity: u16) -> Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let report = shard::encode_stream(
        &mut input,
        &args.stub,
        num_data as usize,
        num_parity as usize,
    )?;
    info!(
        bytes = report.bytes_read,
        stripes = report.stripes,
        files = report.shard_files,
        "shard set written"
    );
    Ok(())
}

fn decode(args: &Args) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match shard::decode_stream(&args.stub, &mut out)? {
        DecodeOutcome::Stream { bytes_written } => {
            info!(bytes = bytes_written, "stream reconstructed");
        }
        DecodeOutcome::PayloadWritten { dest, bytes } => {
            eprintln!("wrote all {bytes} bytes of embedded archive data to {dest}");
        }
    }
    Ok(())
}

// =============================================================================
// Logging and diagnostics
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // Standard output carries the decoded stream; logs go to stderr
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(io::stderr))
        .init();
}

fn enable_dumps(stub: &str) -> Result<()> {
    let base = shard::manifest::base_name(stub);
    let mut table_file = File::create(format!("{base}.gfa"))?;
    gfm::galois().dump_tables(&mut table_file)?;
    diag::enable(&format!("{base}.gfm"))?;
    Ok(())
}

//! lrucount - pass the first N occurrences of each line
//!
//! Reads lines from the given files (or stdin) and tracks how often each
//! distinct line has been seen in a bounded LRU of counters. Useful for
//! de-duplicating noisy logs without unbounded memory.

mod filter;

use anyhow::{Context, Result};
use clap::Parser;
use lrucounter::CounterCache;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::filter::{LineFilter, Mode};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Maximum number of distinct lines tracked at once
    #[arg(short, long, default_value_t = lrucounter::DEFAULT_CAPACITY)]
    capacity: usize,

    /// Occurrences of a line allowed per window
    #[arg(short, long, default_value_t = 1)]
    max: u64,

    /// Window length in milliseconds (0 = a blocked line stays blocked)
    #[arg(short, long, default_value_t = 0)]
    window_ms: u64,

    /// What to print for each line
    #[arg(long, value_enum, default_value_t = Mode::Filter)]
    mode: Mode,

    /// Print a JSON summary to stderr at end of input
    #[arg(long)]
    stats: bool,

    /// Input files (stdin when none are given)
    files: Vec<PathBuf>,
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays clean for filtered lines.
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(env_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .init();

    let args = Args::parse();
    debug!(?args, "parsed arguments");

    let window = Duration::from_millis(args.window_ms);
    let cache = CounterCache::builder()
        .capacity(args.capacity)
        .window(window)
        .on_evict(|line: Vec<u8>, count| {
            debug!(line = %String::from_utf8_lossy(&line), count, "line evicted");
        })
        .build()
        .context("invalid cache configuration")?;

    let filter = LineFilter::new(cache, args.max, args.mode);
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    if args.files.is_empty() {
        filter.process(io::stdin().lock(), &mut out)?;
    } else {
        for path in &args.files {
            info!("Reading {}", path.display());
            let file = File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            filter.process(BufReader::new(file), &mut out)?;
        }
    }
    out.flush().context("failed to flush output")?;

    let summary = filter.summary();
    info!(
        lines = summary.lines,
        blocked = summary.blocked,
        evictions = summary.evictions,
        "Input finished"
    );
    if args.stats {
        eprintln!("{}", serde_json::to_string(&summary)?);
    }

    Ok(())
}

/// `RUST_LOG` when set and valid, otherwise warnings only
fn env_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"))
}

//! Command-line interface for cwalk.
//!
//! Walks a directory tree concurrently, counting directories, files and errors, and
//! optionally repeats the count with a single-threaded walk for comparison.

use clap::{Parser, ValueEnum};
use cwalk::{Visit, WalkBuilder, WalkError, WalkStats, Walker};
use serde::Serialize;
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::process::exit;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// cwalk — concurrent directory traversal timer
#[derive(Parser)]
#[command(name = "cwalk", version, about, long_about = None)]
struct Cli {
    /// Root directory (default current dir)
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Worker threads (default: number of CPUs)
    #[arg(long)]
    workers: Option<usize>,

    /// Job queue capacity (default: worker count)
    #[arg(long)]
    buffer_size: Option<usize>,

    /// Follow symlinks that point to directories
    #[arg(short = 'f', long)]
    follow_symlinks: bool,

    /// Artificial per-entry processing time in milliseconds
    #[arg(short = 't', long, default_value_t = 0)]
    delay_ms: u64,

    /// Also run a single-threaded walk of the same tree
    #[arg(long)]
    compare: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Log walker internals to stderr (requires the `logging` feature)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Counts entries the way every walk in this tool reports them.
#[derive(Default)]
struct Counter {
    dirs: AtomicU64,
    files: AtomicU64,
    errors: AtomicU64,
    delay: Duration,
}

impl Counter {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    fn record(&self, metadata: Result<&Metadata, &io::Error>) {
        match metadata {
            Ok(m) if m.is_dir() => self.dirs.fetch_add(1, Ordering::Relaxed),
            Ok(_) => self.files.fetch_add(1, Ordering::Relaxed),
            Err(_) => self.errors.fetch_add(1, Ordering::Relaxed),
        };
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
    }
}

#[derive(Serialize)]
struct Report {
    name: &'static str,
    elapsed_ms: u128,
    directories: u64,
    files: u64,
    errors: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<WalkStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<String>,
}

impl Report {
    fn new(name: &'static str, counter: Counter, elapsed: Duration) -> Self {
        Self {
            name,
            elapsed_ms: elapsed.as_millis(),
            directories: counter.dirs.into_inner(),
            files: counter.files.into_inner(),
            errors: counter.errors.into_inner(),
            stats: None,
            failure: None,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let delay = Duration::from_millis(cli.delay_ms);
    let mut reports = vec![run_concurrent(&cli, delay)];
    if cli.compare {
        reports.push(run_sequential(&cli.root, delay));
    }

    output_reports(&reports, cli.format);
    if reports.iter().any(|r| r.failure.is_some()) {
        exit(1);
    }
}

#[cfg(feature = "logging")]
fn init_logging(verbose: bool) {
    if verbose {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("cwalk=debug"))
            .with_writer(io::stderr)
            .init();
    }
}

#[cfg(not(feature = "logging"))]
fn init_logging(verbose: bool) {
    if verbose {
        eprintln!("Warning: built without the `logging` feature, --verbose has no effect");
    }
}

fn run_concurrent(cli: &Cli, delay: Duration) -> Report {
    let mut builder = WalkBuilder::new(&cli.root).follow_symlinks(cli.follow_symlinks);
    if let Some(workers) = cli.workers {
        builder = builder.workers(workers);
        if cli.buffer_size.is_none() {
            builder = builder.buffer_size(workers);
        }
    }
    if let Some(size) = cli.buffer_size {
        builder = builder.buffer_size(size);
    }
    let mut walker = Walker::new(builder.build());

    let counter = Counter::new(delay);
    let start = Instant::now();
    let result = walker.run(|_: &Path, metadata: io::Result<Metadata>| {
        counter.record(metadata.as_ref());
        Visit::Continue
    });
    let mut report = Report::new("concurrent", counter, start.elapsed());
    report.stats = Some(walker.stats());
    report.failure = result.err().map(|e: WalkError| e.to_string());
    report
}

/// Single-threaded baseline, with every ignore filter switched off.
fn run_sequential(root: &Path, delay: Duration) -> Report {
    let counter = Counter::new(delay);
    let start = Instant::now();
    let mut failures = Vec::new();
    for entry in ignore::WalkBuilder::new(root).standard_filters(false).build() {
        match entry {
            Ok(entry) => match entry.metadata() {
                Ok(m) => counter.record(Ok(&m)),
                Err(e) => {
                    let e = io::Error::other(e.to_string());
                    counter.record(Err(&e));
                }
            },
            Err(e) => {
                let e = io::Error::other(e.to_string());
                counter.record(Err(&e));
                failures.push(e.to_string());
            }
        }
    }
    let mut report = Report::new("sequential", counter, start.elapsed());
    if !failures.is_empty() {
        report.failure = Some(failures.join("\n"));
    }
    report
}

fn output_reports(reports: &[Report], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(reports).unwrap_or_else(|e| {
                eprintln!("JSON serialization error: {}", e);
                exit(1);
            });
            println!("{}", json);
        }
        OutputFormat::Text => {
            for report in reports {
                println!("{} walk done in {} ms", report.name, report.elapsed_ms);
                println!("\t{} directories found", report.directories);
                println!("\t{} files found", report.files);
                println!("\t{} errors found", report.errors);
                if let Some(stats) = report.stats {
                    println!(
                        "\t{} jobs queued, {} run inline",
                        stats.queued, stats.inline
                    );
                }
                if let Some(failure) = &report.failure {
                    println!("\nErrors:\n{}\n", failure);
                }
            }
        }
    }
}

//! magicfile - Report file types, MIME types and encodings
//!
//! This tool runs libmagic against files, directory trees or standard input
//! and prints a textual description, the MIME type and the character
//! encoding of each input.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, ValueEnum};
use magicfile_core::{Characteristics, Check, Detector, DetectorConfig, DEFAULT_MAX_STREAM_BYTES};
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Report file types, MIME types and encodings using libmagic
#[derive(Parser, Debug)]
#[command(name = "magicfile")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    input: InputMode,

    /// Checks to run (repeatable; default: all)
    #[arg(short, long = "check", value_enum)]
    checks: Vec<CheckArg>,

    /// Compiled signature database to load instead of the default
    #[arg(long, env = "MAGICFILE_DATABASE")]
    database: Option<PathBuf>,

    /// Maximum number of bytes read from standard input
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_STREAM_BYTES,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    max_stream_bytes: usize,

    /// Output format
    #[arg(long, value_enum, default_value = "report")]
    format: OutputFormat,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Path to a single file to characterize
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to a directory whose files are characterized recursively
    #[arg(short, long)]
    directory: Option<PathBuf>,

    /// Characterize the bytes read from standard input
    #[arg(long)]
    stdin: bool,
}

/// Check selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CheckArg {
    /// Free-text description
    Text,
    /// MIME type
    Mime,
    /// Character encoding
    Encoding,
}

impl From<CheckArg> for Check {
    fn from(arg: CheckArg) -> Self {
        match arg {
            CheckArg::Text => Check::Text,
            CheckArg::Mime => Check::MimeType,
            CheckArg::Encoding => Check::Encoding,
        }
    }
}

/// Output format for results
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// One labelled line per check
    Report,
    /// One tab-separated line per input (for scripting)
    Line,
}

#[derive(Default)]
struct RunStats {
    characterized: usize,
    failed: usize,
}

impl Cli {
    /// Selected checks, deduplicated, in display order
    fn selected_checks(&self) -> Vec<Check> {
        if self.checks.is_empty() {
            return Check::ALL.to_vec();
        }
        let selected: BTreeSet<Check> = self.checks.iter().copied().map(Check::from).collect();
        selected.into_iter().collect()
    }

    fn detector(&self) -> Detector {
        let mut config = DetectorConfig::new().max_stream_bytes(self.max_stream_bytes);
        if let Some(ref database) = self.database {
            config = config.database(database);
        }
        Detector::with_config(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let detector = cli.detector();
    let checks = cli.selected_checks();

    // Dispatch based on input mode
    if let Some(ref file) = cli.input.file {
        process_single_file(&cli, &detector, &checks, file)
    } else if let Some(ref directory) = cli.input.directory {
        process_directory(&cli, &detector, &checks, directory)
    } else if cli.input.stdin {
        process_stdin(&cli, &detector, &checks)
    } else {
        bail!("One of --file, --directory or --stdin must be specified")
    }
}

/// Characterize a single file
fn process_single_file(
    cli: &Cli,
    detector: &Detector,
    checks: &[Check],
    file: &Path,
) -> Result<()> {
    if !file.exists() {
        bail!("Input file does not exist: {}", file.display());
    }

    let results = detector
        .characterize_path(checks.iter().copied(), file)
        .with_context(|| format!("Failed to characterize {}", file.display()))?;

    print!("{}", render(cli.format, &file.display().to_string(), &results));
    Ok(())
}

/// Characterize every file below a directory
fn process_directory(
    cli: &Cli,
    detector: &Detector,
    checks: &[Check],
    directory: &Path,
) -> Result<()> {
    if !directory.exists() {
        bail!("Directory does not exist: {}", directory.display());
    }
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());

    let mut stats = RunStats::default();

    for entry in WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        if is_hidden(path) {
            trace!("Skipping hidden file: {}", path.display());
            continue;
        }

        debug!("Characterizing {}", path.display());
        match detector.characterize_path(checks.iter().copied(), path) {
            Ok(results) => {
                print!("{}", render(cli.format, &path.display().to_string(), &results));
                stats.characterized += 1;
            }
            Err(e) => {
                // Log error but continue with other files
                warn!("Error characterizing {}: {}", path.display(), e);
                stats.failed += 1;
            }
        }
    }

    info!(
        "Summary: {} characterized, {} failed",
        stats.characterized, stats.failed
    );

    Ok(())
}

/// Characterize the head of standard input
fn process_stdin(cli: &Cli, detector: &Detector, checks: &[Check]) -> Result<()> {
    let results = detector
        .characterize_reader(checks.iter().copied(), io::stdin().lock())
        .context("Failed to characterize standard input")?;

    print!("{}", render(cli.format, "-", &results));
    Ok(())
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

fn label(check: Check) -> &'static str {
    match check {
        Check::Text => "Textual representation",
        Check::MimeType => "Magic mime type",
        Check::Encoding => "Encoding",
    }
}

/// Format the results for one input
fn render(format: OutputFormat, name: &str, results: &Characteristics) -> String {
    match format {
        OutputFormat::Report => {
            let mut out = format!("Characteristics for: {}\n", name);
            for (check, value) in results {
                out.push_str(&format!("{}: {}\n", label(*check), value));
            }
            out
        }
        OutputFormat::Line => {
            let mut fields = vec![name.to_string()];
            fields.extend(results.values().cloned());
            format!("{}\n", fields.join("\t"))
        }
    }
}

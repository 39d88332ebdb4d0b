//! Command-line interface definitions for dupsift.
//!
//! # Example
//!
//! ```bash
//! # Find duplicates under ~/Downloads
//! dupsift ~/Downloads
//!
//! # Hash the first two 1 MiB pieces instead of one 512 KiB piece
//! dupsift ~/Downloads --piece-size 1MiB --piece-count 2
//!
//! # Presume size+mtime matches are duplicates, then audit that presumption
//! dupsift ~/Downloads --quickstat --verify --dump-tainted
//!
//! # Machine-readable report, stopping after 100k entries
//! dupsift ~/Downloads --output json --limit 100000
//! ```

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Staged duplicate file finder.
///
/// Files are compared by size, then by an xxHash64 fingerprint of their
/// leading bytes, then by a fingerprint of their whole content. Each stage
/// only looks at files the previous one could not rule out.
#[derive(Debug, Parser)]
#[command(name = "dupsift")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to scan
    pub path: PathBuf,

    /// Stop traversal after observing this many entries
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Ignore files smaller than this (e.g. 1, 4KiB, 1MB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub min_size: Option<u64>,

    /// Piece size for the prefix stage (e.g. 512KiB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub piece_size: Option<u64>,

    /// Number of leading pieces hashed by the prefix stage
    #[arg(long, value_name = "N")]
    pub piece_count: Option<u64>,

    /// Worker threads per hashing stage
    #[arg(long, value_name = "N")]
    pub io_threads: Option<usize>,

    /// Follow symbolic links during traversal
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Presume files with equal size and mtime are duplicates (unverified)
    #[arg(long)]
    pub quickstat: bool,

    /// Full-hash quickstat groups and report how often the presumption holds
    #[arg(long)]
    pub verify: bool,

    /// Print every member's fingerprint for groups that fail verification
    #[arg(long)]
    pub dump_tainted: bool,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors and the report
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,

    /// Disable progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Print errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,
}

/// Report format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report
    #[default]
    Text,
    /// JSON document
    Json,
}

/// Parse a human-readable size.
///
/// Accepts plain bytes or a decimal (`KB`, `MB`, ...) or binary (`KiB`,
/// `MiB`, ...) suffix, case-insensitively. Fractions are allowed.
///
/// # Errors
///
/// Returns a message for empty input, a bad number, or an unknown suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}

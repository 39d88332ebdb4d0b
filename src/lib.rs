//! dupsift - staged duplicate file finder
//!
//! Finds byte-identical files under a directory while reading as little as
//! possible: files are first grouped by size, then by an xxHash64
//! fingerprint of their leading bytes, and only the survivors are hashed in
//! full. An optional quickstat mode presumes that files with equal size and
//! modification time are duplicates, and `--verify` measures how often that
//! presumption is wrong.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Context;

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use cli::{Cli, OutputFormat};
use config::Config;
use duplicates::{DuplicateFinder, RunMode};
use error::ExitCode;
use output::{JsonOutput, TextReport};
use progress::Progress;

/// Run the application for parsed arguments.
///
/// # Errors
///
/// Returns configuration errors before any traversal, and finder errors
/// (missing root, interruption) from the scan itself. Per-file read failures
/// are not errors; they appear in the report.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let mode = RunMode::from_flags(cli.quickstat, cli.verify, cli.dump_tainted)?;
    let config = resolve_config(&cli)?;
    log::debug!("Effective configuration: {:?}", config);

    let handler = signal::install_handler();
    let show_progress = !(cli.quiet || cli.no_progress || cli.output == OutputFormat::Json);
    let progress = Arc::new(Progress::new(!show_progress));

    let finder_config = config
        .finder_config(mode)
        .with_shutdown_flag(handler.get_flag())
        .with_progress_callback(progress);
    let finder = DuplicateFinder::new(finder_config);

    let report = finder
        .find_duplicates(&cli.path)
        .with_context(|| format!("Failed to scan {}", cli.path.display()))?;

    let exit_code = ExitCode::Success;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.output {
        OutputFormat::Text => TextReport::new(!cli.no_color).write_to(&report, &mut out)?,
        OutputFormat::Json => JsonOutput::new(&report, exit_code).write_to(&mut out, true)?,
    }
    out.flush()?;

    Ok(exit_code)
}

/// Layer CLI flags over the loaded configuration and validate the result.
fn resolve_config(cli: &Cli) -> Result<Config, config::ConfigError> {
    let mut config = Config::load(cli.config.as_deref())?;

    if let Some(min_size) = cli.min_size {
        config.min_size = min_size;
    }
    if let Some(piece_size) = cli.piece_size {
        config.piece_size = piece_size;
    }
    if let Some(piece_count) = cli.piece_count {
        config.piece_count = piece_count;
    }
    if let Some(io_threads) = cli.io_threads {
        config.io_threads = io_threads;
    }
    if cli.limit.is_some() {
        config.limit = cli.limit;
    }
    if cli.follow_symlinks {
        config.follow_symlinks = true;
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::try_parse_from([
            "dupsift",
            "/tmp",
            "--min-size",
            "0",
            "--piece-count",
            "3",
            "--limit",
            "10",
            "--follow-symlinks",
        ])
        .unwrap();
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.min_size, 0);
        assert_eq!(config.piece_count, 3);
        assert_eq!(config.limit, Some(10));
        assert!(config.follow_symlinks);
    }

    #[test]
    fn test_zero_io_threads_is_rejected() {
        let cli = Cli::try_parse_from(["dupsift", "/tmp", "--io-threads", "0"]).unwrap();
        assert!(matches!(
            resolve_config(&cli),
            Err(config::ConfigError::InvalidValue { field: "io_threads", .. })
        ));
    }

    #[test]
    fn test_invalid_mode_is_usage_error() {
        let cli = Cli::try_parse_from(["dupsift", "/tmp", "--verify", "--quiet"]).unwrap();
        let err = run_app(cli).unwrap_err();
        assert_eq!(ExitCode::for_error(&err), ExitCode::UsageError);
    }
}

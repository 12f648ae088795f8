//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation.

use clap::Parser;
use std::path::PathBuf;

/// ShardMerge - merge sharded JSON test reports into one
///
/// Reads `<INPUT_DIR>/<shard>/<SHARD_FILE_NAME>` for every shard directory,
/// concatenates suites and errors, sums the test counters and keeps the
/// longest shard duration.
///
/// Examples:
///   shardmerge ./blob-reports results.json ./merged.json
///   shardmerge ./blob-reports results.json ./merged.json --fail-on-unexpected
///   shardmerge ./blob-reports results.json ./merged.json --dry-run
///   shardmerge --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory containing one subdirectory per shard
    #[arg(value_name = "INPUT_DIR", required_unless_present = "init_config")]
    pub input_dir: Option<PathBuf>,

    /// File name of the report inside each shard directory
    #[arg(value_name = "SHARD_FILE_NAME", required_unless_present = "init_config")]
    pub shard_file_name: Option<String>,

    /// Destination path for the merged report
    #[arg(value_name = "OUTPUT_FILE", required_unless_present = "init_config")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .shardmerge.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only, no summary)
    #[arg(short, long)]
    pub quiet: bool,

    /// Treat plain files in the input directory as shard names too
    #[arg(long)]
    pub include_files: bool,

    /// Keep the directory listing order instead of sorting by name
    #[arg(long)]
    pub no_sort: bool,

    /// Exit with code 2 if the merged report has unexpected results
    ///
    /// The merged report is still written.
    #[arg(long)]
    pub fail_on_unexpected: bool,

    /// Dry run: list the shard reports that would be merged and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .shardmerge.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        let input_dir = self
            .input_dir
            .as_ref()
            .ok_or_else(|| "Missing INPUT_DIR".to_string())?;
        if !input_dir.exists() {
            return Err(format!(
                "Input directory does not exist: {}",
                input_dir.display()
            ));
        }
        if !input_dir.is_dir() {
            return Err(format!(
                "Input path is not a directory: {}",
                input_dir.display()
            ));
        }

        match self.shard_file_name.as_deref() {
            None | Some("") => return Err("SHARD_FILE_NAME must not be empty".to_string()),
            _ => {}
        }

        match self.output.as_ref() {
            Some(output) if !output.as_os_str().is_empty() => {}
            _ => return Err("OUTPUT_FILE must not be empty".to_string()),
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

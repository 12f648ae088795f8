//! Configuration file handling.
//!
//! This module handles loading `.shardmerge.toml` files and merging them
//! with command-line flags.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the current directory.
pub const CONFIG_FILE_NAME: &str = ".shardmerge.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Shard enumeration settings.
    #[serde(default)]
    pub scan: ScanConfig,

    /// Merged report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// How shard entries are enumerated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Treat plain files in the input directory as shard names.
    #[serde(default)]
    pub include_files: bool,

    /// Sort entries by name so output is stable across platforms.
    #[serde(default = "default_true")]
    pub sort_entries: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            include_files: false,
            sort_entries: true,
        }
    }
}

/// Merged report settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Exit with code 2 when the merged report has unexpected results.
    #[serde(default)]
    pub fail_on_unexpected: bool,
}

impl ReportConfig {
    /// Whether a written report should still fail the run (exit code 2).
    pub fn should_fail(&self, stats: &crate::models::MergedStats) -> bool {
        self.fail_on_unexpected && stats.unexpected > 0
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.shardmerge.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Flags only ever switch settings on; the file cannot be overridden
    /// back to defaults from the command line.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if args.include_files {
            self.scan.include_files = true;
        }
        if args.no_sort {
            self.scan.sort_entries = false;
        }
        if args.fail_on_unexpected {
            self.report.fail_on_unexpected = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

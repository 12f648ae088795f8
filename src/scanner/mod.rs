//! Shard discovery.
//!
//! Lists the immediate entries of the input directory and locates the
//! shard report file inside each of them. Nothing below the first level
//! is visited.

use crate::error::{MergeError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Options controlling how shard entries are enumerated.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Treat non-directory entries as shard names too.
    pub include_files: bool,
    /// Sort entries by file name instead of using raw listing order.
    pub sort_entries: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            include_files: false,
            sort_entries: true,
        }
    }
}

impl From<&crate::config::ScanConfig> for ScanOptions {
    fn from(config: &crate::config::ScanConfig) -> Self {
        Self {
            include_files: config.include_files,
            sort_entries: config.sort_entries,
        }
    }
}

/// A located shard report file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardFile {
    /// Entry name inside the input directory.
    pub shard: String,
    /// Full path to the report file.
    pub path: PathBuf,
}

/// Result of a discovery pass.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Shards whose report file exists, in enumeration order.
    pub shards: Vec<ShardFile>,
    /// Entries that had no report file.
    pub skipped: Vec<String>,
}

/// Scanner over the shard entries of one input directory.
pub struct ShardScanner {
    input_dir: PathBuf,
    shard_file_name: String,
    options: ScanOptions,
}

impl ShardScanner {
    /// Create a new scanner.
    pub fn new(input_dir: PathBuf, shard_file_name: String, options: ScanOptions) -> Self {
        Self {
            input_dir,
            shard_file_name,
            options,
        }
    }

    /// List shard entry names in enumeration order.
    pub fn entries(&self) -> Result<Vec<String>> {
        let metadata = fs::metadata(&self.input_dir).map_err(|source| MergeError::InputDir {
            path: self.input_dir.clone(),
            source,
        })?;

        if !metadata.is_dir() {
            return Err(MergeError::Configuration(format!(
                "input path is not a directory: {}",
                self.input_dir.display()
            )));
        }

        let mut walker = WalkDir::new(&self.input_dir).min_depth(1).max_depth(1);
        if self.options.sort_entries {
            walker = walker.sort_by_file_name();
        }

        let mut names = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| self.walk_error(e))?;
            let name = entry.file_name().to_string_lossy().to_string();

            // Follows symlinks, so a link to a shard directory still counts.
            if !self.options.include_files && !entry.path().is_dir() {
                debug!("Ignoring non-directory entry: {}", name);
                continue;
            }

            names.push(name);
        }

        Ok(names)
    }

    /// Locate the report file in every shard entry.
    pub fn discover(&self) -> Result<Discovery> {
        let mut discovery = Discovery::default();

        for name in self.entries()? {
            let path = self.shard_path(&name);
            if path.exists() {
                debug!("Found shard report: {}", path.display());
                discovery.shards.push(ShardFile { shard: name, path });
            } else {
                debug!("No {} in {}, skipping", self.shard_file_name, name);
                discovery.skipped.push(name);
            }
        }

        Ok(discovery)
    }

    /// Candidate report path for a shard entry.
    pub fn shard_path(&self, shard: &str) -> PathBuf {
        self.input_dir.join(shard).join(&self.shard_file_name)
    }

    /// The directory being scanned.
    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    fn walk_error(&self, err: walkdir::Error) -> MergeError {
        let path = err
            .path()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.input_dir.clone());
        let message = err.to_string();
        let source = err
            .into_io_error()
            .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, message));

        MergeError::InputDir { path, source }
    }
}

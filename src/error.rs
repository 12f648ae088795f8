//! Error types for shard merging.
//!
//! Every variant is fatal: nothing is retried and no partial output is
//! written.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while discovering, merging or writing shard reports.
#[derive(Debug, Error)]
pub enum MergeError {
    /// Invalid arguments or configuration values.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The input directory is missing or cannot be listed.
    #[error("configuration error: cannot read input directory {}", .path.display())]
    InputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A shard file exists but could not be read.
    #[error("I/O error: failed to read shard file {}", .path.display())]
    ReadShard {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A shard file is not valid JSON or does not have the expected shape.
    #[error("parse error: invalid shard report {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The merged result could not be serialized.
    #[error("serialization error: failed to encode merged report")]
    Serialize(#[from] serde_json::Error),

    /// The merged report could not be written to the output path.
    #[error("I/O error: failed to write merged report {}", .path.display())]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MergeError {
    /// Short name of the error kind, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            MergeError::Configuration(_) | MergeError::InputDir { .. } => "configuration",
            MergeError::Parse { .. } => "parse",
            MergeError::ReadShard { .. }
            | MergeError::WriteOutput { .. }
            | MergeError::Serialize(_) => "io",
        }
    }
}

/// Result alias for merge operations.
pub type Result<T> = std::result::Result<T, MergeError>;

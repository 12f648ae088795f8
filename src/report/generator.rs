//! Merged report generation.
//!
//! Serializes the merged result as pretty-printed JSON and writes it to
//! disk, and renders the console summary shown after a merge.

use crate::error::{MergeError, Result};
use crate::merge::MergeOutcome;
use crate::models::MergedResult;
use crate::scanner::Discovery;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Generate the merged JSON report (2-space indent, no trailing newline).
pub fn generate_json_report(merged: &MergedResult) -> Result<String> {
    serde_json::to_string_pretty(merged).map_err(Into::into)
}

/// Write the merged report to `path`, replacing any existing file.
///
/// The content goes to a temporary file in the same directory first and is
/// then renamed over the target, so a failed write never leaves a
/// truncated report behind. An existing report keeps its permissions; a new
/// one is created world-readable (0644 on Unix).
pub fn write_merged(merged: &MergedResult, path: &Path) -> Result<()> {
    let content = generate_json_report(merged)?;
    let write_err = |source: std::io::Error| MergeError::WriteOutput {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(parent).map_err(write_err)?;
    file.write_all(content.as_bytes()).map_err(write_err)?;
    file.flush().map_err(write_err)?;
    if let Some(permissions) = output_permissions(path) {
        file.as_file()
            .set_permissions(permissions)
            .map_err(write_err)?;
    }
    file.persist(path).map_err(|e| write_err(e.error))?;

    debug!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

/// Permissions the written report should end up with.
fn output_permissions(path: &Path) -> Option<fs::Permissions> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => Some(metadata.permissions()),
        _ => default_permissions(),
    }
}

#[cfg(unix)]
fn default_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<fs::Permissions> {
    None
}

/// Generate a text summary of a merge run.
pub fn generate_summary_text(outcome: &MergeOutcome, output: &Path) -> String {
    let stats = &outcome.merged.stats;
    let mut lines = Vec::new();

    lines.push("📊 Merge Summary:".to_string());
    lines.push(format!("   Shards merged: {}", outcome.shards_merged));
    if !outcome.skipped.is_empty() {
        lines.push(format!(
            "   Skipped (no report): {}",
            outcome.skipped.join(", ")
        ));
    }
    lines.push(format!(
        "   Tests: {} | Suites: {} | Errors: {}",
        stats.total(),
        outcome.merged.suites.len(),
        outcome.merged.errors.len()
    ));
    lines.push(format!(
        "   ✅ Expected: {} | ⏭️  Skipped: {} | ❌ Unexpected: {} | 🔁 Flaky: {}",
        stats.expected, stats.skipped, stats.unexpected, stats.flaky
    ));
    lines.push(format!("   Duration: {:.1}s", stats.duration / 1000.0));
    lines.push(format!("\n✅ Merged report saved to: {}", output.display()));

    lines.join("\n")
}

/// Generate the listing shown by a dry run.
pub fn generate_dry_run_text(discovery: &Discovery, shard_file_name: &str, output: &Path) -> String {
    let mut lines = Vec::new();

    if discovery.shards.is_empty() {
        lines.push("   No shard reports found.".to_string());
    } else {
        lines.push(format!(
            "   Found {} shard report(s) that would be merged:\n",
            discovery.shards.len()
        ));
        for shard in &discovery.shards {
            lines.push(format!("     📄 {}", shard.path.display()));
        }
    }

    for name in &discovery.skipped {
        lines.push(format!("     ⏭️  {} (no {})", name, shard_file_name));
    }

    lines.push(format!(
        "\n✅ Dry run complete. {} was not written.",
        output.display()
    ));

    lines.join("\n")
}

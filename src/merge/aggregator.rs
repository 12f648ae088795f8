//! Shard aggregation.
//!
//! Suites and errors are concatenated in enumeration order, counters are
//! summed and the merged duration is the longest shard duration, since
//! shards run in parallel.

use crate::error::{MergeError, Result};
use crate::models::{MergedResult, ShardResult};
use crate::report;
use crate::scanner::{ScanOptions, ShardFile, ShardScanner};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Everything a merge run needs, built once at startup.
#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// Directory holding one entry per shard.
    pub input_dir: PathBuf,
    /// File name looked up inside each shard entry.
    pub shard_file_name: String,
    /// Destination of the merged report.
    pub output: PathBuf,
    /// Enumeration options.
    pub scan: ScanOptions,
}

impl MergeConfig {
    /// Reject shard file names that are not a single path component.
    pub fn validate(&self) -> Result<()> {
        let name = self.shard_file_name.as_str();

        if name.is_empty() {
            return Err(MergeError::Configuration(
                "shard file name must not be empty".to_string(),
            ));
        }

        if name == "." || name == ".." || name.contains('/') || name.contains('\\') {
            return Err(MergeError::Configuration(format!(
                "shard file name must be a plain file name: {}",
                name
            )));
        }

        if self.output.as_os_str().is_empty() {
            return Err(MergeError::Configuration(
                "output path must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Scanner over this configuration's input directory.
    pub fn scanner(&self) -> ShardScanner {
        ShardScanner::new(
            self.input_dir.clone(),
            self.shard_file_name.clone(),
            self.scan.clone(),
        )
    }
}

/// Running accumulator for one merge pass.
#[derive(Debug, Default)]
pub struct Aggregator {
    merged: MergedResult,
    durations: Vec<f64>,
    shards_merged: usize,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one shard into the running result.
    pub fn absorb(&mut self, shard: ShardResult) {
        self.shards_merged += 1;

        if let Some(suites) = shard.suites {
            self.merged.suites.extend(suites);
        }

        if let Some(errors) = shard.errors {
            self.merged.errors.extend(errors);
        }

        if let Some(stats) = shard.stats {
            let totals = &mut self.merged.stats;
            totals.expected = totals.expected.saturating_add(stats.expected.unwrap_or(0));
            totals.skipped = totals.skipped.saturating_add(stats.skipped.unwrap_or(0));
            totals.unexpected = totals
                .unexpected
                .saturating_add(stats.unexpected.unwrap_or(0));
            totals.flaky = totals.flaky.saturating_add(stats.flaky.unwrap_or(0));
            self.durations.push(stats.duration.unwrap_or(0.0));
        }
    }

    /// Number of shards absorbed so far.
    pub fn shards_merged(&self) -> usize {
        self.shards_merged
    }

    /// Number of absorbed shards that carried a stats block.
    pub fn shards_with_stats(&self) -> usize {
        self.durations.len()
    }

    /// Compute the merged duration and return the result.
    ///
    /// With no stats blocks seen the duration is 0.
    pub fn finish(mut self) -> MergedResult {
        self.merged.stats.duration = match max_duration(&self.durations) {
            Some(max) => max,
            None => {
                warn!("No shard reported stats; merged duration set to 0");
                0.0
            }
        };
        self.merged
    }
}

fn max_duration(durations: &[f64]) -> Option<f64> {
    durations.iter().copied().reduce(f64::max)
}

/// Outcome of a merge run.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub merged: MergedResult,
    /// Shards whose report was merged.
    pub shards_merged: usize,
    /// Entries that had no report file.
    pub skipped: Vec<String>,
}

/// Read and parse one shard report.
pub fn load_shard(path: &Path) -> Result<ShardResult> {
    let content = fs::read_to_string(path).map_err(|source| MergeError::ReadShard {
        path: path.to_path_buf(),
        source,
    })?;

    ShardResult::from_json(&content).map_err(|source| MergeError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Merge every shard under the input directory without writing anything.
pub fn aggregate(config: &MergeConfig) -> Result<MergeOutcome> {
    config.validate()?;

    let discovery = config.scanner().discover()?;
    info!(
        "Found {} shard report(s) in {} ({} entries without {})",
        discovery.shards.len(),
        config.input_dir.display(),
        discovery.skipped.len(),
        config.shard_file_name
    );

    let mut aggregator = Aggregator::new();
    for ShardFile { shard, path } in &discovery.shards {
        let result = load_shard(path)?;
        debug!(
            "Merging shard {}: {} suites, {} errors",
            shard,
            result.suites.as_ref().map_or(0, Vec::len),
            result.errors.as_ref().map_or(0, Vec::len)
        );
        aggregator.absorb(result);
    }

    let shards_merged = aggregator.shards_merged();
    debug!(
        "{} of {} merged shards carried stats",
        aggregator.shards_with_stats(),
        shards_merged
    );

    Ok(MergeOutcome {
        merged: aggregator.finish(),
        shards_merged,
        skipped: discovery.skipped,
    })
}

/// Merge every shard and write the result to the output path.
pub fn run_merge(config: &MergeConfig) -> Result<MergeOutcome> {
    let outcome = aggregate(config)?;
    report::write_merged(&outcome.merged, &config.output)?;
    info!("Merged report written to {}", config.output.display());
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShardStats;
    use serde_json::json;
    use tempfile::TempDir;

    fn stats(expected: u64, skipped: u64, unexpected: u64, flaky: u64, duration: f64) -> ShardStats {
        ShardStats {
            expected: Some(expected),
            skipped: Some(skipped),
            unexpected: Some(unexpected),
            flaky: Some(flaky),
            duration: Some(duration),
        }
    }

    fn shard_with_stats(stats: ShardStats) -> ShardResult {
        ShardResult {
            stats: Some(stats),
            ..Default::default()
        }
    }

    fn write_shard(root: &Path, name: &str, content: &str) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("report.json"), content).unwrap();
    }

    fn config_for(root: &Path) -> MergeConfig {
        MergeConfig {
            input_dir: root.to_path_buf(),
            shard_file_name: "report.json".to_string(),
            output: root.join("merged.json"),
            scan: ScanOptions::default(),
        }
    }

    const SHARD_A: &str = r#"{"suites":[{"title":"a1"},{"title":"a2"}],"errors":[],"stats":{"expected":10,"skipped":1,"unexpected":0,"flaky":0,"duration":5000}}"#;
    const SHARD_B: &str = r#"{"suites":[{"title":"b1"}],"errors":[{"message":"boom"}],"stats":{"expected":8,"skipped":0,"unexpected":2,"flaky":1,"duration":7000}}"#;

    #[test]
    fn test_counters_are_summed() {
        let mut agg = Aggregator::new();
        agg.absorb(shard_with_stats(stats(10, 1, 0, 0, 5000.0)));
        agg.absorb(shard_with_stats(stats(8, 0, 2, 1, 7000.0)));
        agg.absorb(shard_with_stats(stats(4, 3, 1, 2, 100.0)));

        let merged = agg.finish();
        assert_eq!(merged.stats.expected, 22);
        assert_eq!(merged.stats.skipped, 4);
        assert_eq!(merged.stats.unexpected, 3);
        assert_eq!(merged.stats.flaky, 3);
    }

    #[test]
    fn test_duration_is_max() {
        let mut agg = Aggregator::new();
        agg.absorb(shard_with_stats(stats(1, 0, 0, 0, 5000.0)));
        agg.absorb(shard_with_stats(stats(1, 0, 0, 0, 7000.0)));
        agg.absorb(shard_with_stats(stats(1, 0, 0, 0, 6000.0)));

        assert_eq!(agg.finish().stats.duration, 7000.0);
    }

    #[test]
    fn test_missing_fields_default_to_zero() {
        let mut agg = Aggregator::new();
        agg.absorb(shard_with_stats(ShardStats {
            expected: Some(3),
            skipped: Some(0),
            unexpected: Some(0),
            flaky: None,
            duration: None,
        }));

        let merged = agg.finish();
        assert_eq!(merged.stats.expected, 3);
        assert_eq!(merged.stats.flaky, 0);
        assert_eq!(merged.stats.duration, 0.0);
    }

    #[test]
    fn test_no_stats_gives_zero_duration() {
        let mut agg = Aggregator::new();
        agg.absorb(ShardResult {
            suites: Some(vec![json!({"title": "only suites"})]),
            ..Default::default()
        });

        assert_eq!(agg.shards_merged(), 1);
        assert_eq!(agg.shards_with_stats(), 0);
        let merged = agg.finish();
        assert_eq!(merged.stats.duration, 0.0);
        assert_eq!(merged.stats.total(), 0);
        assert_eq!(merged.suites.len(), 1);
    }

    #[test]
    fn test_concatenation_preserves_order() {
        let mut agg = Aggregator::new();
        agg.absorb(ShardResult {
            suites: Some(vec![json!("a1"), json!("a2")]),
            errors: Some(vec![json!("ea")]),
            stats: None,
        });
        agg.absorb(ShardResult {
            suites: Some(vec![json!("b1")]),
            errors: None,
            stats: None,
        });
        agg.absorb(ShardResult {
            suites: Some(vec![json!("c1"), json!("c2")]),
            errors: Some(vec![json!("ec")]),
            stats: None,
        });

        let merged = agg.finish();
        assert_eq!(
            merged.suites,
            vec![json!("a1"), json!("a2"), json!("b1"), json!("c1"), json!("c2")]
        );
        assert_eq!(merged.errors, vec![json!("ea"), json!("ec")]);
    }

    #[test]
    fn test_aggregate_two_shards() {
        let dir = TempDir::new().unwrap();
        write_shard(dir.path(), "shard-a", SHARD_A);
        write_shard(dir.path(), "shard-b", SHARD_B);

        let outcome = aggregate(&config_for(dir.path())).unwrap();
        let stats = &outcome.merged.stats;
        assert_eq!(
            (stats.expected, stats.skipped, stats.unexpected, stats.flaky),
            (18, 1, 2, 1)
        );
        assert_eq!(stats.duration, 7000.0);
        assert_eq!(outcome.shards_merged, 2);
        assert_eq!(
            outcome.merged.suites,
            vec![json!({"title": "a1"}), json!({"title": "a2"}), json!({"title": "b1"})]
        );
        assert_eq!(outcome.merged.errors, vec![json!({"message": "boom"})]);
    }

    #[test]
    fn test_shard_without_report_changes_nothing() {
        let dir = TempDir::new().unwrap();
        write_shard(dir.path(), "shard-a", SHARD_A);
        write_shard(dir.path(), "shard-b", SHARD_B);
        let before = aggregate(&config_for(dir.path())).unwrap();

        fs::create_dir(dir.path().join("shard-c")).unwrap();
        let after = aggregate(&config_for(dir.path())).unwrap();

        assert_eq!(before.merged, after.merged);
        assert_eq!(after.skipped, vec!["shard-c"]);
    }

    #[test]
    fn test_partial_stats_shard_alone() {
        let dir = TempDir::new().unwrap();
        write_shard(
            dir.path(),
            "shard-d",
            r#"{"stats":{"expected":3,"skipped":0,"unexpected":0}}"#,
        );

        let merged = aggregate(&config_for(dir.path())).unwrap().merged;
        let text = serde_json::to_string(&merged.stats).unwrap();
        assert_eq!(
            text,
            r#"{"expected":3,"skipped":0,"unexpected":0,"flaky":0,"duration":0}"#
        );
    }

    #[test]
    fn test_fractional_duration_written_exactly() {
        let dir = TempDir::new().unwrap();
        write_shard(
            dir.path(),
            "shard-a",
            r#"{"suites":[{"duration":1827.8861143719582}],"stats":{"expected":1,"duration":1827.8861143719582}}"#,
        );
        write_shard(
            dir.path(),
            "shard-b",
            r#"{"stats":{"expected":1,"duration":1827.8861143719575}}"#,
        );
        let config = config_for(dir.path());

        run_merge(&config).unwrap();

        let written = fs::read_to_string(&config.output).unwrap();
        assert!(written.contains(r#""duration": 1827.8861143719582"#));
        assert!(!written.contains("1827.8861143719575"));
        assert_eq!(written.matches("1827.8861143719582").count(), 2);
    }

    #[test]
    fn test_empty_input_dir() {
        let dir = TempDir::new().unwrap();
        let outcome = aggregate(&config_for(dir.path())).unwrap();

        assert_eq!(outcome.shards_merged, 0);
        assert_eq!(outcome.merged, MergedResult::default());
    }

    #[test]
    fn test_corrupt_shard_aborts_without_output() {
        let dir = TempDir::new().unwrap();
        write_shard(dir.path(), "shard-a", SHARD_A);
        write_shard(dir.path(), "shard-b", r#"{"suites": [{"title": "#);
        let config = config_for(dir.path());

        let err = run_merge(&config).unwrap_err();
        assert!(matches!(err, MergeError::Parse { .. }));
        assert!(!config.output.exists());
    }

    #[test]
    fn test_corrupt_shard_leaves_existing_output_untouched() {
        let dir = TempDir::new().unwrap();
        write_shard(dir.path(), "shard-a", "not json");
        let config = config_for(dir.path());
        fs::write(&config.output, "previous").unwrap();

        assert!(run_merge(&config).is_err());
        assert_eq!(fs::read_to_string(&config.output).unwrap(), "previous");
    }

    #[test]
    fn test_run_merge_is_idempotent() {
        let dir = TempDir::new().unwrap();
        write_shard(dir.path(), "shard-a", SHARD_A);
        write_shard(dir.path(), "shard-b", SHARD_B);
        let mut config = config_for(dir.path());
        config.output = dir.path().join("out-1.json");
        run_merge(&config).unwrap();
        let first = fs::read(&config.output).unwrap();

        config.output = dir.path().join("out-2.json");
        run_merge(&config).unwrap();
        let second = fs::read(&config.output).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_input_dir_is_fatal() {
        let dir = TempDir::new().unwrap();
        let mut config = config_for(dir.path());
        config.input_dir = dir.path().join("nope");

        let err = run_merge(&config).unwrap_err();
        assert_eq!(err.kind(), "configuration");
        assert!(!config.output.exists());
    }

    #[test]
    fn test_validate_shard_file_name() {
        let dir = TempDir::new().unwrap();
        let mut config = config_for(dir.path());
        assert!(config.validate().is_ok());

        config.shard_file_name = String::new();
        assert!(config.validate().is_err());

        config.shard_file_name = "nested/report.json".to_string();
        assert!(config.validate().is_err());

        config.shard_file_name = "..".to_string();
        assert!(config.validate().is_err());
    }
}

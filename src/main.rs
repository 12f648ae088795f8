//! ShardMerge - merge sharded test reports
//!
//! A CLI tool that combines the JSON result files written by parallel test
//! shards into a single report: suites and errors are concatenated,
//! counters are summed and the duration is the longest shard's.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Fatal error (bad arguments, unreadable input, malformed shard, write failure)
//!   2 - Report written, but unexpected results found with --fail-on-unexpected

mod cli;
mod config;
mod error;
mod merge;
mod models;
mod report;
mod scanner;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, CONFIG_FILE_NAME};
use error::MergeError;
use merge::MergeConfig;
use scanner::ScanOptions;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: configuration error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    debug!("ShardMerge v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args) {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            let kind = e
                .downcast_ref::<MergeError>()
                .map_or("configuration", MergeError::kind);
            error!(kind, "Merge failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .shardmerge.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the merge. Returns the exit code (0 or 2).
fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    debug!("Effective config: {:?}", config);

    let merge_config = build_merge_config(&args, &config)?;

    if args.dry_run {
        return handle_dry_run(&merge_config);
    }

    let outcome = merge::run_merge(&merge_config)?;

    if !args.quiet {
        println!(
            "{}",
            report::generate_summary_text(&outcome, &merge_config.output)
        );
    }

    if config.report.should_fail(&outcome.merged.stats) {
        eprintln!(
            "\n⛔ {} unexpected result(s) in merged report. Failing (exit code 2).",
            outcome.merged.stats.unexpected
        );
        return Ok(2);
    }

    Ok(0)
}

/// Build the merge configuration record from arguments and config file.
fn build_merge_config(args: &Args, config: &Config) -> Result<MergeConfig> {
    let input_dir = args.input_dir.clone().context("Missing INPUT_DIR")?;
    let shard_file_name = args
        .shard_file_name
        .clone()
        .context("Missing SHARD_FILE_NAME")?;
    let output = args.output.clone().context("Missing OUTPUT_FILE")?;

    let merge_config = MergeConfig {
        input_dir,
        shard_file_name,
        output,
        scan: ScanOptions::from(&config.scan),
    };
    merge_config.validate()?;

    Ok(merge_config)
}

/// Handle --dry-run: discover shards, print what would be merged, exit.
fn handle_dry_run(merge_config: &MergeConfig) -> Result<i32> {
    let scanner = merge_config.scanner();
    println!(
        "\n🔍 Dry run: scanning {} for {}...\n",
        scanner.input_dir().display(),
        merge_config.shard_file_name
    );

    let discovery = scanner.discover()?;
    println!(
        "{}",
        report::generate_dry_run_text(
            &discovery,
            &merge_config.shard_file_name,
            &merge_config.output
        )
    );
    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Explicit config path must load
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}

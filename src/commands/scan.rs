//! # Scan Command Implementation
//!
//! This module implements the `scan` subcommand, which runs image detection
//! over many values files at once. Each file is an independent target; they
//! are processed on a worker pool and their registries are merged into one
//! report.
//!
//! A target that cannot be read or parsed is reported and skipped. The
//! command fails only when no target could be scanned.

use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::PathBuf;

use irr::aggregate::{scan_targets, FileSource, ScanSummary};
use irr::detector::DetectorConfig;
use irr::output::OutputConfig;

/// Scan several values files and report the registries they use
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Values files to scan, each as a separate target.
    #[arg(value_name = "TARGET", required = true)]
    pub targets: Vec<String>,

    /// Number of worker threads (0 uses one per CPU).
    #[arg(short, long, value_name = "N", default_value_t = 0)]
    pub jobs: usize,

    /// Write a registry mapping skeleton covering every registry found.
    #[arg(long, value_name = "FILE")]
    pub generate_config_skeleton: Option<PathBuf>,

    /// Skip subtrees whose path or key matches this glob.
    #[arg(long = "exclude-pattern", value_name = "GLOB")]
    pub exclude_patterns: Vec<String>,
}

/// Execute the `scan` command.
///
/// # Arguments
/// * `args` - The command arguments
/// * `color_flag` - The value of the global --color flag ("always", "never", or "auto")
pub fn execute(args: ScanArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let config = DetectorConfig {
        exclude_patterns: args.exclude_patterns,
        ..Default::default()
    };

    let summary = scan_targets(&FileSource, &args.targets, &config, args.jobs)?;
    print_summary(&out, &summary, args.targets.len());

    if let Some(path) = &args.generate_config_skeleton {
        fs::write(path, summary.skeleton().to_yaml()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        eprintln!(
            "{} Wrote mapping skeleton to {}",
            out.marker("✅", "[OK]"),
            path.display()
        );
    }

    Ok(())
}

fn print_summary(out: &OutputConfig, summary: &ScanSummary, total: usize) {
    println!(
        "{} Scanned {} targets",
        out.marker("🔍", "[SCAN]"),
        out.ratio(summary.targets.len(), total)
    );
    for report in &summary.targets {
        println!(
            "   {}: {} images, {} skipped",
            report.target, report.images, report.skipped
        );
    }
    for failure in &summary.failures {
        println!(
            "   {} {}: {}",
            out.marker("❌", "[ERR]"),
            failure.target,
            out.failure(&failure.message)
        );
    }

    println!("\n{} Registries:", out.marker("📦", "[INFO]"));
    for (registry, count) in &summary.registries {
        println!("   {} ({} images)", registry, count);
    }
}

//! # Inspect Command Implementation
//!
//! This module implements the `inspect` subcommand, a read-only view of what
//! `override` would work on: every detected image with its parsed reference,
//! every value that looked like an image but was skipped, and the set of
//! source registries.
//!
//! With `--generate-config-skeleton` it also writes a registry mapping file
//! covering every registry found, ready to be edited and passed back via
//! `override --registry-file`.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

use irr::config::MappingFile;
use irr::detector::{detect, Detection, DetectorConfig, PatternKind};
use irr::output::OutputConfig;
use irr::values::Node;

use super::write_output;

/// List the images found in values files
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Values file to read; repeat to merge several files in order.
    #[arg(short = 'f', long = "values", value_name = "FILE", required = true)]
    pub values: Vec<PathBuf>,

    /// Report format.
    #[arg(long, value_name = "FORMAT", default_value = "yaml", value_parser = ["yaml", "json"])]
    pub output_format: String,

    /// Write the report to this file instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    pub output_file: Option<PathBuf>,

    /// Also write a registry mapping skeleton to this file.
    #[arg(long, value_name = "FILE")]
    pub generate_config_skeleton: Option<PathBuf>,

    /// Only report images at or below paths matching this glob.
    #[arg(long = "include-pattern", value_name = "GLOB")]
    pub include_patterns: Vec<String>,

    /// Skip subtrees whose path or key matches this glob.
    #[arg(long = "exclude-pattern", value_name = "GLOB")]
    pub exclude_patterns: Vec<String>,

    /// Path that always holds an image.
    #[arg(long = "known-image-path", value_name = "PATH")]
    pub known_image_paths: Vec<String>,
}

#[derive(Debug, Serialize)]
struct InspectReport {
    registries: Vec<String>,
    images: Vec<ImageEntry>,
    skipped: Vec<SkipEntry>,
}

#[derive(Debug, Serialize)]
struct ImageEntry {
    path: String,
    kind: PatternKind,
    value: String,
    registry: String,
    repository: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    digest: Option<String>,
    count: usize,
}

#[derive(Debug, Serialize)]
struct SkipEntry {
    path: String,
    value: String,
    reason: String,
}

impl From<&Detection> for InspectReport {
    fn from(detection: &Detection) -> Self {
        Self {
            registries: detection.registries(),
            images: detection
                .patterns
                .iter()
                .map(|pattern| ImageEntry {
                    path: pattern.path.to_string(),
                    kind: pattern.kind,
                    value: pattern.raw_value.clone(),
                    registry: pattern.reference.registry().to_string(),
                    repository: pattern.reference.repository().to_string(),
                    tag: pattern.reference.tag().map(str::to_string),
                    digest: pattern.reference.digest().map(str::to_string),
                    count: pattern.count,
                })
                .collect(),
            skipped: detection
                .skipped
                .iter()
                .map(|record| SkipEntry {
                    path: record.path.clone(),
                    value: record.raw_value.clone(),
                    reason: record.reason.to_string(),
                })
                .collect(),
        }
    }
}

/// Execute the `inspect` command.
///
/// # Arguments
/// * `args` - The command arguments
/// * `color_flag` - The value of the global --color flag ("always", "never", or "auto")
pub fn execute(args: InspectArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);

    let values = Node::from_files(&args.values).context("Failed to load values")?;
    let config = DetectorConfig {
        include_patterns: args.include_patterns,
        exclude_patterns: args.exclude_patterns,
        known_image_paths: args.known_image_paths,
        global_registry: None,
    };
    let detection = detect(&values, &config)?;

    let report = InspectReport::from(&detection);
    let rendered = if args.output_format == "json" {
        let mut json = serde_json::to_string_pretty(&report)?;
        json.push('\n');
        json
    } else {
        serde_yaml::to_string(&report)?
    };
    write_output(args.output_file.as_deref(), &rendered)?;

    eprintln!(
        "{} Found {} images from {} registries, {} skipped",
        out.marker("🔍", "[SCAN]"),
        report.images.len(),
        report.registries.len(),
        report.skipped.len()
    );

    if let Some(path) = &args.generate_config_skeleton {
        let skeleton = MappingFile::skeleton(report.registries.iter().map(String::as_str));
        fs::write(path, skeleton.to_yaml()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        eprintln!(
            "{} Wrote mapping skeleton to {}",
            out.marker("✅", "[OK]"),
            path.display()
        );
    }

    Ok(())
}

//! # Override Command Implementation
//!
//! This module implements the `override` subcommand, which reads one or more
//! values files, detects every container image in them and writes a values
//! override pointing those images at the target registry.
//!
//! ## Functionality
//!
//! - **Values merging**: several `--values` files are merged in order, the
//!   same way `helm install -f a -f b` merges them.
//! - **Registry mapping**: a `--registry-file` can route individual source
//!   registries; its `defaultTarget` and `strictMode` apply unless overridden
//!   on the command line.
//! - **Policies**: `--strict` and `--threshold` turn skipped images into a
//!   failure. The skips are still reported before exiting.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use irr::config::{self, MappingFile};
use irr::error::Error;
use irr::generator::{generate, GeneratorConfig, OverrideResult};
use irr::output::OutputConfig;
use irr::render::{render, OutputFormat};
use irr::strategy;
use irr::values::Node;

use super::write_output;

/// Generate a values override that relocates every image
#[derive(Args, Debug)]
pub struct OverrideArgs {
    /// Values file to read; repeat to merge several files in order.
    #[arg(short = 'f', long = "values", value_name = "FILE", required = true)]
    pub values: Vec<PathBuf>,

    /// Registry that receives images without an explicit mapping.
    #[arg(short, long, value_name = "HOST", env = "IRR_TARGET_REGISTRY")]
    pub target_registry: Option<String>,

    /// Only rewrite images from these registries (comma separated).
    #[arg(long, value_name = "REGISTRIES", value_delimiter = ',')]
    pub source_registries: Vec<String>,

    /// Never rewrite images from these registries (comma separated).
    #[arg(long, value_name = "REGISTRIES", value_delimiter = ',')]
    pub exclude_registries: Vec<String>,

    /// Path strategy: prefix-source-registry or flat.
    #[arg(long, value_name = "NAME", default_value = strategy::PREFIX_SOURCE_REGISTRY)]
    pub strategy: String,

    /// Registry mapping file.
    #[arg(long, value_name = "FILE", env = "IRR_REGISTRY_FILE")]
    pub registry_file: Option<PathBuf>,

    /// Fail on the first image that cannot be rewritten.
    #[arg(long)]
    pub strict: bool,

    /// Minimum percentage of images that must be rewritten (0 disables).
    #[arg(long, value_name = "PERCENT", default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub threshold: u8,

    /// Only report images at or below paths matching this glob.
    #[arg(long = "include-pattern", value_name = "GLOB")]
    pub include_patterns: Vec<String>,

    /// Skip subtrees whose path or key matches this glob.
    #[arg(long = "exclude-pattern", value_name = "GLOB")]
    pub exclude_patterns: Vec<String>,

    /// Path that always holds an image (dot notation, `[N]` for list items).
    #[arg(long = "known-image-path", value_name = "PATH")]
    pub known_image_paths: Vec<String>,

    /// Output format: values, json or helm-set.
    #[arg(long, value_name = "FORMAT", default_value = "values")]
    pub format: OutputFormat,

    /// Write the override to this file instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    pub output_file: Option<PathBuf>,
}

/// Execute the `override` command.
///
/// # Arguments
/// * `args` - The command arguments
/// * `color_flag` - The value of the global --color flag ("always", "never", or "auto")
pub fn execute(args: OverrideArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);

    let mapping_file = match &args.registry_file {
        Some(path) => config::from_file(path)
            .with_context(|| format!("Failed to load registry file {}", path.display()))?,
        None => MappingFile::default(),
    };

    let config = generator_config(&args, mapping_file)?;
    let values = Node::from_files(&args.values).context("Failed to load values")?;

    let result = match generate(&values, &config) {
        Ok(result) => result,
        Err(err) => {
            if let Some(partial) = err.partial_result() {
                report(&out, partial);
            }
            return Err(err.into());
        }
    };

    let rendered = render(&result.values, args.format)?;
    write_output(args.output_file.as_deref(), &rendered)?;
    report(&out, &result);

    Ok(())
}

/// Combine command-line flags with the registry file; flags win.
fn generator_config(args: &OverrideArgs, mapping_file: MappingFile) -> Result<GeneratorConfig> {
    let registries = mapping_file.registries;
    let target_registry = args
        .target_registry
        .clone()
        .filter(|t| !t.trim().is_empty())
        .or(registries.default_target);

    if target_registry.is_none() && registries.mappings.is_empty() {
        return Err(Error::ConfigParse {
            message: "no target registry configured".to_string(),
            hint: Some(
                "pass --target-registry, or a --registry-file with mappings or a defaultTarget"
                    .to_string(),
            ),
        }
        .into());
    }

    Ok(GeneratorConfig {
        target_registry,
        source_registries: args.source_registries.clone(),
        exclude_registries: args.exclude_registries.clone(),
        strategy: strategy::from_name(&args.strategy)?,
        mappings: registries.mappings,
        strict_mode: args.strict || registries.strict_mode,
        threshold: args.threshold,
        include_patterns: args.include_patterns.clone(),
        exclude_patterns: args.exclude_patterns.clone(),
        known_image_paths: args.known_image_paths.clone(),
    })
}

/// Print the run summary and every skipped image to stderr.
fn report(out: &OutputConfig, result: &OverrideResult) {
    eprintln!(
        "{} Rewrote {} images ({}%)",
        out.marker("📦", "[OK]"),
        out.ratio(result.succeeded, result.processed),
        result.success_percentage()
    );
    if result.skipped.is_empty() {
        return;
    }
    eprintln!(
        "{} {} images left unchanged:",
        out.marker("⚠️", "[WARN]"),
        result.skipped.len()
    );
    for record in &result.skipped {
        eprintln!("   {} ({}): {}", record.path, record.raw_value, record.reason);
    }
}

//! Multi-target scanning
//!
//! Scans many independent targets (values files, releases) for images and
//! aggregates the registries they use, for example to bootstrap a mapping
//! file. Targets are loaded through a [`TargetSource`] and detected on a
//! bounded rayon pool; results merge into a single [`RegistryAccumulator`]
//! behind a mutex.
//!
//! A failing target is recorded and the scan moves on. The scan as a whole
//! fails only when every target failed.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use log::{debug, warn};
use rayon::prelude::*;

use crate::config::MappingFile;
use crate::detector::{detect, Detection, DetectorConfig};
use crate::error::{Error, Result};
use crate::values::Node;

/// Loads the values tree of one scan target.
pub trait TargetSource: Sync {
    fn load(&self, target: &str) -> Result<Node>;
}

/// Treats every target as the path of a values file.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSource;

impl TargetSource for FileSource {
    fn load(&self, target: &str) -> Result<Node> {
        Node::from_file(Path::new(target))
    }
}

/// What one target contributed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReport {
    pub target: String,
    /// Image count per source registry
    pub registries: BTreeMap<String, usize>,
    pub images: usize,
    pub skipped: usize,
}

/// A target that could not be scanned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFailure {
    pub target: String,
    pub message: String,
}

/// Aggregated outcome of a scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Successful targets, sorted by name
    pub targets: Vec<TargetReport>,
    /// Failed targets, sorted by name
    pub failures: Vec<TargetFailure>,
    /// Image count per source registry across all targets
    pub registries: BTreeMap<String, usize>,
}

impl ScanSummary {
    /// A mapping-file skeleton covering every registry seen.
    pub fn skeleton(&self) -> MappingFile {
        MappingFile::skeleton(self.registries.keys().map(String::as_str))
    }
}

/// Collects per-target outcomes in whatever order they finish.
#[derive(Debug, Default)]
pub struct RegistryAccumulator {
    targets: Vec<TargetReport>,
    failures: Vec<TargetFailure>,
}

impl RegistryAccumulator {
    pub fn add(&mut self, target: &str, outcome: Result<Detection>) {
        match outcome {
            Ok(detection) => {
                let mut registries = BTreeMap::new();
                for pattern in &detection.patterns {
                    *registries
                        .entry(pattern.reference.registry().to_string())
                        .or_insert(0) += 1;
                }
                debug!(
                    "Scanned {}: {} images from {} registries",
                    target,
                    detection.patterns.len(),
                    registries.len()
                );
                self.targets.push(TargetReport {
                    target: target.to_string(),
                    registries,
                    images: detection.patterns.len(),
                    skipped: detection.skipped.len(),
                });
            }
            Err(err) => {
                warn!("Failed to scan {}: {}", target, err);
                self.failures.push(TargetFailure {
                    target: target.to_string(),
                    message: err.to_string(),
                });
            }
        }
    }

    /// Merge everything added so far.
    ///
    /// Fails with [`Error::AllTargetsFailed`] when targets were added and
    /// none of them succeeded.
    pub fn summarize(mut self) -> Result<ScanSummary> {
        self.targets.sort_by(|a, b| a.target.cmp(&b.target));
        self.failures.sort_by(|a, b| a.target.cmp(&b.target));

        if self.targets.is_empty() {
            if let Some(first) = self.failures.first() {
                return Err(Error::AllTargetsFailed {
                    failed: self.failures.len(),
                    first: format!("{}: {}", first.target, first.message),
                });
            }
        }

        let mut registries = BTreeMap::new();
        for report in &self.targets {
            for (registry, count) in &report.registries {
                *registries.entry(registry.clone()).or_insert(0) += count;
            }
        }

        Ok(ScanSummary {
            targets: self.targets,
            failures: self.failures,
            registries,
        })
    }
}

/// Scan `targets` in parallel with at most `jobs` workers (0 lets rayon decide).
pub fn scan_targets<S: TargetSource>(
    source: &S,
    targets: &[String],
    config: &DetectorConfig,
    jobs: usize,
) -> Result<ScanSummary> {
    // A bad glob would fail every target the same way.
    config.validate()?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|err| Error::WorkerPool {
            message: err.to_string(),
        })?;

    let accumulator = Mutex::new(RegistryAccumulator::default());
    pool.install(|| {
        targets.par_iter().for_each(|target| {
            let outcome = source.load(target).and_then(|tree| detect(&tree, config));
            accumulator
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .add(target, outcome);
        });
    });

    accumulator
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner)
        .summarize()
}

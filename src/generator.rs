//! Override generation
//!
//! Ties detection, registry resolution and path strategies together. For
//! every detected image the generator resolves where it should go, computes
//! the new repository path and writes the rewritten value into a fresh,
//! sparse override tree at the same path as the original.
//!
//! The result keeps per-image statistics. Two policies can turn skipped
//! images into a failure:
//!
//! - **Strict mode**: the first image that could not be rewritten aborts
//!   generation.
//! - **Threshold**: after all images were handled, the percentage of
//!   rewritten images must reach the configured threshold.
//!
//! In both cases the partially generated result travels inside the error.

use log::{debug, info, warn};

use crate::detector::{self, DetectorConfig, ImagePattern, PatternKind, SkipReason, SkipRecord};
use crate::error::{Error, Result};
use crate::reference::normalize_registry;
use crate::registry::{Mapping, RegistryMapper, Resolution};
use crate::strategy::{PathStrategy, PrefixSourceRegistry};
use crate::values::Node;

/// Everything that shapes one generation run
#[derive(Debug)]
pub struct GeneratorConfig {
    /// Registry used for images without an explicit mapping.
    pub target_registry: Option<String>,
    /// When non-empty, only images from these registries are rewritten.
    pub source_registries: Vec<String>,
    /// Images from these registries are left alone (unless a mapping names them).
    pub exclude_registries: Vec<String>,
    pub strategy: Box<dyn PathStrategy>,
    pub mappings: Vec<Mapping>,
    pub strict_mode: bool,
    /// Minimum success percentage, 0 to disable.
    pub threshold: u8,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub known_image_paths: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            target_registry: None,
            source_registries: Vec::new(),
            exclude_registries: Vec::new(),
            strategy: Box::new(PrefixSourceRegistry),
            mappings: Vec::new(),
            strict_mode: false,
            threshold: 0,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            known_image_paths: Vec::new(),
        }
    }
}

impl GeneratorConfig {
    /// The detection settings implied by this configuration.
    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            include_patterns: self.include_patterns.clone(),
            exclude_patterns: self.exclude_patterns.clone(),
            known_image_paths: self.known_image_paths.clone(),
            global_registry: None,
        }
    }
}

/// The generated override and its statistics
#[derive(Debug)]
pub struct OverrideResult {
    /// Sparse tree holding only rewritten branches
    pub values: Node,
    /// Images that counted toward the success rate
    pub processed: usize,
    pub succeeded: usize,
    pub skipped: Vec<SkipRecord>,
    /// Errors raised while writing individual values
    pub errors: Vec<Error>,
}

impl Default for OverrideResult {
    fn default() -> Self {
        Self {
            values: Node::empty_map(),
            processed: 0,
            succeeded: 0,
            skipped: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl OverrideResult {
    /// `100 * succeeded / processed`, rounded down; 100 when nothing was processed.
    pub fn success_percentage(&self) -> u8 {
        if self.processed == 0 {
            return 100;
        }
        let percentage = self.succeeded * 100 / self.processed;
        u8::try_from(percentage.min(100)).unwrap_or(100)
    }
}

/// Generate the override for `tree`.
pub fn generate(tree: &Node, config: &GeneratorConfig) -> Result<OverrideResult> {
    if config.threshold > 100 {
        return Err(Error::DetectorConfig {
            message: format!(
                "threshold must be between 0 and 100, got {}",
                config.threshold
            ),
        });
    }

    let detection = detector::detect(tree, &config.detector_config())?;
    debug!(
        "Detected {} images ({} skipped during detection)",
        detection.patterns.len(),
        detection.skipped.len()
    );

    let mut generator = Generator {
        tree,
        config,
        mapper: RegistryMapper::new(
            &config.mappings,
            config.target_registry.as_deref(),
            &config.exclude_registries,
        ),
        sources: config
            .source_registries
            .iter()
            .map(|s| normalize_registry(s))
            .collect(),
        result: OverrideResult::default(),
    };

    for record in detection.skipped {
        generator.skip(record)?;
    }
    for pattern in &detection.patterns {
        generator.rewrite(pattern)?;
    }

    generator.finish()
}

struct Generator<'a> {
    tree: &'a Node,
    config: &'a GeneratorConfig,
    mapper: RegistryMapper,
    sources: Vec<String>,
    result: OverrideResult,
}

impl Generator<'_> {
    fn rewrite(&mut self, pattern: &ImagePattern) -> Result<()> {
        let registry = pattern.reference.registry().to_string();

        if !self.sources.is_empty() && !self.sources.contains(&registry) {
            return self.skip(skip_record(pattern, SkipReason::NotSourceRegistry { registry }));
        }

        let strategy = &self.config.strategy;
        let (target, new_repository) = match self.mapper.resolve(&registry) {
            Resolution::Mapped(target) => {
                let path = strategy.generate_path(&pattern.reference, target.prefix.as_deref());
                (target, path)
            }
            // A default target's path is a fixed leading segment.
            Resolution::Default(target) => {
                let path = strategy.generate_path(&pattern.reference, None);
                let path = match target.prefix.as_deref() {
                    Some(prefix) => format!("{}/{}", prefix, path),
                    None => path,
                };
                (target, path)
            }
            Resolution::Excluded => {
                return self.skip(skip_record(pattern, SkipReason::ExcludedRegistry { registry }));
            }
            Resolution::Unmatched => {
                return self.skip(skip_record(pattern, SkipReason::UnmatchedRegistry { registry }));
            }
        };

        match self.write(pattern, &target.registry, &new_repository) {
            Ok(()) => {
                self.result.processed += 1;
                self.result.succeeded += 1;
                debug!(
                    "Rewrote {} at {} to {}/{}",
                    pattern.reference, pattern.path, target.registry, new_repository
                );
                Ok(())
            }
            Err(err) => {
                let message = err.to_string();
                self.result.errors.push(err);
                self.skip(skip_record(pattern, SkipReason::WriteFailed { message }))
            }
        }
    }

    fn write(&mut self, pattern: &ImagePattern, registry: &str, repository: &str) -> Result<()> {
        let fields = match (pattern.kind, &pattern.fields) {
            (PatternKind::StructuredMap, Some(fields)) => fields,
            _ => {
                let value = format!(
                    "{}/{}{}",
                    registry,
                    repository,
                    pattern.reference.identifier_suffix()
                );
                return self
                    .result
                    .values
                    .set_path(&pattern.path, Node::String(value), self.tree);
            }
        };

        // A tag or digest embedded in the repository value stays there.
        let embedded = if fields.has_tag || fields.has_digest {
            String::new()
        } else {
            pattern.reference.identifier_suffix()
        };

        let repository_path = pattern.path.child_key(&fields.repository_key);
        if fields.has_registry {
            self.result.values.set_path(
                &pattern.path.child_key("registry"),
                Node::from(registry),
                self.tree,
            )?;
            self.result.values.set_path(
                &repository_path,
                Node::String(format!("{}{}", repository, embedded)),
                self.tree,
            )?;
        } else {
            self.result.values.set_path(
                &repository_path,
                Node::String(format!("{}/{}{}", registry, repository, embedded)),
                self.tree,
            )?;
        }

        for (key, present) in [("tag", fields.has_tag), ("digest", fields.has_digest)] {
            if !present {
                continue;
            }
            let path = pattern.path.child_key(key);
            if let Some(original) = self.tree.get(&path) {
                self.result
                    .values
                    .set_path(&path, original.clone(), self.tree)?;
            }
        }
        Ok(())
    }

    fn skip(&mut self, record: SkipRecord) -> Result<()> {
        if record.reason.counts_as_processed() {
            self.result.processed += 1;
        }

        if !record.reason.is_failure() {
            debug!("Leaving {} at {} unchanged: {}", record.raw_value, record.path, record.reason);
            self.result.skipped.push(record);
            return Ok(());
        }

        if self.config.strict_mode {
            let path = record.path.clone();
            let reason = record.reason.clone();
            self.result.skipped.push(record);
            return Err(Error::StrictModeViolation {
                path,
                reason,
                partial: Box::new(std::mem::take(&mut self.result)),
            });
        }

        warn!(
            "Skipping image at {} ({}): {}",
            record.path, record.raw_value, record.reason
        );
        self.result.skipped.push(record);
        Ok(())
    }

    fn finish(mut self) -> Result<OverrideResult> {
        let percentage = self.result.success_percentage();
        if self.config.threshold > 0 && percentage < self.config.threshold {
            return Err(Error::ThresholdExceeded {
                percentage,
                threshold: self.config.threshold,
                processed: self.result.processed,
                succeeded: self.result.succeeded,
                partial: Box::new(std::mem::take(&mut self.result)),
            });
        }

        info!(
            "Rewrote {} of {} images ({}%), {} skipped",
            self.result.succeeded,
            self.result.processed,
            percentage,
            self.result.skipped.len()
        );
        Ok(self.result)
    }
}

fn skip_record(pattern: &ImagePattern, reason: SkipReason) -> SkipRecord {
    SkipRecord {
        path: pattern.path.to_string(),
        raw_value: pattern.raw_value.clone(),
        reason,
    }
}

//! Image pattern detection
//!
//! Walks a values tree and finds every container image reference in it,
//! whether written as a plain string (`image: nginx:1.25`) or as a
//! structured map (`image: {registry, repository, tag}`).
//!
//! ## Traversal
//!
//! Known image paths are resolved first and always produce a pattern or a
//! skip record. The tree is then walked depth-first, maps in key order and
//! lists in index order, so the same input always yields the same ordered
//! output.
//!
//! ## What counts as an image
//!
//! Values files are full of strings that look vaguely like image references
//! (`redis:6379`, `app:web`, `config/app.yaml`). A string is only reported
//! when it parses *and* there is positive evidence:
//!
//! - it carries a digest, or
//! - it sits under an image key (a key ending in `image`, or a list under a
//!   key ending in `images`), or
//! - it has a tag and either contains a `/` or has a tag that mixes digits
//!   with other characters (`busybox:1.36`, but not `redis:6379`).
//!
//! Maps are image maps when they carry a `repository` string; `image` and
//! `name` keys are accepted in the shapes older charts use. Per-node failures
//! never abort detection; they surface as [`SkipRecord`]s.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use log::debug;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::path::{PathFilter, PathSegment, ValuePath};
use crate::reference::{has_registry_prefix, ImageReference, ParseError};
use crate::values::Node;

/// Map keys consumed by a structured image map.
const IMAGE_MAP_FIELDS: &[&str] = &["registry", "repository", "image", "name", "tag", "digest"];

/// Detection settings
#[derive(Debug, Clone, Default)]
pub struct DetectorConfig {
    /// Only patterns at or below a path matching one of these globs are reported.
    pub include_patterns: Vec<String>,
    /// Subtrees whose path or key name matches one of these globs are skipped.
    pub exclude_patterns: Vec<String>,
    /// Paths that always hold an image, in dot/bracket notation.
    pub known_image_paths: Vec<String>,
    /// Registry for structured maps that name none. Read from
    /// `global.imageRegistry` when unset.
    pub global_registry: Option<String>,
}

impl DetectorConfig {
    /// Check globs and known paths without walking a tree.
    pub fn validate(&self) -> Result<()> {
        PathFilter::new(&self.include_patterns, &self.exclude_patterns)?;
        self.known_paths()?;
        Ok(())
    }

    fn known_paths(&self) -> Result<Vec<ValuePath>> {
        self.known_image_paths
            .iter()
            .map(|text| {
                ValuePath::parse(text).map_err(|err| Error::DetectorConfig {
                    message: format!("invalid known image path: {}", err),
                })
            })
            .collect()
    }
}

/// How an image was written in the values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatternKind {
    StringValue,
    StructuredMap,
}

/// The keys a structured image map was written with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredFields {
    /// `repository`, `image` or `name`
    pub repository_key: String,
    /// Whether the map has its own `registry` key
    pub has_registry: bool,
    pub has_tag: bool,
    pub has_digest: bool,
}

/// One located image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePattern {
    pub path: ValuePath,
    pub kind: PatternKind,
    /// The value as written (map fields are joined into reference form)
    pub raw_value: String,
    pub reference: ImageReference,
    /// Set for [`PatternKind::StructuredMap`]
    pub fields: Option<StructuredFields>,
    /// How many patterns in the same detection share this raw value
    pub count: usize,
}

/// Why an image was not rewritten
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    ParseFailed(ParseError),
    TemplateValue,
    UnsupportedValue { found: &'static str },
    ExcludedRegistry { registry: String },
    NotSourceRegistry { registry: String },
    UnmatchedRegistry { registry: String },
    WriteFailed { message: String },
}

impl SkipReason {
    /// Whether the skip counts as a processed-but-failed image for the
    /// success threshold.
    pub fn counts_as_processed(&self) -> bool {
        matches!(
            self,
            SkipReason::ParseFailed(_)
                | SkipReason::UnsupportedValue { .. }
                | SkipReason::UnmatchedRegistry { .. }
                | SkipReason::WriteFailed { .. }
        )
    }

    /// Whether strict mode treats the skip as fatal. Registries filtered out
    /// on purpose are not failures.
    pub fn is_failure(&self) -> bool {
        !matches!(
            self,
            SkipReason::ExcludedRegistry { .. } | SkipReason::NotSourceRegistry { .. }
        )
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ParseFailed(err) => write!(f, "{}", err),
            SkipReason::TemplateValue => f.write_str("value is a template expression"),
            SkipReason::UnsupportedValue { found } => {
                write!(f, "expected an image string or map, found {}", found)
            }
            SkipReason::ExcludedRegistry { registry } => {
                write!(f, "registry '{}' is excluded", registry)
            }
            SkipReason::NotSourceRegistry { registry } => {
                write!(f, "registry '{}' is not a source registry", registry)
            }
            SkipReason::UnmatchedRegistry { registry } => {
                write!(f, "no mapping or target registry for '{}'", registry)
            }
            SkipReason::WriteFailed { message } => write!(f, "{}", message),
        }
    }
}

/// An image that was found but not used
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipRecord {
    pub path: String,
    pub raw_value: String,
    pub reason: SkipReason,
}

/// Result of one detection pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detection {
    pub patterns: Vec<ImagePattern>,
    pub skipped: Vec<SkipRecord>,
}

/// Find every image reference in `tree`.
///
/// Fails only on invalid configuration; problems with individual values are
/// reported in [`Detection::skipped`].
pub fn detect(tree: &Node, config: &DetectorConfig) -> Result<Detection> {
    let filter = PathFilter::new(&config.include_patterns, &config.exclude_patterns)?;
    let known = config.known_paths()?;

    let global_registry = config
        .global_registry
        .clone()
        .or_else(|| global_image_registry(tree))
        .filter(|registry| !registry.trim().is_empty());
    if let Some(registry) = &global_registry {
        debug!("Using global image registry '{}'", registry);
    }

    let mut walker = Walker {
        filter: &filter,
        global_registry: global_registry.as_deref(),
        claimed: HashMap::new(),
        detection: Detection::default(),
    };

    for path in &known {
        if path.prefixes().any(|prefix| filter.is_excluded(&prefix)) {
            debug!("Known image path {} is excluded", path);
            continue;
        }
        match tree.get(path) {
            Some(node) => walker.visit_known(path, node),
            None => debug!("Known image path {} not present in values", path),
        }
    }

    let mut root = ValuePath::root();
    walker.walk(tree, &mut root);

    Ok(walker.finish())
}

fn global_image_registry(tree: &Node) -> Option<String> {
    let path = ValuePath::root().child_key("global").child_key("imageRegistry");
    tree.get(&path).and_then(Node::as_str).map(str::to_string)
}

fn is_template(value: &str) -> bool {
    value.contains("{{") && value.contains("}}")
}

/// A key ending in `image`, or a list item under a key ending in `images`.
fn has_image_hint(path: &ValuePath) -> bool {
    let segments = path.segments();
    match segments.last() {
        Some(PathSegment::Key(key)) => key.to_ascii_lowercase().ends_with("image"),
        Some(PathSegment::Index(_)) => matches!(
            segments.len().checked_sub(2).and_then(|i| segments.get(i)),
            Some(PathSegment::Key(key)) if key.to_ascii_lowercase().ends_with("images")
        ),
        None => false,
    }
}

/// A tag like `1.36` or `v2` rather than a port number or a word.
fn is_versionish_tag(tag: &str) -> bool {
    tag.bytes().any(|b| b.is_ascii_digit()) && !tag.bytes().all(|b| b.is_ascii_digit())
}

/// The string-typed view of an optional map field.
///
/// `Err(())` means the field has a type that rules the map out.
fn scalar_field(
    map: &BTreeMap<String, Node>,
    key: &str,
    numbers: bool,
) -> std::result::Result<Option<String>, ()> {
    match map.get(key) {
        None | Some(Node::Null) => Ok(None),
        Some(Node::String(value)) => Ok(Some(value.clone())),
        Some(Node::Number(value)) if numbers => Ok(Some(value.to_string())),
        Some(_) => Err(()),
    }
}

enum Claim {
    String,
    Map { consumed: Vec<String> },
}

struct Walker<'a> {
    filter: &'a PathFilter,
    global_registry: Option<&'a str>,
    claimed: HashMap<ValuePath, Claim>,
    detection: Detection,
}

impl Walker<'_> {
    fn visit_known(&mut self, path: &ValuePath, node: &Node) {
        match node {
            Node::String(value) => {
                self.claimed.insert(path.clone(), Claim::String);
                if is_template(value) {
                    self.skip(path, value, SkipReason::TemplateValue);
                    return;
                }
                match ImageReference::parse(value.trim()) {
                    Ok(reference) => {
                        self.record_string(path, value, reference.with_default_tag())
                    }
                    Err(err) => self.skip(path, value, SkipReason::ParseFailed(err)),
                }
            }
            Node::Map(map) => {
                if !self.structured(path, map, true) {
                    self.claimed.insert(path.clone(), Claim::Map { consumed: Vec::new() });
                    self.skip(
                        path,
                        &node.to_string(),
                        SkipReason::UnsupportedValue {
                            found: "map without an image repository",
                        },
                    );
                }
            }
            other => {
                self.claimed.insert(path.clone(), Claim::String);
                self.skip(
                    path,
                    &other.to_string(),
                    SkipReason::UnsupportedValue { found: other.kind() },
                );
            }
        }
    }

    fn walk(&mut self, node: &Node, path: &mut ValuePath) {
        if self.filter.is_excluded(path) {
            debug!("Skipping excluded path {}", path);
            return;
        }

        match self.claimed.get(&*path) {
            Some(Claim::String) => return,
            Some(Claim::Map { consumed }) => {
                let consumed = consumed.clone();
                if let Node::Map(map) = node {
                    self.walk_map(map, path, &consumed);
                }
                return;
            }
            None => {}
        }

        match node {
            Node::Map(map) => {
                if self.structured(path, map, false) {
                    let consumed = match self.claimed.get(&*path) {
                        Some(Claim::Map { consumed }) => consumed.clone(),
                        _ => Vec::new(),
                    };
                    self.walk_map(map, path, &consumed);
                } else {
                    self.walk_map(map, path, &[]);
                }
            }
            Node::List(items) => {
                for (idx, item) in items.iter().enumerate() {
                    path.push(PathSegment::Index(idx));
                    self.walk(item, path);
                    path.pop();
                }
            }
            Node::String(value) => self.string_candidate(path, value),
            Node::Null | Node::Bool(_) | Node::Number(_) => {}
        }
    }

    fn walk_map(
        &mut self,
        map: &BTreeMap<String, Node>,
        path: &mut ValuePath,
        consumed: &[String],
    ) {
        for (key, child) in map {
            if consumed.iter().any(|c| c == key) {
                continue;
            }
            path.push(PathSegment::Key(key.clone()));
            self.walk(child, path);
            path.pop();
        }
    }

    fn string_candidate(&mut self, path: &ValuePath, value: &str) {
        let hinted = has_image_hint(path);

        if value.is_empty() {
            return;
        }
        if is_template(value) {
            if hinted {
                self.skip(path, value, SkipReason::TemplateValue);
            }
            return;
        }
        if value.chars().any(char::is_whitespace) {
            return;
        }
        if !hinted && !value.contains(['/', ':', '@']) {
            return;
        }
        if value.contains("://") || value.starts_with('/') || value.starts_with('.') {
            return;
        }

        match ImageReference::parse(value) {
            Ok(reference) => {
                let evidence = hinted
                    || reference.digest().is_some()
                    || reference.tag().is_some_and(|tag| {
                        value.contains('/') || is_versionish_tag(tag)
                    });
                if evidence {
                    self.record_string(path, value, reference.with_default_tag());
                }
            }
            Err(err) => {
                if hinted {
                    self.skip(path, value, SkipReason::ParseFailed(err));
                }
            }
        }
    }

    /// Try to treat `map` as a structured image. Returns whether it was claimed.
    fn structured(
        &mut self,
        path: &ValuePath,
        map: &BTreeMap<String, Node>,
        forced: bool,
    ) -> bool {
        let has = |key: &str| map.get(key).is_some_and(|v| !v.is_null());
        let string_at = |key: &str| map.get(key).and_then(Node::as_str);

        let repository_key = if string_at("repository").is_some() {
            "repository"
        } else if string_at("image").is_some()
            && (forced || has("tag") || has("digest") || has("registry"))
        {
            "image"
        } else if string_at("name").is_some()
            && (forced || (has("registry") && (has("tag") || has("digest"))))
        {
            "name"
        } else {
            return false;
        };
        let repository = string_at(repository_key).unwrap_or_default();

        let (Ok(registry), Ok(tag), Ok(digest)) = (
            scalar_field(map, "registry", false),
            scalar_field(map, "tag", true),
            scalar_field(map, "digest", false),
        ) else {
            return false;
        };

        let consumed: Vec<String> = IMAGE_MAP_FIELDS
            .iter()
            .filter(|key| {
                matches!(**key, "registry" | "tag" | "digest") || **key == repository_key
            })
            .map(|key| key.to_string())
            .collect();
        if !forced
            && consumed
                .iter()
                .any(|key| self.claimed.contains_key(&path.child_key(key)))
        {
            debug!("{} holds a known image path; not treating it as an image map", path);
            return false;
        }
        self.claimed
            .insert(path.clone(), Claim::Map { consumed });

        let raw_value = join_fields(registry.as_deref(), repository, tag.as_deref(), digest.as_deref());

        if !forced && !self.filter.is_included(path) {
            return true;
        }

        let any_template = [Some(repository), registry.as_deref(), tag.as_deref(), digest.as_deref()]
            .into_iter()
            .flatten()
            .any(is_template);
        if any_template {
            self.skip(path, &raw_value, SkipReason::TemplateValue);
            return true;
        }

        let effective_registry = registry
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .or_else(|| {
                if has_registry_prefix(repository.trim()) {
                    None
                } else {
                    self.global_registry
                }
            });

        match ImageReference::from_structured(
            effective_registry,
            repository,
            tag.as_deref(),
            digest.as_deref(),
        ) {
            Ok(reference) => {
                let fields = StructuredFields {
                    repository_key: repository_key.to_string(),
                    has_registry: map.contains_key("registry"),
                    has_tag: tag.as_deref().is_some_and(|t| !t.trim().is_empty()),
                    has_digest: digest.as_deref().is_some_and(|d| !d.trim().is_empty()),
                };
                debug!("Found structured image at {}: {}", path, reference);
                self.detection.patterns.push(ImagePattern {
                    path: path.clone(),
                    kind: PatternKind::StructuredMap,
                    raw_value,
                    reference,
                    fields: Some(fields),
                    count: 0,
                });
            }
            Err(err) => self.skip(path, &raw_value, SkipReason::ParseFailed(err)),
        }
        true
    }

    fn record_string(&mut self, path: &ValuePath, value: &str, reference: ImageReference) {
        if !self.filter.is_included(path) && !self.claimed.contains_key(path) {
            return;
        }
        debug!("Found image string at {}: {}", path, reference);
        self.detection.patterns.push(ImagePattern {
            path: path.clone(),
            kind: PatternKind::StringValue,
            raw_value: value.to_string(),
            reference,
            fields: None,
            count: 0,
        });
    }

    fn skip(&mut self, path: &ValuePath, value: &str, reason: SkipReason) {
        debug!("Skipping image candidate at {}: {}", path, reason);
        self.detection.skipped.push(SkipRecord {
            path: path.to_string(),
            raw_value: value.to_string(),
            reason,
        });
    }

    fn finish(mut self) -> Detection {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for pattern in &self.detection.patterns {
            *counts.entry(pattern.raw_value.clone()).or_default() += 1;
        }
        for pattern in &mut self.detection.patterns {
            pattern.count = counts.get(&pattern.raw_value).copied().unwrap_or(1);
        }
        self.detection
    }
}

fn join_fields(
    registry: Option<&str>,
    repository: &str,
    tag: Option<&str>,
    digest: Option<&str>,
) -> String {
    let mut raw = String::new();
    if let Some(registry) = registry.filter(|r| !r.is_empty()) {
        raw.push_str(registry);
        raw.push('/');
    }
    raw.push_str(repository);
    if let Some(tag) = tag.filter(|t| !t.is_empty()) {
        raw.push(':');
        raw.push_str(tag);
    }
    if let Some(digest) = digest.filter(|d| !d.is_empty()) {
        raw.push('@');
        raw.push_str(digest);
    }
    raw
}

impl Detection {
    /// Distinct source registries among the detected patterns, sorted.
    pub fn registries(&self) -> Vec<String> {
        let unique: HashSet<&str> = self
            .patterns
            .iter()
            .map(|p| p.reference.registry())
            .collect();
        let mut registries: Vec<String> = unique.into_iter().map(str::to_string).collect();
        registries.sort();
        registries
    }
}

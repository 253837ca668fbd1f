//! Registry mapping resolution
//!
//! The [`RegistryMapper`] decides where images from a given source registry
//! go. Resolution order:
//!
//! 1. The first enabled [`Mapping`] whose source matches (case-insensitive,
//!    after normalization), in table order.
//! 2. Otherwise, if the source is excluded: [`Resolution::Excluded`].
//! 3. Otherwise, if a default target is configured: [`Resolution::Default`].
//! 4. Otherwise: [`Resolution::Unmatched`].

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::reference::{looks_like_host, normalize_registry};

fn default_enabled() -> bool {
    true
}

/// One source-to-target registry mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Mapping {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            description: None,
            enabled: true,
        }
    }
}

/// Where a relocated image goes: a registry host plus an optional path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub registry: String,
    pub prefix: Option<String>,
}

impl Target {
    /// Split a mapping target such as `harbor.local/dockerhub`.
    ///
    /// When the first segment is not a host, the whole target is a prefix
    /// under `fallback_registry`; without a fallback such a target cannot be
    /// resolved.
    pub fn parse(target: &str, fallback_registry: Option<&str>) -> Option<Self> {
        let trimmed = target.trim();
        let without_scheme = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
            .unwrap_or(trimmed)
            .trim_matches('/');
        if without_scheme.is_empty() {
            return None;
        }

        let (first, rest) = match without_scheme.split_once('/') {
            Some((first, rest)) => (first, Some(rest)),
            None => (without_scheme, None),
        };

        if looks_like_host(first) {
            return Some(Self {
                registry: normalize_registry(first),
                prefix: rest.map(str::to_string).filter(|p| !p.is_empty()),
            });
        }

        fallback_registry.map(|registry| Self {
            registry: normalize_registry(registry),
            prefix: Some(without_scheme.to_string()),
        })
    }
}

/// Outcome of resolving one source registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// An explicit mapping matched.
    Mapped(Target),
    /// No mapping matched; the default target applies.
    Default(Target),
    /// The registry is excluded from relocation.
    Excluded,
    /// Nothing applies.
    Unmatched,
}

/// Resolves source registries against a mapping table.
///
/// The table is fixed for the lifetime of the mapper.
#[derive(Debug, Clone, Default)]
pub struct RegistryMapper {
    /// (normalized source, resolved target) in table order, enabled only.
    mappings: Vec<(String, Target)>,
    default_target: Option<Target>,
    excludes: Vec<String>,
}

impl RegistryMapper {
    pub fn new(mappings: &[Mapping], default_target: Option<&str>, excludes: &[String]) -> Self {
        let default_target = default_target.and_then(|target| {
            let resolved = Target::parse(target, None);
            if resolved.is_none() {
                warn!(
                    "Default target '{}' does not start with a registry host; ignoring it",
                    target
                );
            }
            resolved
        });
        let fallback = default_target.as_ref().map(|t| t.registry.as_str());

        let mappings = mappings
            .iter()
            .filter(|mapping| {
                if !mapping.enabled {
                    debug!("Skipping disabled mapping for '{}'", mapping.source);
                }
                mapping.enabled
            })
            .filter_map(|mapping| match Target::parse(&mapping.target, fallback) {
                Some(target) => Some((normalize_registry(&mapping.source), target)),
                None => {
                    warn!(
                        "Mapping target '{}' for '{}' has no registry host and no default target is set; ignoring it",
                        mapping.target, mapping.source
                    );
                    None
                }
            })
            .collect();

        Self {
            mappings,
            default_target,
            excludes: excludes.iter().map(|e| normalize_registry(e)).collect(),
        }
    }

    pub fn resolve(&self, source_registry: &str) -> Resolution {
        let source = normalize_registry(source_registry);

        if let Some((_, target)) = self.mappings.iter().find(|(s, _)| *s == source) {
            return Resolution::Mapped(target.clone());
        }
        if self.excludes.contains(&source) {
            return Resolution::Excluded;
        }
        match &self.default_target {
            Some(target) => Resolution::Default(target.clone()),
            None => Resolution::Unmatched,
        }
    }
}

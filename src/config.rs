//! # Registry Mapping Files
//!
//! This module loads the file that tells `irr` where each source registry
//! should be relocated to. Three shapes are accepted, newest first:
//!
//! ```yaml
//! # Structured format
//! version: "1.0"
//! registries:
//!   mappings:
//!     - source: docker.io
//!       target: harbor.local/dockerhub
//!       description: Docker Hub mirror
//!     - source: quay.io
//!       target: harbor.local/quay
//!       enabled: false
//!   defaultTarget: harbor.local/default
//!   strictMode: false
//! ```
//!
//! ```yaml
//! # List format
//! mappings:
//!   - source: docker.io
//!     target: harbor.local/dockerhub
//! ```
//!
//! ```yaml
//! # Legacy format
//! docker.io: harbor.local/dockerhub
//! quay.io: harbor.local/quay
//! ```
//!
//! All three normalize into a [`MappingFile`]. Every mapping must have a
//! non-empty source and target; `enabled` defaults to `true`. When the same
//! source appears more than once, the later entry wins.

use std::collections::BTreeSet;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::reference::{normalize_registry, sanitize_registry_for_path};
use crate::registry::Mapping;

/// Current version written into generated files.
pub const CURRENT_VERSION: &str = "1.0";

/// Registry used in generated skeletons.
pub const SKELETON_REGISTRY: &str = "registry.local";

/// A parsed registry mapping file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub registries: RegistriesConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatibility: Option<Compatibility>,
}

/// The `registries` section of a mapping file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistriesConfig {
    #[serde(default)]
    pub mappings: Vec<Mapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_target: Option<String>,
    #[serde(default)]
    pub strict_mode: bool,
}

/// Compatibility switches carried over from older file versions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compatibility {
    #[serde(default)]
    pub ignore_empty_fields: bool,
}

#[derive(Deserialize)]
struct ListFormat {
    mappings: Vec<Mapping>,
}

impl MappingFile {
    /// Build a skeleton mapping every registry to a placeholder target.
    ///
    /// Registries are normalized, de-duplicated and sorted.
    pub fn skeleton<'a, I>(registries: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let unique: BTreeSet<String> = registries.into_iter().map(normalize_registry).collect();

        let mappings = unique
            .into_iter()
            .map(|registry| Mapping {
                target: format!(
                    "{}/{}",
                    SKELETON_REGISTRY,
                    sanitize_registry_for_path(&registry)
                ),
                description: Some(format!("Mapping for {}", registry)),
                source: registry,
                enabled: true,
            })
            .collect();

        Self {
            version: Some(CURRENT_VERSION.to_string()),
            registries: RegistriesConfig {
                mappings,
                default_target: Some(format!("{}/default", SKELETON_REGISTRY)),
                strict_mode: false,
            },
            compatibility: Some(Compatibility {
                ignore_empty_fields: true,
            }),
        }
    }

    /// Serialize back to the structured format.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Parse a mapping file in any supported format.
pub fn parse(yaml_content: &str) -> Result<MappingFile> {
    if yaml_content.trim().is_empty() {
        return Ok(MappingFile::default());
    }

    // First try parsing as the current format
    let mut file = match serde_yaml::from_str::<MappingFile>(yaml_content) {
        Ok(file) => file,
        Err(_) => match serde_yaml::from_str::<ListFormat>(yaml_content) {
            Ok(list) => MappingFile {
                registries: RegistriesConfig {
                    mappings: list.mappings,
                    ..Default::default()
                },
                ..Default::default()
            },
            Err(_) => parse_legacy_format(yaml_content)?,
        },
    };

    file.registries.mappings = validate_mappings(std::mem::take(&mut file.registries.mappings))?;
    Ok(file)
}

/// Parse the legacy flat `source: target` format.
pub fn parse_legacy_format(yaml_content: &str) -> Result<MappingFile> {
    use serde_yaml::Value;

    let raw: Value = serde_yaml::from_str(yaml_content).map_err(Error::Yaml)?;
    let Value::Mapping(map) = raw else {
        return Err(Error::ConfigParse {
            message: "Expected a YAML mapping of registries".to_string(),
            hint: Some(
                "Use 'registries.mappings' entries with 'source' and 'target' fields".to_string(),
            ),
        });
    };

    let mut mappings = Vec::with_capacity(map.len());
    for (key, value) in map {
        match (key, value) {
            (Value::String(source), Value::String(target)) => {
                mappings.push(Mapping::new(source, target));
            }
            (key, _) => {
                return Err(Error::ConfigParse {
                    message: format!(
                        "Legacy mapping entry {:?} must map a registry name to a target string",
                        key
                    ),
                    hint: Some("Example: 'docker.io: harbor.local/dockerhub'".to_string()),
                });
            }
        }
    }

    Ok(MappingFile {
        registries: RegistriesConfig {
            mappings,
            ..Default::default()
        },
        ..Default::default()
    })
}

/// Reject empty fields and collapse duplicate sources, keeping the later entry.
fn validate_mappings(mappings: Vec<Mapping>) -> Result<Vec<Mapping>> {
    let mut validated: Vec<Mapping> = Vec::with_capacity(mappings.len());

    for (position, mut mapping) in mappings.into_iter().enumerate() {
        mapping.source = mapping.source.trim().to_string();
        mapping.target = mapping.target.trim().to_string();

        if mapping.source.is_empty() {
            return Err(Error::ConfigParse {
                message: format!("Mapping {} has an empty source", position + 1),
                hint: None,
            });
        }
        if mapping.target.is_empty() {
            return Err(Error::ConfigParse {
                message: format!(
                    "Mapping {} ('{}') has an empty target",
                    position + 1,
                    mapping.source
                ),
                hint: None,
            });
        }

        let key = normalize_registry(&mapping.source);
        if let Some(existing) = validated
            .iter()
            .position(|m| normalize_registry(&m.source) == key)
        {
            warn!(
                "Duplicate mapping for '{}'; '{}' replaces '{}'",
                mapping.source, mapping.target, validated[existing].target
            );
            validated.remove(existing);
        }
        validated.push(mapping);
    }

    Ok(validated)
}

/// Load a mapping file from disk.
pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<MappingFile> {
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    parse(&content)
}

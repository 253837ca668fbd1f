//! Path strategies
//!
//! A path strategy decides where an image lands inside the target registry.
//! Given the parsed source reference and the prefix resolved from the
//! registry mappings (if any), it returns the new repository path; the
//! generator puts the target registry host in front of it.
//!
//! Strategies are selected by name through [`from_name`].

use std::fmt::Debug;

use crate::error::{Error, Result};
use crate::reference::{sanitize_registry_for_path, ImageReference};

/// Name of the default strategy.
pub const PREFIX_SOURCE_REGISTRY: &str = "prefix-source-registry";
/// Name of the flattening strategy.
pub const FLAT: &str = "flat";

/// All strategy names accepted by [`from_name`].
pub const AVAILABLE: &[&str] = &[PREFIX_SOURCE_REGISTRY, FLAT];

/// Computes the repository path of a relocated image.
pub trait PathStrategy: Debug + Send + Sync {
    /// The name the strategy is selected by.
    fn name(&self) -> &str;

    /// The new repository path for `reference`.
    ///
    /// `prefix` is the path part of a resolved mapping target
    /// (`dockerhub` for `harbor.local/dockerhub`). When it is `None` the
    /// strategy derives one from the source registry.
    fn generate_path(&self, reference: &ImageReference, prefix: Option<&str>) -> String;
}

/// `<prefix or sanitized source registry>/<repository>`
///
/// `docker.io/library/nginx` becomes `docker-io/library/nginx`, or
/// `dockerhub/library/nginx` under a `dockerhub` prefix.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrefixSourceRegistry;

impl PathStrategy for PrefixSourceRegistry {
    fn name(&self) -> &str {
        PREFIX_SOURCE_REGISTRY
    }

    fn generate_path(&self, reference: &ImageReference, prefix: Option<&str>) -> String {
        format!(
            "{}/{}",
            resolve_prefix(reference, prefix),
            reference.repository()
        )
    }
}

/// Collapses the repository into a single path component.
///
/// `quay.io/org/app` becomes `quay-io-org-app`, or `mirror/org-app` under a
/// `mirror` prefix. Useful for registries that do not allow nested
/// repositories.
#[derive(Debug, Default, Clone, Copy)]
pub struct Flat;

impl PathStrategy for Flat {
    fn name(&self) -> &str {
        FLAT
    }

    fn generate_path(&self, reference: &ImageReference, prefix: Option<&str>) -> String {
        let flattened = reference.repository().replace('/', "-");
        match explicit_prefix(prefix) {
            Some(prefix) => format!("{}/{}", prefix, flattened),
            None => format!(
                "{}-{}",
                sanitize_registry_for_path(reference.registry()),
                flattened
            ),
        }
    }
}

fn explicit_prefix(prefix: Option<&str>) -> Option<&str> {
    prefix
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty())
}

fn resolve_prefix(reference: &ImageReference, prefix: Option<&str>) -> String {
    match explicit_prefix(prefix) {
        Some(prefix) => prefix.to_string(),
        None => sanitize_registry_for_path(reference.registry()),
    }
}

/// Look up a strategy by name.
pub fn from_name(name: &str) -> Result<Box<dyn PathStrategy>> {
    match name.trim() {
        PREFIX_SOURCE_REGISTRY => Ok(Box::new(PrefixSourceRegistry)),
        FLAT => Ok(Box::new(Flat)),
        other => Err(Error::UnknownStrategy {
            name: other.to_string(),
            available: AVAILABLE.join(", "),
        }),
    }
}

//! # irr: Image Relocation and Rewrite
//!
//! This library finds container image references inside Helm chart values
//! and generates a minimal override file that points every image at a
//! different registry. It is used by the `irr` command-line tool but can be
//! embedded wherever values trees are at hand.
//!
//! ## Quick Example
//!
//! ```
//! use irr::generator::{generate, GeneratorConfig};
//! use irr::values::Node;
//!
//! let values = Node::from_yaml_str(
//!     r#"
//! image:
//!   registry: docker.io
//!   repository: nginx
//!   tag: "1.25"
//! "#,
//! )
//! .unwrap();
//!
//! let config = GeneratorConfig {
//!     target_registry: Some("harbor.local".to_string()),
//!     ..Default::default()
//! };
//! let result = generate(&values, &config).unwrap();
//! let yaml = irr::render::render(&result.values, Default::default()).unwrap();
//! assert!(yaml.contains("registry: harbor.local"));
//! assert!(yaml.contains("repository: docker-io/library/nginx"));
//! ```
//!
//! ## Core Concepts
//!
//! - **Values (`values`)**: a YAML tree with Helm merge semantics, addressed
//!   by [`path::ValuePath`]s.
//! - **References (`reference`)**: parsing and normalizing image references
//!   such as `quay.io/org/app:v1` or `nginx@sha256:…`.
//! - **Detection (`detector`)**: walks a tree and reports every image it can
//!   prove, whether written as a string or as a `repository`/`tag` map.
//! - **Registry mapping (`registry`, `config`)**: decides where each source
//!   registry goes, optionally driven by a mapping file.
//! - **Path strategies (`strategy`)**: compute the repository path an image
//!   gets under its target registry.
//! - **Generation (`generator`)**: produces the sparse override tree and its
//!   statistics, enforcing strict mode and the success threshold.
//! - **Scanning (`aggregate`)**: runs detection over many targets in
//!   parallel and collects the registries they use.

pub mod aggregate;
pub mod config;
pub mod detector;
pub mod error;
pub mod exit_codes;
pub mod generator;
pub mod output;
pub mod path;
pub mod reference;
pub mod registry;
pub mod render;
pub mod strategy;
pub mod values;

#[cfg(test)]
mod reference_proptest;

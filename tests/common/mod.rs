//! Shared test utilities for integration and E2E tests.
//!
//! This module provides common fixtures, helper functions, and values
//! snippets to reduce duplication across test files.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_values(values::NGINX);
//!     fixture.command().arg("inspect").arg("-f").arg(fixture.values_path());
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::values;
    pub use super::TestFixture;
}

/// Common values YAML snippets for testing.
#[allow(dead_code)]
pub mod values {
    /// A single structured image on Docker Hub.
    pub const NGINX: &str = r#"
image:
  repository: nginx
  tag: "1.25"
  pullPolicy: IfNotPresent
"#;

    /// Images from three registries, written in different styles.
    pub const MIXED: &str = r#"
image:
  registry: docker.io
  repository: bitnami/nginx
  tag: "1.25.3"
sidecar:
  image: quay.io/org/proxy:v2
metrics:
  image:
    repository: gcr.io/google/cadvisor
    tag: v0.47.0
"#;

    /// One image that parses and one hinted value that does not.
    pub const BROKEN_IMAGE: &str = r#"
image:
  repository: nginx
  tag: "1.25"
helper:
  image: "Org/App:v1"
"#;

    /// Invalid YAML for error testing.
    pub const INVALID_YAML: &str = "image: [unclosed";

    /// A registry mapping file in the structured format.
    pub const MAPPING_FILE: &str = r#"
version: "1.0"
registries:
  defaultTarget: harbor.local/mirror
  mappings:
    - source: quay.io
      target: harbor.local/quay
"#;
}

/// A test fixture that provides a temporary directory with values files.
///
/// # Example
///
/// ```rust,ignore
/// let fixture = TestFixture::new()
///     .with_values(values::NGINX)
///     .with_file("mappings.yaml", values::MAPPING_FILE);
///
/// fixture
///     .command()
///     .arg("override")
///     .arg("-f")
///     .arg(fixture.values_path())
///     .assert()
///     .success();
/// ```
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add a `values.yaml` file with the given content.
    pub fn with_values(self, content: &str) -> Self {
        self.with_file("values.yaml", content)
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the path to the values file.
    pub fn values_path(&self) -> PathBuf {
        self.temp_dir.path().join("values.yaml")
    }

    /// Create a child path in the temp directory.
    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Create a command configured to run in this fixture's directory.
    ///
    /// Colors are disabled and registry environment variables cleared so
    /// output is stable regardless of the calling shell.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("irr");
        cmd.current_dir(self.path())
            .env_remove("IRR_TARGET_REGISTRY")
            .env_remove("IRR_REGISTRY_FILE")
            .env_remove("RUST_LOG")
            .env_remove("IRR_LOG_LEVEL")
            .arg("--color")
            .arg("never");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_with_values() {
        let fixture = TestFixture::new().with_values(values::NGINX);
        assert!(fixture.values_path().exists());
    }

    #[test]
    fn test_values_snippets_are_valid_yaml() {
        for snippet in [
            values::NGINX,
            values::MIXED,
            values::BROKEN_IMAGE,
            values::MAPPING_FILE,
        ] {
            let parsed: Result<serde_yaml::Value, _> = serde_yaml::from_str(snippet);
            assert!(parsed.is_ok(), "snippet should parse: {}", snippet);
        }
    }
}

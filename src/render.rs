//! Rendering override trees
//!
//! An override can be written as a values file (YAML), as JSON, or as the
//! `--set` arguments one would pass to `helm install`.

use std::fmt;
use std::str::FromStr;

use crate::error::Result;
use crate::values::Node;

/// Output format for a generated override
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// A YAML values file
    #[default]
    Values,
    /// Pretty-printed JSON
    Json,
    /// One `--set path=value` argument per line
    HelmSet,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "values" | "yaml" => Ok(OutputFormat::Values),
            "json" => Ok(OutputFormat::Json),
            "helm-set" | "set" => Ok(OutputFormat::HelmSet),
            other => Err(format!(
                "unknown output format '{}' (expected values, json or helm-set)",
                other
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Values => "values",
            OutputFormat::Json => "json",
            OutputFormat::HelmSet => "helm-set",
        })
    }
}

/// Render `values` in the requested format.
pub fn render(values: &Node, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Values => Ok(serde_yaml::to_string(values)?),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(values)?;
            json.push('\n');
            Ok(json)
        }
        OutputFormat::HelmSet => {
            let mut lines = Vec::new();
            flatten(values, String::new(), &mut lines);
            Ok(lines
                .into_iter()
                .map(|(path, value)| format!("--set {}={}\n", path, value))
                .collect())
        }
    }
}

/// Collect `(helm path, escaped value)` pairs for every leaf.
fn flatten(node: &Node, prefix: String, out: &mut Vec<(String, String)>) {
    match node {
        Node::Map(map) => {
            for (key, child) in map {
                let key = key.replace('.', "\\.");
                let path = if prefix.is_empty() {
                    key
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten(child, path, out);
            }
        }
        Node::List(items) => {
            for (idx, item) in items.iter().enumerate() {
                flatten(item, format!("{}[{}]", prefix, idx), out);
            }
        }
        Node::String(s) => out.push((prefix, s.replace(',', "\\,"))),
        leaf => out.push((prefix, leaf.to_string())),
    }
}

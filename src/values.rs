//! The values tree
//!
//! [`Node`] is the generic configuration tree the detector walks and the
//! generator writes: a tagged variant of maps, lists and scalars. It is
//! decoded from YAML or JSON through `serde_yaml::Value`, so non-string map
//! keys are stringified and YAML tags are dropped on the way in. Map keys are
//! kept sorted, which gives every traversal and every serialized patch a
//! stable order.
//!
//! Besides decoding, this module provides the two tree operations the rest of
//! the crate relies on:
//!
//! - Helm-style deep merging of several values files ([`Node::merge`]).
//! - Writing a value at a path while creating intermediate structure
//!   ([`Node::set_path`]).

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use log::debug;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_yaml::Value as YamlValue;

use crate::error::{Error, Result};
use crate::path::{PathSegment, ValuePath};

/// A node in a values tree
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Node {
    #[default]
    Null,
    Bool(bool),
    Number(serde_yaml::Number),
    String(String),
    List(Vec<Node>),
    Map(BTreeMap<String, Node>),
}

impl Node {
    /// An empty map, the shape of an empty values file.
    pub fn empty_map() -> Self {
        Node::Map(BTreeMap::new())
    }

    /// Decode a YAML (or JSON) document. An empty document is an empty map.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let value: YamlValue = serde_yaml::from_str(content)?;
        Ok(match Node::from(value) {
            Node::Null => Node::empty_map(),
            node => node,
        })
    }

    /// Read and decode a values file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(Error::Io)?;
        Self::from_yaml_str(&content)
    }

    /// Read several values files and merge them in order, later files winning.
    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut merged = Node::empty_map();
        for path in paths {
            debug!("Loading values from {}", path.as_ref().display());
            let layer = Self::from_file(path)?;
            merged.merge(&layer);
        }
        Ok(merged)
    }

    /// Short name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Null => "null",
            Node::Bool(_) => "bool",
            Node::Number(_) => "number",
            Node::String(_) => "string",
            Node::List(_) => "list",
            Node::Map(_) => "map",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Node>> {
        match self {
            Node::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    /// Look up the node at `path`.
    pub fn get(&self, path: &ValuePath) -> Option<&Node> {
        let mut current = self;
        for segment in path.segments() {
            current = match (segment, current) {
                (PathSegment::Key(key), Node::Map(map)) => map.get(key)?,
                (PathSegment::Index(idx), Node::List(items)) => items.get(*idx)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Deep-merge `overlay` into `self` using Helm's values semantics.
    ///
    /// - Maps merge key by key, recursively.
    /// - Lists and scalars in the overlay replace the existing value.
    /// - A `null` in the overlay deletes the key.
    pub fn merge(&mut self, overlay: &Node) {
        match (self, overlay) {
            (Node::Map(target), Node::Map(source)) => {
                for (key, value) in source {
                    if value.is_null() {
                        target.remove(key);
                        continue;
                    }
                    match target.get_mut(key) {
                        Some(existing @ Node::Map(_)) if matches!(value, Node::Map(_)) => {
                            existing.merge(value);
                        }
                        _ => {
                            target.insert(key.clone(), value.clone());
                        }
                    }
                }
            }
            (target, source) => *target = source.clone(),
        }
    }

    /// Write `value` at `path`, creating intermediate maps and lists.
    ///
    /// Maps stay sparse. Lists cannot: Helm replaces a list wholesale when it
    /// overlays values, so the override must carry every item of a list it
    /// touches. When a list has to be created on the way, it is seeded with a
    /// copy of the list found at the same location in `source`, and untouched
    /// siblings are written back unchanged.
    pub fn set_path(&mut self, path: &ValuePath, value: Node, source: &Node) -> Result<()> {
        let mut current = self;
        let mut source_cursor = Some(source);

        for segment in path.segments() {
            source_cursor = source_cursor.and_then(|node| match (segment, node) {
                (PathSegment::Key(key), Node::Map(map)) => map.get(key),
                (PathSegment::Index(idx), Node::List(items)) => items.get(*idx),
                _ => None,
            });

            match segment {
                PathSegment::Key(key) => {
                    if current.is_null() {
                        *current = Node::empty_map();
                    }
                    let found = current.kind();
                    let Node::Map(map) = current else {
                        return Err(Error::Path {
                            message: format!(
                                "expected a map while navigating to '{}' in {}, found {}",
                                key, path, found
                            ),
                        });
                    };
                    current = map.entry(key.clone()).or_insert(Node::Null);
                }
                PathSegment::Index(idx) => {
                    if current.is_null() {
                        *current = Node::List(Vec::new());
                    }
                    let found = current.kind();
                    let Node::List(items) = current else {
                        return Err(Error::Path {
                            message: format!(
                                "expected a list while navigating to index {} in {}, found {}",
                                idx, path, found
                            ),
                        });
                    };
                    while items.len() <= *idx {
                        items.push(Node::Null);
                    }
                    current = &mut items[*idx];
                }
            }

            // Seed a freshly created list with the source items.
            if current.is_null() {
                if let Some(Node::List(items)) = source_cursor {
                    *current = Node::List(items.clone());
                }
            }
        }

        *current = value;
        Ok(())
    }
}

impl From<YamlValue> for Node {
    fn from(value: YamlValue) -> Self {
        match value {
            YamlValue::Null => Node::Null,
            YamlValue::Bool(b) => Node::Bool(b),
            YamlValue::Number(n) => Node::Number(n),
            YamlValue::String(s) => Node::String(s),
            YamlValue::Sequence(items) => Node::List(items.into_iter().map(Node::from).collect()),
            YamlValue::Mapping(mapping) => Node::Map(
                mapping
                    .into_iter()
                    .map(|(key, value)| (key_to_string(key), Node::from(value)))
                    .collect(),
            ),
            YamlValue::Tagged(tagged) => Node::from(tagged.value),
        }
    }
}

fn key_to_string(key: YamlValue) -> String {
    match key {
        YamlValue::String(s) => s,
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::String(value.to_string())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::String(value)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Null => f.write_str("null"),
            Node::Bool(b) => write!(f, "{}", b),
            Node::Number(n) => write!(f, "{}", n),
            Node::String(s) => f.write_str(s),
            Node::List(_) | Node::Map(_) => match serde_json::to_string(self) {
                Ok(json) => f.write_str(&json),
                Err(_) => Err(fmt::Error),
            },
        }
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Node::Null => serializer.serialize_unit(),
            Node::Bool(b) => serializer.serialize_bool(*b),
            Node::Number(n) => n.serialize(serializer),
            Node::String(s) => serializer.serialize_str(s),
            Node::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Node::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        YamlValue::deserialize(deserializer).map(Node::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(content: &str) -> Node {
        Node::from_yaml_str(content).unwrap()
    }

    #[test]
    fn test_empty_document_is_empty_map() {
        assert_eq!(yaml(""), Node::empty_map());
        assert_eq!(yaml("# only a comment\n"), Node::empty_map());
    }

    #[test]
    fn test_non_string_keys_are_stringified() {
        let node = yaml("1: one\ntrue: yes\n");
        let map = node.as_map().unwrap();
        assert!(map.contains_key("1"));
        assert!(map.contains_key("true"));
    }

    #[test]
    fn test_tags_are_dropped() {
        let node = yaml("image: !custom nginx:1.25\n");
        let path = ValuePath::parse("image").unwrap();
        assert_eq!(node.get(&path), Some(&Node::from("nginx:1.25")));
    }

    #[test]
    fn test_get_through_lists() {
        let node = yaml("spec:\n  containers:\n    - name: a\n    - name: b\n");
        let path = ValuePath::parse("spec.containers[1].name").unwrap();
        assert_eq!(node.get(&path).and_then(Node::as_str), Some("b"));
        assert!(node.get(&ValuePath::parse("spec.containers[5]").unwrap()).is_none());
    }

    #[test]
    fn test_merge_helm_semantics() {
        let mut base = yaml(
            r#"
image:
  repository: nginx
  tag: "1.24"
ports: [80, 443]
debug: true
"#,
        );
        let overlay = yaml(
            r#"
image:
  tag: "1.25"
ports: [8080]
debug: null
"#,
        );
        base.merge(&overlay);

        let expected = yaml(
            r#"
image:
  repository: nginx
  tag: "1.25"
ports: [8080]
"#,
        );
        assert_eq!(base, expected);
    }

    #[test]
    fn test_set_path_creates_intermediate_maps() {
        let mut patch = Node::empty_map();
        let path = ValuePath::parse("a.b.c").unwrap();
        patch
            .set_path(&path, Node::from("value"), &Node::empty_map())
            .unwrap();
        assert_eq!(patch, yaml("a:\n  b:\n    c: value\n"));
    }

    #[test]
    fn test_set_path_seeds_lists_from_source() {
        let source = yaml(
            r#"
containers:
  - name: app
    image: nginx:1.25
  - name: sidecar
    image: busybox:1.36
"#,
        );
        let mut patch = Node::empty_map();
        let path = ValuePath::parse("containers[1].image").unwrap();
        patch
            .set_path(&path, Node::from("harbor.local/busybox:1.36"), &source)
            .unwrap();

        let expected = yaml(
            r#"
containers:
  - name: app
    image: nginx:1.25
  - name: sidecar
    image: harbor.local/busybox:1.36
"#,
        );
        assert_eq!(patch, expected);
    }

    #[test]
    fn test_set_path_type_conflict() {
        let mut patch = yaml("a: scalar\n");
        let path = ValuePath::parse("a.b").unwrap();
        let err = patch
            .set_path(&path, Node::from("x"), &Node::empty_map())
            .unwrap_err();
        assert!(matches!(err, Error::Path { .. }));
    }

    #[test]
    fn test_json_and_yaml_decode_to_same_tree() {
        let from_yaml = yaml("image:\n  repository: nginx\n  tag: \"1.25\"\n");
        let from_json: Node =
            serde_json::from_str(r#"{"image": {"repository": "nginx", "tag": "1.25"}}"#).unwrap();
        assert_eq!(from_yaml, from_json);
    }
}

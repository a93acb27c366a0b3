//! Nested component configuration
//!
//! A [`ConfigTree`] is what callers hand to `Container::add_config`. Branches become key
//! path segments and leaves become component definitions, so
//! `{Norma: {Example: {ServiceInterface: "Norma\\Example\\ConcreteService"}}}` declares
//! the key `Norma|Example|ServiceInterface`.

use crate::{Result, Value, key};
use std::collections::BTreeMap;

/// A node of the configuration tree
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigNode {
    /// Nested configuration
    Branch(ConfigTree),
    /// A component definition
    Leaf(Value),
}

/// Nested configuration of component definitions.
///
/// # Examples
///
/// ```rust
/// use norma_di::{ConfigTree, Value};
///
/// let config = ConfigTree::new()
///     .branch("Norma", ConfigTree::new()
///         .branch("Example", ConfigTree::new()
///             .leaf("ServiceInterface", "Norma\\Example\\ConcreteService")))
///     .set("Norma.Mail.host", "smtp.local");
///
/// assert_eq!(
///     config.get("Norma.Mail.host").and_then(|node| node.as_leaf()),
///     Some(&Value::from("smtp.local"))
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigTree {
    entries: BTreeMap<String, ConfigNode>,
}

impl ConfigNode {
    /// The leaf value, if this is a leaf
    #[inline]
    pub fn as_leaf(&self) -> Option<&Value> {
        match self {
            ConfigNode::Leaf(value) => Some(value),
            ConfigNode::Branch(_) => None,
        }
    }

    /// The subtree, if this is a branch
    #[inline]
    pub fn as_branch(&self) -> Option<&ConfigTree> {
        match self {
            ConfigNode::Branch(tree) => Some(tree),
            ConfigNode::Leaf(_) => None,
        }
    }
}

impl ConfigTree {
    /// Create an empty tree
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a leaf definition under `name`
    #[inline]
    pub fn leaf(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries
            .insert(name.into(), ConfigNode::Leaf(value.into()));
        self
    }

    /// Add a subtree under `name`
    #[inline]
    pub fn branch(mut self, name: impl Into<String>, tree: ConfigTree) -> Self {
        self.entries.insert(name.into(), ConfigNode::Branch(tree));
        self
    }

    /// Set a leaf at a delimited path, creating branches on the way.
    ///
    /// A leaf found on the way is replaced by a branch.
    pub fn set(mut self, path: &str, value: impl Into<Value>) -> Self {
        let segments = key::segments(path);
        self.insert_path(&segments, value.into());
        self
    }

    fn insert_path(&mut self, segments: &[String], value: Value) {
        let Some((first, rest)) = segments.split_first() else {
            return;
        };
        if rest.is_empty() {
            self.entries.insert(first.clone(), ConfigNode::Leaf(value));
            return;
        }
        let node = self
            .entries
            .entry(first.clone())
            .or_insert_with(|| ConfigNode::Branch(ConfigTree::new()));
        if let ConfigNode::Leaf(_) = node {
            *node = ConfigNode::Branch(ConfigTree::new());
        }
        if let ConfigNode::Branch(tree) = node {
            tree.insert_path(rest, value);
        }
    }

    /// Look up a node by delimited path
    pub fn get(&self, path: &str) -> Option<&ConfigNode> {
        let segments = key::segments(path);
        let (last, parents) = segments.split_last()?;
        let mut tree = self;
        for segment in parents {
            tree = tree.entries.get(segment)?.as_branch()?;
        }
        tree.entries.get(last)
    }

    /// Iterate over the direct children
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ConfigNode)> {
        self.entries.iter()
    }

    /// Number of direct children
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flatten into `(segments, definition)` pairs.
    ///
    /// Raw names are validated: the reserved separator is rejected, and namespaced names
    /// (`Norma\Example`) expand into several segments. Empty branches declare nothing.
    pub(crate) fn flatten(&self) -> Result<Vec<(Vec<String>, Value)>> {
        let mut out = Vec::new();
        self.flatten_into(&mut Vec::new(), &mut out)?;
        Ok(out)
    }

    fn flatten_into(
        &self,
        prefix: &mut Vec<String>,
        out: &mut Vec<(Vec<String>, Value)>,
    ) -> Result<()> {
        for (name, node) in &self.entries {
            let segments = key::config_segments(name)?;
            let depth = prefix.len();
            prefix.extend(segments);
            match node {
                ConfigNode::Leaf(value) => {
                    if prefix.len() > depth {
                        out.push((prefix.clone(), value.clone()));
                    }
                }
                ConfigNode::Branch(tree) => tree.flatten_into(prefix, out)?,
            }
            prefix.truncate(depth);
        }
        Ok(())
    }

    /// Rebuild a nested tree from normalized keys.
    pub(crate) fn from_flat<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        let mut tree = ConfigTree::new();
        for (flat_key, value) in entries {
            let segments: Vec<String> = key::split(flat_key).map(str::to_string).collect();
            tree.insert_path(&segments, value);
        }
        tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DiError;

    #[test]
    fn test_flatten_nested() {
        let config = ConfigTree::new()
            .branch(
                "Norma",
                ConfigTree::new().branch(
                    "Example",
                    ConfigTree::new().leaf("ServiceInterface", "ConcreteService"),
                ),
            )
            .leaf("debug", true);

        let mut flat = config.flatten().unwrap();
        flat.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(flat.len(), 2);
        assert_eq!(
            flat[0].0,
            vec!["Norma".to_string(), "Example".into(), "ServiceInterface".into()]
        );
        assert_eq!(flat[1].0, vec!["debug".to_string()]);
    }

    #[test]
    fn test_flatten_expands_namespaced_segments() {
        let config = ConfigTree::new().leaf("Norma\\Example\\Logger", "StdoutLogger");
        let flat = config.flatten().unwrap();
        assert_eq!(
            flat[0].0,
            vec!["Norma".to_string(), "Example".into(), "Logger".into()]
        );
    }

    #[test]
    fn test_flatten_rejects_separator() {
        let config = ConfigTree::new().branch("a", ConfigTree::new().leaf("b|c", 1));
        let err = config.flatten().unwrap_err();
        assert!(matches!(err, DiError::ConfigurationKeyConflict { .. }));
    }

    #[test]
    fn test_round_trip_through_flat_keys() {
        let config = ConfigTree::new()
            .set("Norma.Example.ServiceInterface", "ConcreteService")
            .set("Norma.Example.retries", 3)
            .set("app", "demo");

        let flat: Vec<(String, Value)> = config
            .flatten()
            .unwrap()
            .into_iter()
            .map(|(segments, value)| (key::join(&segments), value))
            .collect();
        let rebuilt = ConfigTree::from_flat(flat.iter().map(|(k, v)| (k.as_str(), v.clone())));

        assert_eq!(rebuilt, config);
    }

    #[test]
    fn test_set_replaces_leaf_with_branch() {
        let config = ConfigTree::new().set("a", 1).set("a.b", 2);
        assert!(config.get("a").and_then(ConfigNode::as_branch).is_some());
        assert_eq!(
            config.get("a.b").and_then(ConfigNode::as_leaf),
            Some(&Value::Int(2))
        );
    }
}

//! Reversed path-key trie used to qualify short component names
//!
//! Every declared key is indexed leaf-first (`Norma|Example|Service` is stored as
//! `Service -> Example -> Norma`). Qualifying a name walks the trie from the name's last
//! segment backwards and then follows single-child chains until a declared key is
//! reached, so `Service` and `Example|Service` both expand to `Norma|Example|Service`.
//! When the walk reaches a branch before a declared key the name is ambiguous.

use crate::key;
use crate::{DiError, Result};
use ahash::AHashMap;

#[derive(Debug, Default, Clone)]
struct TrieNode {
    children: AHashMap<String, TrieNode>,
    /// A declared key ends at this node
    terminal: bool,
}

impl TrieNode {
    /// Collect every declared key below this node.
    ///
    /// `reversed` is the leaf-first path from the root to this node.
    fn collect_keys(&self, reversed: &mut Vec<String>, out: &mut Vec<String>) {
        if self.terminal {
            let mut path = reversed.clone();
            path.reverse();
            out.push(key::join(&path));
        }
        for (segment, child) in &self.children {
            reversed.push(segment.clone());
            child.collect_keys(reversed, out);
            reversed.pop();
        }
    }
}

/// Clear the terminal mark for `segments` below `node`; `segments` is consumed from the end.
fn unindex<S: AsRef<str>>(node: &mut TrieNode, segments: &[S]) -> bool {
    match segments.split_last() {
        None => std::mem::replace(&mut node.terminal, false),
        Some((last, rest)) => {
            let Some(child) = node.children.get_mut(last.as_ref()) else {
                return false;
            };
            let removed = unindex(child, rest);
            if !child.terminal && child.children.is_empty() {
                node.children.remove(last.as_ref());
            }
            removed
        }
    }
}

/// Index of declared component keys for short-name qualification.
#[derive(Debug, Default, Clone)]
pub struct QualificationTrie {
    root: TrieNode,
    len: usize,
}

impl QualificationTrie {
    /// Create an empty trie.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a declared key given as path segments (root-first).
    ///
    /// Indexing the same key twice is a no-op.
    pub fn index<S: AsRef<str>>(&mut self, segments: &[S]) {
        if segments.is_empty() {
            return;
        }
        let mut node = &mut self.root;
        for segment in segments.iter().rev() {
            node = node
                .children
                .entry(segment.as_ref().to_string())
                .or_default();
        }
        if !node.terminal {
            node.terminal = true;
            self.len += 1;
        }
    }

    /// Remove a declared key, pruning branches that no longer lead anywhere.
    ///
    /// Returns whether the key was indexed.
    pub fn remove<S: AsRef<str>>(&mut self, segments: &[S]) -> bool {
        if segments.is_empty() {
            return false;
        }
        let removed = unindex(&mut self.root, segments);
        if removed {
            self.len -= 1;
        }
        removed
    }

    /// Index a declared key given in normalized form.
    #[inline]
    pub fn index_key(&mut self, key: &str) {
        let segments: Vec<&str> = key::split(key).collect();
        self.index(&segments);
    }

    /// Whether exactly this key was indexed.
    pub fn contains<S: AsRef<str>>(&self, segments: &[S]) -> bool {
        let mut node = &self.root;
        for segment in segments.iter().rev() {
            match node.children.get(segment.as_ref()) {
                Some(child) => node = child,
                None => return false,
            }
        }
        !segments.is_empty() && node.terminal
    }

    /// Expand possibly-short segments into the fully qualified declared path.
    ///
    /// Names whose trailing segments are unknown to the trie come back unchanged; the
    /// container then treats them as undeclared (class names, ad-hoc keys).
    pub fn qualify<S: AsRef<str>>(&self, segments: &[S]) -> Result<Vec<String>> {
        let as_is = || segments.iter().map(|s| s.as_ref().to_string()).collect();
        if segments.is_empty() {
            return Ok(Vec::new());
        }

        let mut node = &self.root;
        let mut reversed: Vec<String> = Vec::with_capacity(segments.len());
        for segment in segments.iter().rev() {
            match node.children.get(segment.as_ref()) {
                Some(child) => {
                    reversed.push(segment.as_ref().to_string());
                    node = child;
                }
                None => return Ok(as_is()),
            }
        }

        while !node.terminal {
            if node.children.len() > 1 {
                let mut candidates = Vec::new();
                node.collect_keys(&mut reversed, &mut candidates);
                candidates.sort();
                return Err(DiError::ambiguous(key::join(segments), candidates));
            }
            match node.children.iter().next() {
                Some((segment, child)) => {
                    reversed.push(segment.clone());
                    node = child;
                }
                None => break,
            }
        }

        reversed.reverse();
        Ok(reversed)
    }

    /// Normalize and qualify a requested name, returning the key form.
    pub fn qualify_name(&self, name: &str) -> Result<String> {
        if key::is_parameter_key(name) {
            return Ok(name.to_string());
        }
        let segments = key::segments(name);
        Ok(key::join(&self.qualify(&segments)?))
    }

    /// Number of indexed keys
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trie(keys: &[&str]) -> QualificationTrie {
        let mut trie = QualificationTrie::new();
        for k in keys {
            trie.index_key(&key::normalize(k));
        }
        trie
    }

    #[test]
    fn test_short_name_expands_to_unique_key() {
        let trie = trie(&["Norma.Example.ServiceInterface", "Norma.Example.Logger"]);
        assert_eq!(
            trie.qualify_name("ServiceInterface").unwrap(),
            "Norma|Example|ServiceInterface"
        );
        assert_eq!(
            trie.qualify_name("Example\\Logger").unwrap(),
            "Norma|Example|Logger"
        );
    }

    #[test]
    fn test_qualification_is_idempotent() {
        let trie = trie(&["a.b.Foo", "x.y.Bar"]);
        let once = trie.qualify_name("a|b|Foo").unwrap();
        let twice = trie.qualify_name(&once).unwrap();
        assert_eq!(once, "a|b|Foo");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_ambiguous_short_name() {
        let trie = trie(&["a.b.Foo", "x.y.Foo"]);
        match trie.qualify_name("Foo") {
            Err(DiError::AmbiguousComponentName { name, candidates }) => {
                assert_eq!(name, "Foo");
                assert_eq!(candidates, vec!["a|b|Foo".to_string(), "x|y|Foo".to_string()]);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
        assert_eq!(trie.qualify_name("b.Foo").unwrap(), "a|b|Foo");
    }

    #[test]
    fn test_ambiguity_after_single_child_chain() {
        let trie = trie(&["a.x.Foo", "b.x.Foo"]);
        let err = trie.qualify_name("Foo").unwrap_err();
        assert!(matches!(err, DiError::AmbiguousComponentName { .. }));
    }

    #[test]
    fn test_declared_short_key_wins_over_longer_keys() {
        let trie = trie(&["Foo", "a.Foo", "b.Foo"]);
        assert_eq!(trie.qualify_name("Foo").unwrap(), "Foo");
        assert_eq!(trie.qualify_name("a.Foo").unwrap(), "a|Foo");
    }

    // Unknown names pass through unqualified on purpose: class names and ad-hoc keys
    // rely on it.
    #[test]
    fn test_unknown_name_returned_as_is() {
        let trie = trie(&["a.b.Foo"]);
        assert_eq!(trie.qualify_name("Norma\\Unknown").unwrap(), "Norma|Unknown");
        assert_eq!(trie.qualify_name("c.Foo").unwrap(), "c|Foo");
    }

    #[test]
    fn test_index_is_idempotent() {
        let mut trie = trie(&["a.b.Foo"]);
        trie.index_key("a|b|Foo");
        assert_eq!(trie.len(), 1);
        assert!(trie.contains(&["a", "b", "Foo"]));
        assert!(!trie.contains(&["b", "Foo"]));
    }

    #[test]
    fn test_remove_prunes_and_disambiguates() {
        let mut trie = trie(&["a.b.Foo", "x.y.Foo"]);
        assert!(trie.remove(&["x", "y", "Foo"]));
        assert!(!trie.remove(&["x", "y", "Foo"]));
        assert_eq!(trie.len(), 1);
        assert_eq!(trie.qualify_name("Foo").unwrap(), "a|b|Foo");
    }
}

//! Component storage for the container
//!
//! Holds the declared configuration, the resolved-instance store, the contextual
//! binding table and the contextual resolved store. Uses `DashMap` with `ahash` for
//! concurrent access; the qualification trie sits behind an `RwLock` since it is read on
//! every request and written only by config merges.

use crate::config::ConfigTree;
use crate::key;
use crate::trie::QualificationTrie;
use crate::{Result, Value};
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Create a map with the shard count used for all stores.
///
/// Typical configurations hold tens of components, so 8 shards balance creation
/// speed against concurrent access.
fn map<K: Eq + std::hash::Hash, V>() -> DashMap<K, V, RandomState> {
    DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), 8)
}

/// Thread-safe storage for component definitions and resolved values
pub(crate) struct ComponentStore {
    /// Qualified key -> definition
    config: DashMap<String, Value, RandomState>,
    /// Qualified key -> resolved singleton value
    resolved: DashMap<String, Value, RandomState>,
    /// (consumer, needed) -> (bind order, definition), names as normalized at bind time
    bindings: DashMap<(String, String), (u64, Value), RandomState>,
    bind_order: AtomicU64,
    /// (qualified consumer, needed key) -> resolved contextual value
    contextual: DashMap<(String, String), Value, RandomState>,
    trie: RwLock<QualificationTrie>,
}

impl ComponentStore {
    pub fn new() -> Self {
        Self {
            config: map(),
            resolved: map(),
            bindings: map(),
            bind_order: AtomicU64::new(0),
            contextual: map(),
            trie: RwLock::new(QualificationTrie::new()),
        }
    }

    fn trie(&self) -> RwLockReadGuard<'_, QualificationTrie> {
        self.trie.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn trie_mut(&self) -> RwLockWriteGuard<'_, QualificationTrie> {
        self.trie.write().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Merge a config tree. Returns the keys that were (re)declared.
    ///
    /// Nothing is written unless the whole tree validates.
    pub fn merge(&self, tree: &ConfigTree) -> Result<Vec<String>> {
        let entries = tree.flatten()?;
        let mut declared = Vec::with_capacity(entries.len());
        for (segments, definition) in entries {
            declared.push(self.declare(&segments, definition));
        }
        Ok(declared)
    }

    /// Declare one component from already validated segments.
    ///
    /// Replaces the key's definition, drops its cached value, and removes entries the
    /// new key shadows (a leaf above it or a subtree below it).
    pub fn declare<S: AsRef<str>>(&self, segments: &[S], definition: Value) -> String {
        let flat = key::join(segments);
        let subtree = format!("{flat}{}", key::SEPARATOR);

        let shadowed: Vec<String> = self
            .config
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|existing| {
                existing.starts_with(&subtree)
                    || flat.starts_with(&format!("{existing}{}", key::SEPARATOR))
            })
            .collect();

        {
            let mut trie = self.trie_mut();
            for existing in &shadowed {
                let existing_segments: Vec<&str> = key::split(existing).collect();
                trie.remove(&existing_segments);
            }
            trie.index(segments);
        }
        for existing in &shadowed {
            self.config.remove(existing);
            self.resolved.remove(existing);
        }

        self.config.insert(flat.clone(), definition);
        self.resolved.remove(&flat);
        flat
    }

    /// Definition declared for a qualified key
    #[inline]
    pub fn definition(&self, key: &str) -> Option<Value> {
        self.config.get(key).map(|entry| entry.value().clone())
    }

    #[inline]
    pub fn is_declared(&self, key: &str) -> bool {
        self.config.contains_key(key)
    }

    /// Rebuild the nested configuration
    pub fn config_tree(&self) -> ConfigTree {
        let entries: Vec<(String, Value)> = self
            .config
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        ConfigTree::from_flat(entries.iter().map(|(k, v)| (k.as_str(), v.clone())))
    }

    /// Number of declared components
    #[inline]
    pub fn len(&self) -> usize {
        self.config.len()
    }

    // =========================================================================
    // Qualification
    // =========================================================================

    /// Normalize and qualify a requested name against the declared keys
    #[inline]
    pub fn qualify(&self, name: &str) -> Result<String> {
        self.trie().qualify_name(name)
    }

    // =========================================================================
    // Resolved-instance store
    // =========================================================================

    #[inline]
    pub fn resolved(&self, key: &str) -> Option<Value> {
        self.resolved.get(key).map(|entry| entry.value().clone())
    }

    #[inline]
    pub fn store(&self, key: &str, value: Value) {
        self.resolved.insert(key.to_string(), value);
    }

    // =========================================================================
    // Contextual bindings
    // =========================================================================

    /// Register a contextual definition.
    ///
    /// Resolved contextual values are keyed by qualified names, which a new binding may
    /// shadow, so they are all dropped.
    pub fn bind(&self, consumer: String, needed: String, definition: Value) {
        self.contextual.clear();
        let order = self.bind_order.fetch_add(1, Ordering::Relaxed);
        self.bindings.insert((consumer, needed), (order, definition));
    }

    /// Find the contextual definition for `needed` while resolving dependencies of
    /// `consumer` (both qualified).
    ///
    /// Binding keys are qualified at lookup time so bindings registered before the
    /// matching config still apply. Bindings whose names have become ambiguous never
    /// match. When several spellings of the same names match, the latest binding wins.
    pub fn binding(&self, consumer: &str, needed: &str) -> Option<Value> {
        let trie = self.trie();
        let qualifies_to = |name: &str, target: &str| {
            name == target
                || (!key::is_parameter_key(name)
                    && trie.qualify_name(name).is_ok_and(|qualified| qualified == target))
        };
        self.bindings
            .iter()
            .filter(|entry| {
                let (bound_consumer, bound_needed) = entry.key();
                qualifies_to(bound_consumer, consumer) && qualifies_to(bound_needed, needed)
            })
            .map(|entry| entry.value().clone())
            .max_by_key(|(order, _)| *order)
            .map(|(_, definition)| definition)
    }

    #[inline]
    pub fn contextual(&self, consumer: &str, needed: &str) -> Option<Value> {
        self.contextual
            .get(&(consumer.to_string(), needed.to_string()))
            .map(|entry| entry.value().clone())
    }

    #[inline]
    pub fn store_contextual(&self, consumer: &str, needed: &str, value: Value) {
        self.contextual
            .insert((consumer.to_string(), needed.to_string()), value);
    }
}

impl std::fmt::Debug for ComponentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentStore")
            .field("declared", &self.config.len())
            .field("resolved", &self.resolved.len())
            .field("bindings", &self.bindings.len())
            .finish()
    }
}

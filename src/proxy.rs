//! Lazy component proxies
//!
//! A lazy component is handed out as an [`Object`] whose instance does not exist yet.
//! The first access to the instance runs the initializer, which builds the real component
//! through the normal resolution pipeline; the result is kept for the proxy's lifetime.
//!
//! Proxy blueprints (the generated proxy type for a class) are published in a
//! [`ProxyCache`]. [`MemoryProxyCache`] never blocks on a generation already in progress:
//! the second caller builds a throwaway blueprint instead.

use crate::reflect::ClassDescriptor;
use crate::value::Instance;
use crate::{DiError, Object, Result};
use ahash::RandomState;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use once_cell::sync::OnceCell;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Builds the real instance behind a lazy proxy
pub type Initializer = Box<dyn Fn() -> Result<Instance> + Send + Sync>;

/// Shape of the proxy type generated for a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyBlueprint {
    proxy_name: String,
    target: String,
    methods: Vec<String>,
}

impl ProxyBlueprint {
    /// Derive the blueprint for a proxyable class.
    pub fn for_class(class: &ClassDescriptor) -> Self {
        Self {
            proxy_name: format!("{}|LazyProxy", class.key()),
            target: class.key().to_string(),
            methods: class
                .methods()
                .iter()
                .map(|method| method.name().to_string())
                .collect(),
        }
    }

    #[inline]
    pub fn proxy_name(&self) -> &str {
        &self.proxy_name
    }

    /// Key of the proxied class
    #[inline]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Methods forwarded to the real instance
    #[inline]
    pub fn methods(&self) -> &[String] {
        &self.methods
    }
}

/// Store for generated proxy blueprints.
pub trait ProxyCache: Send + Sync {
    /// Return the blueprint published under `key`, generating it if needed.
    ///
    /// Must not block on another caller's generation of the same key.
    fn get_or_generate(&self, key: &str, generate: &dyn Fn() -> ProxyBlueprint)
    -> Arc<ProxyBlueprint>;
}

/// In-memory blueprint cache with non-blocking per-key generation locks.
pub struct MemoryProxyCache {
    published: DashMap<String, Arc<ProxyBlueprint>, RandomState>,
    generating: DashMap<String, (), RandomState>,
}

/// Releases a generation lock, also on unwind
struct GenerationLock<'a> {
    generating: &'a DashMap<String, (), RandomState>,
    key: &'a str,
}

impl Drop for GenerationLock<'_> {
    fn drop(&mut self) {
        self.generating.remove(self.key);
    }
}

impl MemoryProxyCache {
    pub fn new() -> Self {
        Self {
            published: DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), 8),
            generating: DashMap::with_capacity_and_hasher_and_shard_amount(
                0,
                RandomState::new(),
                8,
            ),
        }
    }

    /// Take the generation lock for `key` if nobody holds it.
    fn try_lock<'a>(&'a self, key: &'a str) -> Option<GenerationLock<'a>> {
        match self.generating.entry(key.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(GenerationLock {
                    generating: &self.generating,
                    key,
                })
            }
        }
    }

    /// Number of published blueprints
    #[inline]
    pub fn len(&self) -> usize {
        self.published.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.published.is_empty()
    }
}

impl Default for MemoryProxyCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ProxyCache for MemoryProxyCache {
    fn get_or_generate(
        &self,
        key: &str,
        generate: &dyn Fn() -> ProxyBlueprint,
    ) -> Arc<ProxyBlueprint> {
        if let Some(published) = self.published.get(key) {
            return Arc::clone(published.value());
        }

        let Some(_lock) = self.try_lock(key) else {
            #[cfg(feature = "logging")]
            trace!(
                target: "norma_di",
                class = key,
                "Proxy generation in progress elsewhere, using ephemeral blueprint"
            );
            return Arc::new(generate());
        };

        let blueprint = Arc::new(generate());
        self.published
            .insert(key.to_string(), Arc::clone(&blueprint));
        blueprint
    }
}

impl std::fmt::Debug for MemoryProxyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryProxyCache")
            .field("published", &self.published.len())
            .field("generating", &self.generating.len())
            .finish()
    }
}

/// State behind a lazy [`Object`].
pub struct LazyProxy {
    blueprint: Arc<ProxyBlueprint>,
    instance: OnceCell<Instance>,
    initializer: Initializer,
    /// Thread currently running the initializer
    initializing: Mutex<Option<ThreadId>>,
}

/// Clears the initializing marker, also when the initializer panics
struct Initializing<'a>(&'a LazyProxy);

impl Drop for Initializing<'_> {
    fn drop(&mut self) {
        *self.0.initializing() = None;
    }
}

impl LazyProxy {
    pub fn new(blueprint: Arc<ProxyBlueprint>, initializer: Initializer) -> Self {
        Self {
            blueprint,
            instance: OnceCell::new(),
            initializer,
            initializing: Mutex::new(None),
        }
    }

    fn initializing(&self) -> MutexGuard<'_, Option<ThreadId>> {
        self.initializing.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    pub fn blueprint(&self) -> &ProxyBlueprint {
        &self.blueprint
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.instance.get().is_some()
    }

    /// The real instance, built on first access.
    ///
    /// A failed initialization is not cached; the next access retries. Reaching the same
    /// proxy again from inside its own initializer is a circular dependency; other threads
    /// wait for the running initialization.
    pub fn instance(&self) -> Result<Instance> {
        if let Some(instance) = self.instance.get() {
            return Ok(Arc::clone(instance));
        }
        let current = thread::current().id();
        if *self.initializing() == Some(current) {
            return Err(DiError::circular(self.blueprint.target()));
        }

        self.instance
            .get_or_try_init(|| {
                *self.initializing() = Some(current);
                let _marker = Initializing(self);

                #[cfg(feature = "logging")]
                debug!(
                    target: "norma_di",
                    class = self.blueprint.target(),
                    proxy = self.blueprint.proxy_name(),
                    "Lazy component initializing on first access"
                );

                (self.initializer)()
            })
            .map(Arc::clone)
    }
}

impl std::fmt::Debug for LazyProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyProxy")
            .field("blueprint", &self.blueprint)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

/// Creates lazy proxies for classes.
pub trait ProxyFactory: Send + Sync {
    fn make_proxy(&self, class: Arc<ClassDescriptor>, initializer: Initializer) -> Result<Object>;
}

/// Proxy factory forwarding every access through [`Object::instance`].
pub struct VirtualProxyFactory {
    cache: Arc<dyn ProxyCache>,
}

impl VirtualProxyFactory {
    /// Factory with a private [`MemoryProxyCache`]
    pub fn new() -> Self {
        Self::with_cache(Arc::new(MemoryProxyCache::new()))
    }

    pub fn with_cache(cache: Arc<dyn ProxyCache>) -> Self {
        Self { cache }
    }

    /// Reject classes a proxy cannot stand in for.
    fn check_proxyable(class: &ClassDescriptor) -> Result<()> {
        if class.is_sealed() {
            return Err(DiError::lazy_target(class.key(), "class is sealed"));
        }
        if let Some(method) = class.methods().iter().find(|method| method.is_sealed()) {
            return Err(DiError::lazy_target(
                class.key(),
                format!("method {} is sealed", method.name()),
            ));
        }
        Ok(())
    }
}

impl Default for VirtualProxyFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ProxyFactory for VirtualProxyFactory {
    fn make_proxy(&self, class: Arc<ClassDescriptor>, initializer: Initializer) -> Result<Object> {
        Self::check_proxyable(&class)?;

        let blueprint = self
            .cache
            .get_or_generate(class.key(), &|| ProxyBlueprint::for_class(&class));

        #[cfg(feature = "logging")]
        debug!(
            target: "norma_di",
            class = class.key(),
            proxy = blueprint.proxy_name(),
            "Created lazy proxy"
        );

        let proxy = Arc::new(LazyProxy::new(blueprint, initializer));
        Ok(Object::lazy(class, proxy))
    }
}

impl std::fmt::Debug for VirtualProxyFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualProxyFactory").finish_non_exhaustive()
    }
}

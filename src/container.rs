//! Component container
//!
//! The `Container` owns the component configuration, the resolved-instance stores, the
//! class registry and the collaborators used while resolving (annotation parser,
//! use-statement resolver, proxy factory). Cloning a container shares all of it.

use crate::annotation::{AnnotationParser, DocParser, ImportMap, UseStatementResolver};
use crate::config::ConfigTree;
use crate::proxy::{ProxyFactory, VirtualProxyFactory};
use crate::reflect::{ClassDescriptor, ClassRegistry, Inspectable};
use crate::session::Session;
use crate::storage::ComponentStore;
use crate::{DiError, Invocable, Object, Overrides, Result, Value, key};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::debug;

/// Shared container state; the resolution pipeline lives in `resolver`.
pub(crate) struct Inner {
    pub(crate) store: ComponentStore,
    pub(crate) classes: ClassRegistry,
    pub(crate) annotations: Arc<dyn AnnotationParser>,
    pub(crate) imports: Arc<dyn UseStatementResolver>,
    pub(crate) proxies: Arc<dyn ProxyFactory>,
}

/// Dependency injection container.
///
/// # Examples
///
/// ```rust
/// use norma_di::{ClassBuilder, ConfigTree, Container, Parameter, Signature};
///
/// struct Mailer {
///     host: String,
/// }
///
/// let container = Container::new();
/// container.register_class(
///     ClassBuilder::<Mailer>::new("App\\Mailer")
///         .constructor(
///             Signature::new()
///                 .param(Parameter::new("host"))
///                 .doc("@inject $host App.Mail.host"),
///             |args| Ok(Mailer { host: args.string("host")? }),
///         )
///         .build(),
/// );
/// container
///     .add_config(
///         ConfigTree::new()
///             .set("App.Mail.host", "smtp.local")
///             .set("App.Mail.mailer", "App\\Mailer"),
///     )
///     .unwrap();
///
/// let mailer = container.get_as::<Mailer>("mailer").unwrap();
/// assert_eq!(mailer.host, "smtp.local");
/// ```
#[derive(Clone)]
pub struct Container {
    pub(crate) inner: Arc<Inner>,
}

impl Container {
    /// Create a container with the default collaborators.
    #[inline]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start configuring a container
    #[inline]
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::default()
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Merge nested configuration into the container.
    ///
    /// Fails without changing anything if a key segment contains `|`. Redeclared keys
    /// drop their cached instance.
    pub fn add_config(&self, config: ConfigTree) -> Result<()> {
        let _declared = self.inner.store.merge(&config)?;

        #[cfg(feature = "logging")]
        debug!(
            target: "norma_di",
            declared = _declared.len(),
            total = self.inner.store.len(),
            "Merged component configuration"
        );

        Ok(())
    }

    /// Current configuration as a nested tree
    #[inline]
    pub fn get_config(&self) -> ConfigTree {
        self.inner.store.config_tree()
    }

    /// Register a contextual override.
    ///
    /// While the dependencies of `consumer` are resolved, requests for `needed` (a
    /// component name or a `$param` name) use `definition` instead of the global one.
    pub fn bind_contextually(&self, consumer: &str, needed: &str, definition: impl Into<Value>) {
        let consumer = key::normalize(consumer);
        let needed = key::normalize(needed);

        #[cfg(feature = "logging")]
        debug!(
            target: "norma_di",
            consumer = %consumer,
            needed = %needed,
            "Registered contextual binding"
        );

        self.inner.store.bind(consumer, needed, definition.into());
    }

    /// Register a self-describing type.
    #[inline]
    pub fn register<T: Inspectable>(&self) {
        self.register_class(T::describe());
    }

    /// Register a class descriptor, replacing any earlier one for the same class.
    pub fn register_class(&self, descriptor: ClassDescriptor) {
        #[cfg(feature = "logging")]
        debug!(
            target: "norma_di",
            class = descriptor.key(),
            kind = ?descriptor.kind(),
            "Registered class"
        );

        self.inner.classes.register(descriptor);
    }

    /// Registered descriptor of a class
    #[inline]
    pub fn class(&self, name: &str) -> Option<Arc<ClassDescriptor>> {
        self.inner.classes.get(name)
    }

    /// Qualify a (possibly short) component name against the declared keys.
    #[inline]
    pub fn qualify(&self, name: &str) -> Result<String> {
        self.inner.store.qualify(name)
    }

    /// Whether the name qualifies to a declared component
    pub fn is_declared(&self, name: &str) -> bool {
        self.qualify(name)
            .map(|key| self.inner.store.is_declared(&key))
            .unwrap_or(false)
    }

    /// Number of declared components
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.store.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Resolve a component.
    ///
    /// `component` may be a declared key (short names are qualified), a registered class
    /// name, a [`ContainerComponent`](crate::ContainerComponent), a
    /// [`Callable`](crate::Callable) (invoked with resolved parameters) or any other value
    /// (returned as is).
    pub fn get(&self, component: impl Into<Value>) -> Result<Value> {
        let mut session = Session::new();
        self.inner.get_in(&mut session, component.into(), None)
    }

    /// Resolve a component that must be an object.
    pub fn get_object(&self, component: impl Into<Value>) -> Result<Object> {
        match self.get(component)? {
            Value::Object(object) => Ok(object),
            other => Err(DiError::TypeMismatch {
                expected: "object".to_string(),
                found: other.type_name().to_string(),
            }),
        }
    }

    /// Resolve a component and downcast it.
    #[inline]
    pub fn get_as<T: Send + Sync + 'static>(&self, component: impl Into<Value>) -> Result<Arc<T>> {
        self.get_object(component)?.downcast::<T>()
    }

    /// Resolve a component and view it as a registered trait object.
    #[inline]
    pub fn get_cast<I: ?Sized + Send + Sync + 'static>(
        &self,
        component: impl Into<Value>,
    ) -> Result<Arc<I>> {
        self.get_object(component)?.cast::<I>()
    }

    /// Invoke a callable or a component method with resolved parameters.
    ///
    /// `overrides` take precedence over every other parameter source.
    pub fn call(&self, target: impl Into<Invocable>, overrides: Overrides) -> Result<Value> {
        let mut session = Session::new();
        self.inner.call_in(&mut session, target.into(), &overrides)
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("store", &self.inner.store)
            .field("classes", &self.inner.classes.len())
            .finish()
    }
}

/// Builder for a [`Container`] with custom collaborators.
///
/// ```rust
/// use norma_di::{Container, ImportMap};
///
/// let container = Container::builder()
///     .use_statements(ImportMap::new().import("App", "Norma\\Mail\\Mailer"))
///     .build();
/// assert!(container.is_empty());
/// ```
#[derive(Default)]
pub struct ContainerBuilder {
    annotations: Option<Arc<dyn AnnotationParser>>,
    imports: Option<Arc<dyn UseStatementResolver>>,
    proxies: Option<Arc<dyn ProxyFactory>>,
}

impl ContainerBuilder {
    /// Source of `@inject` metadata (default: [`DocParser`])
    pub fn annotation_parser(mut self, parser: impl AnnotationParser + 'static) -> Self {
        self.annotations = Some(Arc::new(parser));
        self
    }

    /// Import lookup for short annotation names (default: empty [`ImportMap`])
    pub fn use_statements(mut self, resolver: impl UseStatementResolver + 'static) -> Self {
        self.imports = Some(Arc::new(resolver));
        self
    }

    /// Lazy proxy factory (default: [`VirtualProxyFactory`])
    pub fn proxy_factory(mut self, factory: impl ProxyFactory + 'static) -> Self {
        self.proxies = Some(Arc::new(factory));
        self
    }

    pub fn build(self) -> Container {
        #[cfg(feature = "logging")]
        debug!(
            target: "norma_di",
            custom_annotations = self.annotations.is_some(),
            custom_imports = self.imports.is_some(),
            custom_proxies = self.proxies.is_some(),
            "Creating new DI container"
        );

        Container {
            inner: Arc::new(Inner {
                store: ComponentStore::new(),
                classes: ClassRegistry::new(),
                annotations: self
                    .annotations
                    .unwrap_or_else(|| Arc::new(DocParser::new())),
                imports: self.imports.unwrap_or_else(|| Arc::new(ImportMap::new())),
                proxies: self
                    .proxies
                    .unwrap_or_else(|| Arc::new(VirtualProxyFactory::new())),
            }),
        }
    }
}

impl std::fmt::Debug for ContainerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("annotations", &self.annotations.is_some())
            .field("imports", &self.imports.is_some())
            .field("proxies", &self.proxies.is_some())
            .finish()
    }
}

//! Runtime class descriptions
//!
//! The container cannot inspect Rust types, so every class it constructs describes
//! itself with a [`ClassDescriptor`]: constructor parameters, injectable properties,
//! invokable methods and the trait objects the instance can be viewed as. Descriptors are
//! built with a typed [`ClassBuilder`], either by hand or through `#[derive(Inspectable)]`,
//! and kept in a [`ClassRegistry`].
//!
//! # Examples
//!
//! ```rust
//! use norma_di::{ClassBuilder, Inspectable, ClassDescriptor, Parameter, Signature};
//! use std::sync::Arc;
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! struct Polite {
//!     name: String,
//! }
//!
//! impl Greeter for Polite {
//!     fn greet(&self) -> String {
//!         format!("Good day, {}", self.name)
//!     }
//! }
//!
//! impl Inspectable for Polite {
//!     fn describe() -> ClassDescriptor {
//!         ClassBuilder::<Polite>::new("App\\Polite")
//!             .constructor(Signature::new().param(Parameter::new("name")), |args| {
//!                 Ok(Polite { name: args.string("name")? })
//!             })
//!             .implements::<dyn Greeter>("App\\Greeter", |this| this)
//!             .build()
//!     }
//! }
//!
//! let descriptor = Polite::describe();
//! assert_eq!(descriptor.key(), "App|Polite");
//! assert!(descriptor.is_instantiable());
//! assert!(descriptor.implements("App|Greeter"));
//! ```

use crate::value::Instance;
use crate::{Arguments, DiError, Result, Value, key};
use ahash::{AHashMap, RandomState};
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Normalized key of a Rust type, usable as a type hint.
///
/// Trait objects drop their `dyn ` prefix, so `type_key::<dyn app::Service>()` is
/// `app|Service`.
pub fn type_key<T: ?Sized + 'static>() -> String {
    let name = std::any::type_name::<T>();
    key::normalize(name.strip_prefix("dyn ").unwrap_or(name))
}

/// A constructor, method or callable parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    type_hint: Option<String>,
    default: Option<Value>,
}

impl Parameter {
    /// An untyped, required parameter.
    #[inline]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            name: name.trim_start_matches(key::PARAMETER_PREFIX).to_string(),
            type_hint: None,
            default: None,
        }
    }

    /// A parameter typed by a class or interface name.
    #[inline]
    pub fn typed(name: impl Into<String>, type_hint: impl Into<String>) -> Self {
        Self::new(name).with_type(type_hint)
    }

    #[inline]
    pub fn with_type(mut self, type_hint: impl Into<String>) -> Self {
        self.type_hint = Some(type_hint.into());
        self
    }

    /// Make the parameter optional with the given default.
    #[inline]
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn type_hint(&self) -> Option<&str> {
        self.type_hint.as_deref()
    }

    #[inline]
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// A parameter is optional exactly when it has a default.
    #[inline]
    pub fn is_optional(&self) -> bool {
        self.default.is_some()
    }
}

/// Parameters and docblock of a constructor, method or callable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    params: Vec<Parameter>,
    doc: String,
}

impl Signature {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter
    #[inline]
    pub fn param(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    /// Append a docblock line
    pub fn doc(mut self, line: impl AsRef<str>) -> Self {
        if !self.doc.is_empty() {
            self.doc.push('\n');
        }
        self.doc.push_str(line.as_ref());
        self
    }

    #[inline]
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    #[inline]
    pub fn doc_text(&self) -> &str {
        &self.doc
    }

    #[inline]
    pub(crate) fn push(&mut self, param: Parameter) {
        self.params.push(param);
    }
}

type BuildFn = dyn Fn(&mut Arguments) -> Result<Box<dyn Any + Send + Sync>> + Send + Sync;
type SetFn = dyn Fn(&mut (dyn Any + Send + Sync), Value) -> Result<()> + Send + Sync;
type InvokeFn = dyn Fn(&Instance, &mut Arguments) -> Result<Value> + Send + Sync;
type CastFn<I> = dyn Fn(Instance) -> Option<Arc<I>> + Send + Sync;

/// Constructor of a class
#[derive(Clone)]
pub struct Constructor {
    signature: Arc<Signature>,
    build: Arc<BuildFn>,
}

impl Constructor {
    #[inline]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub(crate) fn build(&self, args: &mut Arguments) -> Result<Box<dyn Any + Send + Sync>> {
        (self.build)(args)
    }
}

impl std::fmt::Debug for Constructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Constructor")
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// A property that can be injected after construction.
///
/// Only properties whose doc carries an `@inject` annotation are injected.
#[derive(Clone)]
pub struct Property {
    name: String,
    type_hint: Option<String>,
    default: Option<Value>,
    doc: String,
    set: Option<Arc<SetFn>>,
}

impl Property {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_hint: None,
            default: None,
            doc: String::new(),
            set: None,
        }
    }

    #[inline]
    pub fn with_type(mut self, type_hint: impl Into<String>) -> Self {
        self.type_hint = Some(type_hint.into());
        self
    }

    #[inline]
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Append a docblock line
    pub fn doc(mut self, line: impl AsRef<str>) -> Self {
        if !self.doc.is_empty() {
            self.doc.push('\n');
        }
        self.doc.push_str(line.as_ref());
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn type_hint(&self) -> Option<&str> {
        self.type_hint.as_deref()
    }

    #[inline]
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    #[inline]
    pub fn doc_text(&self) -> &str {
        &self.doc
    }

    /// The property seen as a parameter, for resolution
    pub(crate) fn as_parameter(&self) -> Parameter {
        Parameter {
            name: self.name.clone(),
            type_hint: self.type_hint.clone(),
            default: self.default.clone(),
        }
    }

    pub(crate) fn inject(&self, target: &mut (dyn Any + Send + Sync), value: Value) -> Result<()> {
        match &self.set {
            Some(set) => set(target, value),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Property {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("type_hint", &self.type_hint)
            .field("default", &self.default)
            .field("doc", &self.doc)
            .finish_non_exhaustive()
    }
}

/// An invokable method
#[derive(Clone)]
pub struct Method {
    name: String,
    signature: Arc<Signature>,
    sealed: bool,
    invoke: Arc<InvokeFn>,
}

impl Method {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Sealed methods cannot be intercepted by a lazy proxy.
    #[inline]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub(crate) fn invoke(&self, instance: &Instance, args: &mut Arguments) -> Result<Value> {
        (self.invoke)(instance, args)
    }
}

impl std::fmt::Debug for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("sealed", &self.sealed)
            .finish_non_exhaustive()
    }
}

/// What kind of type a descriptor stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassKind {
    #[default]
    Concrete,
    Abstract,
    Interface,
}

/// Everything the container knows about a class.
pub struct ClassDescriptor {
    name: String,
    key: String,
    kind: ClassKind,
    sealed: bool,
    interfaces: Vec<String>,
    constructor: Option<Constructor>,
    properties: Vec<Property>,
    methods: Vec<Method>,
    casts: AHashMap<TypeId, Box<dyn Any + Send + Sync>>,
    namespace: Option<String>,
    file: Option<PathBuf>,
}

impl ClassDescriptor {
    fn bare(name: String, kind: ClassKind) -> Self {
        let key = key::normalize(&name);
        let namespace = key::namespace(&key).map(str::to_string);
        Self {
            name,
            key,
            kind,
            sealed: false,
            interfaces: Vec::new(),
            constructor: None,
            properties: Vec::new(),
            methods: Vec::new(),
            casts: AHashMap::new(),
            namespace,
            file: None,
        }
    }

    /// Describe an interface (never instantiable).
    #[inline]
    pub fn interface(name: impl Into<String>) -> Self {
        Self::bare(name.into(), ClassKind::Interface)
    }

    /// Describe an abstract class (never instantiable).
    #[inline]
    pub fn abstract_class(name: impl Into<String>) -> Self {
        Self::bare(name.into(), ClassKind::Abstract)
    }

    /// Class name as declared
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalized class key
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    #[inline]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Concrete with a constructor
    #[inline]
    pub fn is_instantiable(&self) -> bool {
        self.kind == ClassKind::Concrete && self.constructor.is_some()
    }

    #[inline]
    pub fn interfaces(&self) -> &[String] {
        &self.interfaces
    }

    /// Whether the class declares the interface (by normalized name).
    pub fn implements(&self, interface: &str) -> bool {
        let interface = key::normalize(interface);
        self.interfaces.iter().any(|name| *name == interface)
    }

    #[inline]
    pub fn constructor(&self) -> Option<&Constructor> {
        self.constructor.as_ref()
    }

    #[inline]
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    #[inline]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|method| method.name == name)
    }

    /// Namespace used to resolve short names in annotations
    #[inline]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Source file declaring the class, if known
    #[inline]
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// View an instance of this class as the trait object `I`.
    pub fn cast<I: ?Sized + Send + Sync + 'static>(&self, instance: Instance) -> Option<Arc<I>> {
        let cast = self
            .casts
            .get(&TypeId::of::<I>())?
            .downcast_ref::<Arc<CastFn<I>>>()?;
        cast(instance)
    }
}

impl std::fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("sealed", &self.sealed)
            .field("interfaces", &self.interfaces)
            .field("constructor", &self.constructor)
            .field("properties", &self.properties)
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}

/// Typed builder for a [`ClassDescriptor`] of `T`.
pub struct ClassBuilder<T> {
    descriptor: ClassDescriptor,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> ClassBuilder<T> {
    /// Start describing `T` under the given class name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            descriptor: ClassDescriptor::bare(name.into(), ClassKind::Concrete),
            _marker: std::marker::PhantomData,
        }
    }

    /// Start describing `T` under its Rust type name.
    #[inline]
    pub fn of_type() -> Self {
        Self::new(std::any::type_name::<T>())
    }

    pub fn kind(mut self, kind: ClassKind) -> Self {
        self.descriptor.kind = kind;
        self
    }

    /// Mark the class non-extensible
    pub fn sealed(mut self, sealed: bool) -> Self {
        self.descriptor.sealed = sealed;
        self
    }

    /// Override the namespace (defaults to the class key minus its last segment)
    pub fn namespace(mut self, namespace: impl AsRef<str>) -> Self {
        self.descriptor.namespace = Some(key::normalize(namespace.as_ref()));
        self
    }

    pub fn file(mut self, file: impl Into<PathBuf>) -> Self {
        self.descriptor.file = Some(file.into());
        self
    }

    pub fn constructor<F>(mut self, signature: Signature, build: F) -> Self
    where
        F: Fn(&mut Arguments) -> Result<T> + Send + Sync + 'static,
    {
        self.descriptor.constructor = Some(Constructor {
            signature: Arc::new(signature),
            build: Arc::new(move |args: &mut Arguments| {
                build(args).map(|value| Box::new(value) as Box<dyn Any + Send + Sync>)
            }),
        });
        self
    }

    pub fn property<F>(mut self, mut property: Property, set: F) -> Self
    where
        F: Fn(&mut T, Value) -> Result<()> + Send + Sync + 'static,
    {
        let class = self.descriptor.key.clone();
        property.set = Some(Arc::new(
            move |target: &mut (dyn Any + Send + Sync), value: Value| match target
                .downcast_mut::<T>()
            {
                Some(this) => set(this, value),
                None => Err(DiError::TypeMismatch {
                    expected: class.clone(),
                    found: "foreign instance".to_string(),
                }),
            },
        ));
        self.descriptor.properties.push(property);
        self
    }

    pub fn method<F>(self, name: impl Into<String>, signature: Signature, invoke: F) -> Self
    where
        F: Fn(&T, &mut Arguments) -> Result<Value> + Send + Sync + 'static,
    {
        self.add_method(name.into(), signature, false, invoke)
    }

    /// Add a method a lazy proxy cannot intercept
    pub fn sealed_method<F>(self, name: impl Into<String>, signature: Signature, invoke: F) -> Self
    where
        F: Fn(&T, &mut Arguments) -> Result<Value> + Send + Sync + 'static,
    {
        self.add_method(name.into(), signature, true, invoke)
    }

    fn add_method<F>(mut self, name: String, signature: Signature, sealed: bool, invoke: F) -> Self
    where
        F: Fn(&T, &mut Arguments) -> Result<Value> + Send + Sync + 'static,
    {
        let class = self.descriptor.key.clone();
        let invoke = move |instance: &Instance, args: &mut Arguments| match instance
            .downcast_ref::<T>()
        {
            Some(this) => invoke(this, args),
            None => Err(DiError::TypeMismatch {
                expected: class.clone(),
                found: "foreign instance".to_string(),
            }),
        };
        self.descriptor.methods.push(Method {
            name,
            signature: Arc::new(signature),
            sealed,
            invoke: Arc::new(invoke),
        });
        self
    }

    /// Declare that `T` implements the interface `name`, viewable as `I`.
    pub fn implements<I>(mut self, name: impl AsRef<str>, cast: fn(Arc<T>) -> Arc<I>) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        let cast: Arc<CastFn<I>> =
            Arc::new(move |instance: Instance| instance.downcast::<T>().ok().map(cast));
        self.descriptor.casts.insert(TypeId::of::<I>(), Box::new(cast));

        let interface = key::normalize(name.as_ref());
        if !self.descriptor.interfaces.contains(&interface) {
            self.descriptor.interfaces.push(interface);
        }
        self
    }

    #[inline]
    pub fn build(self) -> ClassDescriptor {
        self.descriptor
    }
}

/// Types that describe themselves to the container.
///
/// Implement by hand with [`ClassBuilder`] or with `#[derive(Inspectable)]`.
pub trait Inspectable: Send + Sync + 'static {
    fn describe() -> ClassDescriptor;
}

/// Registered class descriptors, keyed by normalized class key.
pub struct ClassRegistry {
    classes: DashMap<String, Arc<ClassDescriptor>, RandomState>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self {
            classes: DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), 8),
        }
    }

    /// Register a descriptor, replacing any earlier one for the same class.
    pub fn register(&self, descriptor: ClassDescriptor) -> Arc<ClassDescriptor> {
        let descriptor = Arc::new(descriptor);
        self.classes
            .insert(descriptor.key.clone(), Arc::clone(&descriptor));
        descriptor
    }

    /// Look up a class by name (any delimiter style).
    pub fn get(&self, name: &str) -> Option<Arc<ClassDescriptor>> {
        self.classes
            .get(&key::normalize(name))
            .map(|entry| Arc::clone(entry.value()))
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(&key::normalize(name))
    }

    /// Look up a class that can be constructed.
    pub fn instantiable(&self, name: &str) -> Option<Arc<ClassDescriptor>> {
        self.get(name).filter(|descriptor| descriptor.is_instantiable())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassRegistry")
            .field("classes", &self.classes.len())
            .finish()
    }
}

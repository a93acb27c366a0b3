//! Resolution pipeline
//!
//! `get_in` is the recursive core behind `Container::get`: qualify the requested name,
//! pick the definition (contextual binding, declared config, or the raw name as a class),
//! reuse a cached value when the scope allows it, guard against cycles, and otherwise
//! build the value. Constructor parameters, annotated properties and callable parameters
//! recurse back into `get_in` with the component being built as the binding context.

use crate::annotation::Annotation;
use crate::component::{ContainerComponent, Scope, definition_scope, unwrap_definition};
use crate::container::Inner;
use crate::proxy::Initializer;
use crate::reflect::{ClassDescriptor, Parameter, Signature};
use crate::session::Session;
use crate::{Arguments, Callable, DiError, Invocable, Object, Overrides, Result, Value, key};
use std::any::Any;
use std::path::Path;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Where a definition came from; decides which store caches the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Contextual,
    Declared,
    /// Neither bound nor declared; never cached
    OnTheFly,
}

/// A component being resolved and the context it was requested from
#[derive(Debug, Clone)]
struct Origin {
    key: String,
    consumer: Option<String>,
    needed: String,
    source: Source,
}

impl Origin {
    fn anonymous(consumer: Option<String>) -> Self {
        Self {
            key: "{anonymous}".to_string(),
            consumer,
            needed: String::new(),
            source: Source::OnTheFly,
        }
    }
}

/// Member whose parameters are being resolved
struct Site<'a> {
    /// `Class::member` path, or the callable name
    target: String,
    namespace: Option<&'a str>,
    file: Option<&'a Path>,
}

impl<'a> Site<'a> {
    fn member(class: &'a ClassDescriptor, member: &str) -> Self {
        Self {
            target: format!("{}::{}", class.key(), member),
            namespace: class.namespace(),
            file: class.file(),
        }
    }

    fn function(callable: &Callable) -> Self {
        Self {
            target: callable.name().to_string(),
            namespace: None,
            file: None,
        }
    }
}

impl Inner {
    /// Resolve `requested` within `session`.
    ///
    /// `component_of_component` replaces the key when looking up contextual bindings; it
    /// carries the `$param` name for parameter-name bindings.
    pub(crate) fn get_in(
        self: &Arc<Self>,
        session: &mut Session,
        requested: Value,
        component_of_component: Option<&str>,
    ) -> Result<Value> {
        let consumer = session.frame().map(str::to_string);
        session.push(None);
        let result = self.resolve_request(session, requested, consumer, component_of_component);
        session.pop();
        result
    }

    fn resolve_request(
        self: &Arc<Self>,
        session: &mut Session,
        requested: Value,
        consumer: Option<String>,
        component_of_component: Option<&str>,
    ) -> Result<Value> {
        let (key, wrapper) = match requested {
            Value::Str(name) => (self.store.qualify(&name)?, None),
            Value::Component(wrapper) => {
                let target = match wrapper.component() {
                    Value::Str(name) => Some(self.store.qualify(name)?),
                    _ => None,
                };
                match target {
                    Some(key) => (key, Some(wrapper)),
                    None => {
                        let origin = Origin::anonymous(consumer);
                        let definition = Value::Component(wrapper);
                        return self.resolve_definition(session, definition, &origin, false);
                    }
                }
            }
            Value::Callable(callable) => return self.invoke_callable(session, &callable, None),
            other => return Ok(other),
        };

        session.set_frame(Some(key.clone()));
        let needed = component_of_component.map_or_else(|| key.clone(), str::to_string);

        let contextual = consumer
            .as_deref()
            .and_then(|consumer| self.store.binding(consumer, &needed));
        let (definition, source) = match contextual {
            Some(definition) => (Some(definition), Source::Contextual),
            None => match self.store.definition(&key) {
                Some(definition) => (Some(definition), Source::Declared),
                None => (None, Source::OnTheFly),
            },
        };

        // Nothing bound or declared: the name itself is the last resort.
        let strict = definition.is_none();
        let definition = match (definition, wrapper) {
            (Some(definition), Some(wrapper)) => Value::from(
                ContainerComponent::new(definition)
                    .with_lazy(wrapper.is_lazy())
                    .with_scope_opt(wrapper.explicit_scope()),
            ),
            (Some(definition), None) => definition,
            (None, Some(wrapper)) => Value::Component(wrapper),
            (None, None) => Value::Str(key.clone()),
        };

        let origin = Origin {
            key,
            consumer,
            needed,
            source,
        };
        let scope = definition_scope(&definition);

        if scope == Scope::Singleton {
            if let Some(cached) = self.cached(&origin) {
                #[cfg(feature = "logging")]
                trace!(
                    target: "norma_di",
                    component = %origin.key,
                    source = ?origin.source,
                    "Component resolved from store"
                );
                return Ok(cached);
            }
        }

        #[cfg(feature = "logging")]
        trace!(
            target: "norma_di",
            component = %origin.key,
            consumer = ?origin.consumer,
            source = ?origin.source,
            "Resolving component"
        );

        let identification = match self.class_of(&definition) {
            Some(class) => format!("{}{}{}", origin.key, key::SEPARATOR, class),
            None => origin.key.clone(),
        };
        session.enter(&identification, &origin.key)?;
        let result = self.resolve_definition(session, definition, &origin, strict);
        session.leave(&identification);
        let value = result?;

        if scope == Scope::Singleton {
            self.remember(&origin, &value);
        }
        Ok(value)
    }

    fn cached(&self, origin: &Origin) -> Option<Value> {
        match origin.source {
            Source::Contextual => origin
                .consumer
                .as_deref()
                .and_then(|consumer| self.store.contextual(consumer, &origin.needed)),
            Source::Declared => self.store.resolved(&origin.key),
            Source::OnTheFly => None,
        }
    }

    fn remember(&self, origin: &Origin, value: &Value) {
        match origin.source {
            Source::Contextual => {
                if let Some(consumer) = origin.consumer.as_deref() {
                    self.store
                        .store_contextual(consumer, &origin.needed, value.clone());
                }
            }
            Source::Declared => self.store.store(&origin.key, value.clone()),
            Source::OnTheFly => {}
        }
    }

    /// Key of the instantiable class a definition ends in, if any
    fn class_of(&self, definition: &Value) -> Option<String> {
        let mut current = definition;
        while let Value::Component(wrapper) = current {
            current = wrapper.component();
        }
        current
            .as_str()
            .and_then(|name| self.classes.instantiable(name))
            .map(|class| class.key().to_string())
    }

    /// Turn a definition into a value.
    ///
    /// `strict` means the definition is the requested name itself, so anything that is
    /// not a class is an undeclared component.
    fn resolve_definition(
        self: &Arc<Self>,
        session: &mut Session,
        definition: Value,
        origin: &Origin,
        strict: bool,
    ) -> Result<Value> {
        let unwrapped = unwrap_definition(definition);
        match unwrapped.terminal {
            Value::Str(name) => {
                if let Some(class) = self.classes.instantiable(&name) {
                    return if unwrapped.lazy {
                        self.lazy_object(class, origin, unwrapped.scope)
                    } else {
                        self.construct(session, &class).map(Value::Object)
                    };
                }
                if unwrapped.wrapped {
                    // A wrapper around another declared component refers to it.
                    if let Ok(target) = self.store.qualify(&name) {
                        if target != origin.key && self.store.is_declared(&target) {
                            let reference =
                                ContainerComponent::new(target).with_lazy(unwrapped.lazy);
                            return self.get_in(session, Value::from(reference), None);
                        }
                    }
                }
                if strict {
                    return Err(DiError::undeclared(origin.key.as_str()));
                }
                Ok(Value::Str(name))
            }
            Value::Callable(callable) => self.invoke_callable(session, &callable, None),
            other => Ok(other),
        }
    }

    /// Hand out a proxy that builds `class` on first use.
    fn lazy_object(
        self: &Arc<Self>,
        class: Arc<ClassDescriptor>,
        origin: &Origin,
        scope: Scope,
    ) -> Result<Value> {
        let container = Arc::downgrade(self);
        let target = Arc::clone(&class);
        let origin = origin.clone();

        let initializer: Initializer = Box::new(move || {
            let inner = container.upgrade().ok_or(DiError::ContainerDropped)?;
            let mut session = Session::seeded(Some(origin.key.clone()));
            let object = inner.construct(&mut session, &target)?;

            #[cfg(feature = "logging")]
            debug!(
                target: "norma_di",
                component = %origin.key,
                class = target.key(),
                "Lazy component initialized"
            );

            let instance = object.instance()?;
            if scope == Scope::Singleton {
                inner.remember(&origin, &Value::Object(object));
            }
            Ok(instance)
        });

        self.proxies
            .make_proxy(class, initializer)
            .map(Value::Object)
    }

    /// Build an instance: constructor parameters first, then annotated properties.
    fn construct(
        self: &Arc<Self>,
        session: &mut Session,
        class: &Arc<ClassDescriptor>,
    ) -> Result<Object> {
        let constructor = class
            .constructor()
            .ok_or_else(|| DiError::undeclared(class.key()))?;
        let site = Site::member(class, "new");
        let mut args = self.resolve_arguments(session, &site, constructor.signature(), None)?;
        let mut built = constructor.build(&mut args)?;
        self.inject_properties(session, class, built.as_mut())?;

        #[cfg(feature = "logging")]
        debug!(
            target: "norma_di",
            class = class.key(),
            depth = session.depth(),
            "Constructed component"
        );

        Ok(Object::described(Arc::clone(class), Arc::from(built)))
    }

    fn inject_properties(
        self: &Arc<Self>,
        session: &mut Session,
        class: &ClassDescriptor,
        target: &mut (dyn Any + Send + Sync),
    ) -> Result<()> {
        for property in class.properties() {
            let site = Site::member(class, &key::parameter_key(property.name()));
            let annotations = self.annotations.parse(&site.target, property.doc_text())?;
            let annotation = annotations
                .get("")
                .or_else(|| annotations.get(&key::parameter_key(property.name())));
            let Some(annotation) = annotation else {
                continue;
            };

            let param = property.as_parameter();
            match self.parameter_source(session, &site, &param, Some(annotation)) {
                Ok(Some(value)) => property.inject(target, value)?,
                Ok(None) => {}
                Err(_err) if property.default().is_some_and(|default| !default.is_null()) => {
                    #[cfg(feature = "logging")]
                    trace!(
                        target: "norma_di",
                        property = %site.target,
                        error = %_err,
                        "Property keeps its default"
                    );
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn invoke_callable(
        self: &Arc<Self>,
        session: &mut Session,
        callable: &Callable,
        overrides: Option<&Overrides>,
    ) -> Result<Value> {
        let site = Site::function(callable);
        let mut args = self.resolve_arguments(session, &site, callable.signature(), overrides)?;
        callable.invoke(&mut args)
    }

    /// Entry point of `Container::call`.
    pub(crate) fn call_in(
        self: &Arc<Self>,
        session: &mut Session,
        target: Invocable,
        overrides: &Overrides,
    ) -> Result<Value> {
        let (component, method) = match target {
            Invocable::Function(callable) => {
                return self.invoke_callable(session, &callable, Some(overrides));
            }
            Invocable::Method { component, method } => (component, method),
        };

        // Method parameters see the bindings of the component as requested, like its
        // constructor did
        let requested_key = match &component {
            Value::Str(name) => Some(self.store.qualify(name)?),
            Value::Component(wrapper) => match wrapper.component() {
                Value::Str(name) => Some(self.store.qualify(name)?),
                _ => None,
            },
            _ => None,
        };

        let object = match self.get_in(session, component, None)? {
            Value::Object(object) => object,
            other => {
                return Err(DiError::TypeMismatch {
                    expected: "object".to_string(),
                    found: other.type_name().to_string(),
                });
            }
        };
        let unknown = || DiError::UnknownMethod {
            class: object.class_name().to_string(),
            method: method.clone(),
        };
        let class = object.descriptor().cloned().ok_or_else(unknown)?;
        let target = class.method(&method).ok_or_else(unknown)?;

        session.push(Some(requested_key.unwrap_or_else(|| class.key().to_string())));
        let site = Site::member(&class, &method);
        let result = self
            .resolve_arguments(session, &site, target.signature(), Some(overrides))
            .and_then(|mut args| {
                let instance = object.instance()?;
                target.invoke(&instance, &mut args)
            });
        session.pop();
        result
    }

    fn resolve_arguments(
        self: &Arc<Self>,
        session: &mut Session,
        site: &Site<'_>,
        signature: &Signature,
        overrides: Option<&Overrides>,
    ) -> Result<Arguments> {
        let annotations = self.annotations.parse(&site.target, signature.doc_text())?;
        let mut args = Arguments::new(site.target.clone());
        for param in signature.params() {
            let annotation = annotations.get(&key::parameter_key(param.name()));
            let value = self.resolve_parameter(session, site, param, annotation, overrides)?;
            args.push(param.name(), value);
        }
        Ok(args)
    }

    fn resolve_parameter(
        self: &Arc<Self>,
        session: &mut Session,
        site: &Site<'_>,
        param: &Parameter,
        annotation: Option<&Annotation>,
        overrides: Option<&Overrides>,
    ) -> Result<Value> {
        if let Some(value) = overrides.and_then(|overrides| overrides.get(param.name())) {
            return Ok(value.clone());
        }

        match (
            self.parameter_source(session, site, param, annotation),
            param.default(),
        ) {
            (Ok(Some(value)), _) => Ok(value),
            (Ok(None), Some(default)) => Ok(default.clone()),
            (Ok(None), None) => Err(DiError::missing_parameter(param.name(), &site.target)),
            (Err(_err), Some(default)) => {
                #[cfg(feature = "logging")]
                trace!(
                    target: "norma_di",
                    function = %site.target,
                    parameter = param.name(),
                    error = %_err,
                    "Optional parameter falls back to its default"
                );
                Ok(default.clone())
            }
            (Err(err), None) => Err(err),
        }
    }

    /// Value for a parameter from its type, annotation or a `$param` binding.
    ///
    /// `Ok(None)` means no source applies.
    fn parameter_source(
        self: &Arc<Self>,
        session: &mut Session,
        site: &Site<'_>,
        param: &Parameter,
        annotation: Option<&Annotation>,
    ) -> Result<Option<Value>> {
        if let Some(type_hint) = param.type_hint() {
            return self.get_in(session, Value::from(type_hint), None).map(Some);
        }
        if let Some(annotation) = annotation {
            return self.resolve_annotation(session, site, annotation).map(Some);
        }

        let parameter_key = key::parameter_key(param.name());
        let bound = session
            .frame()
            .is_some_and(|consumer| self.store.binding(consumer, &parameter_key).is_some());
        if bound {
            return self
                .get_in(session, Value::Str(parameter_key.clone()), Some(&parameter_key))
                .map(Some);
        }
        Ok(None)
    }

    fn resolve_annotation(
        self: &Arc<Self>,
        session: &mut Session,
        site: &Site<'_>,
        annotation: &Annotation,
    ) -> Result<Value> {
        let name = self.annotated_component(site, annotation.component())?;

        // Undeclared classes with their own lifecycle get a config entry so their
        // instances are cached per scope.
        if annotation.is_lazy() || annotation.scope().is_some() {
            let target = self.store.qualify(&name)?;
            if !self.store.is_declared(&target) && self.classes.instantiable(&target).is_some() {
                let segments: Vec<&str> = key::split(&target).collect();
                let definition = ContainerComponent::new(target.as_str())
                    .with_lazy(annotation.is_lazy())
                    .with_scope_opt(annotation.scope());
                self.store.declare(&segments, Value::from(definition));

                #[cfg(feature = "logging")]
                debug!(
                    target: "norma_di",
                    component = %target,
                    lazy = annotation.is_lazy(),
                    scope = ?annotation.scope(),
                    "Declared annotated component"
                );
            }
        }

        let request = ContainerComponent::new(name)
            .with_lazy(annotation.is_lazy())
            .with_scope_opt(annotation.scope());
        self.get_in(session, Value::from(request), None)
    }

    /// Expand a short annotated name through the class's imports.
    ///
    /// Declared names win; then import aliases; then a class in the same namespace.
    fn annotated_component(&self, site: &Site<'_>, component: &str) -> Result<String> {
        if key::is_parameter_key(component) || key::segments(component).len() != 1 {
            return Ok(component.to_string());
        }
        let qualified = self.store.qualify(component)?;
        if self.store.is_declared(&qualified) {
            return Ok(qualified);
        }
        let Some(namespace) = site.namespace else {
            return Ok(component.to_string());
        };
        if let Some(full) = self.imports.aliases(namespace, site.file).remove(component) {
            return Ok(full);
        }
        let local = format!("{namespace}{}{component}", key::SEPARATOR);
        if self.classes.contains(&local) {
            return Ok(local);
        }
        Ok(component.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClassBuilder, ConfigTree, Container};

    struct Leaf;

    struct Branch {
        leaf: Arc<Leaf>,
    }

    fn container() -> Container {
        let container = Container::new();
        container.register_class(
            ClassBuilder::<Leaf>::new("T\\Leaf")
                .constructor(Signature::new(), |_| Ok(Leaf))
                .build(),
        );
        container.register_class(
            ClassBuilder::<Branch>::new("T\\Branch")
                .constructor(
                    Signature::new().param(Parameter::typed("leaf", "T\\Leaf")),
                    |args| {
                        Ok(Branch {
                            leaf: args.instance("leaf")?,
                        })
                    },
                )
                .build(),
        );
        container
    }

    #[test]
    fn test_on_the_fly_components_are_not_cached() {
        let container = container();
        let a = container.get_as::<Branch>("T\\Branch").unwrap();
        let b = container.get_as::<Branch>("T\\Branch").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a.leaf, &b.leaf));
    }

    #[test]
    fn test_declared_dependency_is_shared() {
        let container = container();
        container
            .add_config(ConfigTree::new().set("T.Leaf", "T\\Leaf"))
            .unwrap();

        let a = container.get_as::<Branch>("T\\Branch").unwrap();
        let b = container.get_as::<Branch>("T\\Branch").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a.leaf, &b.leaf));
    }

    #[test]
    fn test_wrapper_refers_to_declared_component() {
        let container = container();
        container
            .add_config(
                ConfigTree::new()
                    .set("T.Leaf", "T\\Leaf")
                    .set("T.alias", ContainerComponent::new("T.Leaf")),
            )
            .unwrap();

        let leaf = container.get_object("T.Leaf").unwrap();
        let alias = container.get_object("alias").unwrap();
        assert!(leaf.ptr_eq(&alias));
    }

    #[test]
    fn test_plain_string_is_not_a_reference() {
        let container = container();
        container
            .add_config(
                ConfigTree::new()
                    .set("T.Leaf", "T\\Leaf")
                    .set("T.name", "Leaf"),
            )
            .unwrap();
        assert_eq!(container.get("name").unwrap(), Value::from("Leaf"));
    }

    #[test]
    fn test_frames_are_balanced_after_errors() {
        let container = container();
        let mut session = Session::new();
        let err = container
            .inner
            .get_in(&mut session, Value::from("T\\Missing"), None)
            .unwrap_err();
        assert_eq!(err, DiError::undeclared("T|Missing"));
        assert_eq!(session.depth(), 1);
        assert_eq!(session.frame(), None);
    }
}

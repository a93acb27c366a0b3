//! Component wrapper and scope definitions

use crate::Value;

/// Lifecycle policy of a resolved component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// Resolved once, then reused from the resolved-instance store
    #[default]
    Singleton,

    /// Resolved again on every request
    Instance,
}

impl Scope {
    /// Parse an annotation spelling (`singleton`, `instance`), case-insensitive.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "singleton" => Some(Scope::Singleton),
            "instance" | "prototype" => Some(Scope::Instance),
            _ => None,
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Singleton => f.write_str("singleton"),
            Scope::Instance => f.write_str("instance"),
        }
    }
}

/// Configuration wrapper around a component definition.
///
/// Carries the `lazy` flag and an explicit [`Scope`]. The wrapped value may be a class
/// name, a reference to another declared component, a callable, a plain value or
/// another wrapper.
///
/// # Examples
///
/// ```rust
/// use norma_di::{ContainerComponent, Scope};
///
/// let component = ContainerComponent::new("Norma\\Mail\\SmtpTransport")
///     .with_lazy(true)
///     .with_scope(Scope::Instance);
///
/// assert!(component.is_lazy());
/// assert_eq!(component.scope(), Scope::Instance);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerComponent {
    component: Value,
    lazy: bool,
    scope: Option<Scope>,
}

impl ContainerComponent {
    /// Wrap a component definition (eager, default scope).
    #[inline]
    pub fn new(component: impl Into<Value>) -> Self {
        Self {
            component: component.into(),
            lazy: false,
            scope: None,
        }
    }

    /// Set the lazy flag
    #[inline]
    pub fn with_lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    /// Set an explicit scope
    #[inline]
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Set an optional explicit scope
    #[inline]
    pub fn with_scope_opt(mut self, scope: Option<Scope>) -> Self {
        self.scope = scope;
        self
    }

    /// The wrapped definition
    #[inline]
    pub fn component(&self) -> &Value {
        &self.component
    }

    /// Replace the wrapped definition
    #[inline]
    pub fn set_component(&mut self, component: impl Into<Value>) {
        self.component = component.into();
    }

    /// Take the wrapped definition
    #[inline]
    pub fn into_component(self) -> Value {
        self.component
    }

    /// Whether construction is deferred behind a proxy
    #[inline]
    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    /// Effective scope (singleton unless set)
    #[inline]
    pub fn scope(&self) -> Scope {
        self.scope.unwrap_or_default()
    }

    /// The scope if it was set explicitly
    #[inline]
    pub fn explicit_scope(&self) -> Option<Scope> {
        self.scope
    }
}

/// A definition with all [`ContainerComponent`] wrappers peeled off.
#[derive(Debug, Clone)]
pub(crate) struct Unwrapped {
    pub terminal: Value,
    pub lazy: bool,
    pub scope: Scope,
    /// At least one wrapper was removed
    pub wrapped: bool,
}

/// Peel wrappers off a definition.
///
/// `lazy` is set if any wrapper in the chain is lazy; the outermost explicit scope wins.
pub(crate) fn unwrap_definition(definition: Value) -> Unwrapped {
    let mut lazy = false;
    let mut scope = None;
    let mut wrapped = false;
    let mut current = definition;

    while let Value::Component(mut component) = current {
        wrapped = true;
        lazy |= component.lazy;
        scope = scope.or(component.scope);
        current = std::mem::replace(&mut component.component, Value::Null);
    }

    Unwrapped {
        terminal: current,
        lazy,
        scope: scope.unwrap_or_default(),
        wrapped,
    }
}

/// Effective scope of a definition without consuming it.
pub(crate) fn definition_scope(definition: &Value) -> Scope {
    let mut current = definition;
    while let Value::Component(component) = current {
        if let Some(scope) = component.scope {
            return scope;
        }
        current = &component.component;
    }
    Scope::Singleton
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_parse() {
        assert_eq!(Scope::parse("Singleton"), Some(Scope::Singleton));
        assert_eq!(Scope::parse("instance"), Some(Scope::Instance));
        assert_eq!(Scope::parse("request"), None);
    }

    #[test]
    fn test_unwrap_nested_propagates_lazy() {
        let inner = ContainerComponent::new("App|Mailer").with_lazy(true);
        let outer = ContainerComponent::new(inner).with_scope(Scope::Instance);

        let unwrapped = unwrap_definition(Value::from(outer));
        assert_eq!(unwrapped.terminal.as_str(), Some("App|Mailer"));
        assert!(unwrapped.lazy);
        assert!(unwrapped.wrapped);
        assert_eq!(unwrapped.scope, Scope::Instance);
    }

    #[test]
    fn test_outermost_scope_wins() {
        let inner = ContainerComponent::new("App|Mailer").with_scope(Scope::Instance);
        let outer = ContainerComponent::new(inner).with_scope(Scope::Singleton);
        let value = Value::from(outer);

        assert_eq!(definition_scope(&value), Scope::Singleton);
        assert_eq!(unwrap_definition(value).scope, Scope::Singleton);
    }

    #[test]
    fn test_plain_value_is_singleton() {
        let unwrapped = unwrap_definition(Value::from(42));
        assert!(!unwrapped.lazy);
        assert!(!unwrapped.wrapped);
        assert_eq!(unwrapped.scope, Scope::Singleton);
    }
}

//! Callables and invocation targets
//!
//! A [`Callable`] is a closure paired with the [`Signature`] the resolver uses to supply
//! its arguments. Callables appear as component definitions (factories) and as the target
//! of `Container::call`.

use crate::reflect::{Parameter, Signature};
use crate::{Arguments, Result, Value, key};
use ahash::AHashMap;
use std::sync::Arc;

/// Type-erased closure body
type CallFn = dyn Fn(&mut Arguments) -> Result<Value> + Send + Sync;

/// A closure with a described signature.
///
/// # Examples
///
/// ```rust
/// use norma_di::{Callable, Parameter, Value};
///
/// let greet = Callable::new(|args| {
///     let name = args.string("name")?;
///     Ok(Value::from(format!("hello {name}")))
/// })
/// .param(Parameter::new("name").with_default("world"));
///
/// assert_eq!(greet.signature().params().len(), 1);
/// ```
#[derive(Clone)]
pub struct Callable {
    name: Arc<str>,
    signature: Arc<Signature>,
    func: Arc<CallFn>,
}

impl Callable {
    /// Wrap a closure taking no parameters (add them with [`param`](Self::param)).
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&mut Arguments) -> Result<Value> + Send + Sync + 'static,
    {
        Self::with_signature(Signature::new(), func)
    }

    pub fn with_signature<F>(signature: Signature, func: F) -> Self
    where
        F: Fn(&mut Arguments) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from("{closure}"),
            signature: Arc::new(signature),
            func: Arc::new(func),
        }
    }

    /// Name used in error messages
    pub fn named(mut self, name: impl AsRef<str>) -> Self {
        self.name = Arc::from(name.as_ref());
        self
    }

    /// Append a parameter
    pub fn param(mut self, param: Parameter) -> Self {
        Arc::make_mut(&mut self.signature).push(param);
        self
    }

    /// Append a docblock line (annotations for the parameters)
    pub fn doc(mut self, line: impl AsRef<str>) -> Self {
        let signature = std::mem::take(Arc::make_mut(&mut self.signature));
        self.signature = Arc::new(signature.doc(line));
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    #[inline]
    pub fn invoke(&self, args: &mut Arguments) -> Result<Value> {
        (self.func)(args)
    }

    /// Whether both handles share the same closure.
    #[inline]
    pub fn ptr_eq(&self, other: &Callable) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl std::fmt::Debug for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// Target of `Container::call`
#[derive(Debug, Clone)]
pub enum Invocable {
    /// A closure
    Function(Callable),
    /// A method of a component; the component is resolved first.
    Method { component: Value, method: String },
}

impl From<Callable> for Invocable {
    fn from(callable: Callable) -> Self {
        Invocable::Function(callable)
    }
}

impl<C: Into<Value>, M: Into<String>> From<(C, M)> for Invocable {
    fn from((component, method): (C, M)) -> Self {
        Invocable::Method {
            component: component.into(),
            method: method.into(),
        }
    }
}

/// Explicit parameter values for `Container::call`, taking precedence over every other
/// resolution source. Names may be given with or without the leading `$`.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    values: AHashMap<String, Value>,
}

impl Overrides {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[inline]
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<Value>) {
        self.values.insert(key::parameter_key(name), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(&key::parameter_key(name))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<S: AsRef<str>, V: Into<Value>> FromIterator<(S, V)> for Overrides {
    fn from_iter<I: IntoIterator<Item = (S, V)>>(iter: I) -> Self {
        let mut overrides = Overrides::new();
        for (name, value) in iter {
            overrides.insert(name.as_ref(), value);
        }
        overrides
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_extends_signature() {
        let callable = Callable::new(|_| Ok(Value::Null))
            .param(Parameter::new("a"))
            .param(Parameter::typed("b", "App\\Logger"))
            .doc("@inject $a App.mailer")
            .named("setup");

        assert_eq!(callable.name(), "setup");
        let params = callable.signature().params();
        assert_eq!(params.len(), 2);
        assert_eq!(params[1].type_hint(), Some("App\\Logger"));
        assert_eq!(callable.signature().doc_text(), "@inject $a App.mailer");
    }

    #[test]
    fn test_invoke_and_identity() {
        let callable = Callable::new(|args| Ok(Value::from(args.int("x")? * 2)))
            .param(Parameter::new("x"));
        let mut args = Arguments::new("double");
        args.push("x", Value::from(21));

        assert_eq!(callable.invoke(&mut args).unwrap(), Value::Int(42));
        assert!(callable.ptr_eq(&callable.clone()));
        assert!(!callable.ptr_eq(&Callable::new(|_| Ok(Value::Null))));
    }

    #[test]
    fn test_overrides_accept_both_spellings() {
        let overrides: Overrides = [("$host", "a"), ("port", "b")].into_iter().collect();
        assert_eq!(overrides.get("host"), Some(&Value::from("a")));
        assert_eq!(overrides.get("$port"), Some(&Value::from("b")));
        assert_eq!(overrides.len(), 2);
    }

    #[test]
    fn test_invocable_conversions() {
        assert!(matches!(
            Invocable::from(("App\\Mailer", "send")),
            Invocable::Method { ref method, .. } if method == "send"
        ));
    }
}

//! Boundary values and resolved component objects
//!
//! Configuration leaves, resolved components and injected arguments are all [`Value`]s.
//! Component instances travel as [`Object`]s, which hide whether the instance is already
//! built or still behind a lazy proxy.

use crate::proxy::LazyProxy;
use crate::reflect::ClassDescriptor;
use crate::{Callable, ContainerComponent, DiError, Result, key};
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Type-erased component instance
pub type Instance = Arc<dyn Any + Send + Sync>;

/// A resolved component instance, eager or lazy.
///
/// Every access to the instance goes through [`Object::instance`], so a lazy object
/// builds its real instance on first use and keeps it afterwards.
#[derive(Clone)]
pub struct Object {
    class: Arc<str>,
    descriptor: Option<Arc<ClassDescriptor>>,
    state: ObjectState,
}

#[derive(Clone)]
enum ObjectState {
    Ready(Instance),
    Lazy(Arc<LazyProxy>),
}

impl Object {
    /// Wrap a plain value (for factories returning components).
    #[inline]
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wrap an existing `Arc`.
    #[inline]
    pub fn from_arc<T: Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            class: key::normalize(std::any::type_name::<T>()).into(),
            descriptor: None,
            state: ObjectState::Ready(value),
        }
    }

    pub(crate) fn described(descriptor: Arc<ClassDescriptor>, instance: Instance) -> Self {
        Self {
            class: descriptor.key().into(),
            descriptor: Some(descriptor),
            state: ObjectState::Ready(instance),
        }
    }

    /// Wrap a lazy proxy for a described class.
    ///
    /// Used by [`ProxyFactory`](crate::ProxyFactory) implementations.
    pub fn lazy(descriptor: Arc<ClassDescriptor>, proxy: Arc<LazyProxy>) -> Self {
        Self {
            class: descriptor.key().into(),
            descriptor: Some(descriptor),
            state: ObjectState::Lazy(proxy),
        }
    }

    /// Normalized class key of the instance
    #[inline]
    pub fn class_name(&self) -> &str {
        &self.class
    }

    /// Class descriptor, if the object was built from one
    #[inline]
    pub fn descriptor(&self) -> Option<&Arc<ClassDescriptor>> {
        self.descriptor.as_ref()
    }

    /// Whether this object is a lazy proxy
    #[inline]
    pub fn is_lazy(&self) -> bool {
        matches!(self.state, ObjectState::Lazy(_))
    }

    /// Whether the real instance exists (always true for eager objects)
    #[inline]
    pub fn is_initialized(&self) -> bool {
        match &self.state {
            ObjectState::Ready(_) => true,
            ObjectState::Lazy(proxy) => proxy.is_initialized(),
        }
    }

    /// Name of the generated proxy class, for lazy objects
    pub fn proxy_name(&self) -> Option<&str> {
        match &self.state {
            ObjectState::Ready(_) => None,
            ObjectState::Lazy(proxy) => Some(proxy.blueprint().proxy_name()),
        }
    }

    /// Access the real instance, building it first if this is a lazy proxy.
    pub fn instance(&self) -> Result<Instance> {
        match &self.state {
            ObjectState::Ready(instance) => Ok(Arc::clone(instance)),
            ObjectState::Lazy(proxy) => proxy.instance(),
        }
    }

    /// Downcast the instance to its concrete type.
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.instance()?
            .downcast::<T>()
            .map_err(|_| self.mismatch(std::any::type_name::<T>()))
    }

    /// View the instance through a trait object registered on its class.
    ///
    /// Casts are declared with [`ClassBuilder::implements`](crate::ClassBuilder::implements).
    pub fn cast<I: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<I>> {
        let instance = self.instance()?;
        self.descriptor
            .as_ref()
            .and_then(|descriptor| descriptor.cast::<I>(instance))
            .ok_or_else(|| self.mismatch(std::any::type_name::<I>()))
    }

    /// Whether both handles refer to the same instance or the same proxy.
    pub fn ptr_eq(&self, other: &Object) -> bool {
        match (&self.state, &other.state) {
            (ObjectState::Ready(a), ObjectState::Ready(b)) => Arc::ptr_eq(a, b),
            (ObjectState::Lazy(a), ObjectState::Lazy(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn mismatch(&self, expected: &str) -> DiError {
        DiError::TypeMismatch {
            expected: expected.to_string(),
            found: self.class.to_string(),
        }
    }
}

impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Object")
            .field("class", &self.class)
            .field("lazy", &self.is_lazy())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

/// A value at the container boundary.
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Object(Object),
    Callable(Callable),
    Component(Box<ContainerComponent>),
}

impl Value {
    /// Short name of the variant, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
            Value::Callable(_) => "callable",
            Value::Component(_) => "component",
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    #[inline]
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    #[inline]
    pub fn into_object(self) -> Option<Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Downcast an object value to its concrete type.
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        match self {
            Value::Object(o) => o.downcast::<T>(),
            other => Err(DiError::TypeMismatch {
                expected: std::any::type_name::<T>().to_string(),
                found: other.type_name().to_string(),
            }),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Callable(a), Value::Callable(b)) => a.ptr_eq(b),
            (Value::Component(a), Value::Component(b)) => a == b,
            _ => false,
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Value::Map(v)
    }
}

impl From<Object> for Value {
    fn from(v: Object) -> Self {
        Value::Object(v)
    }
}

impl From<Callable> for Value {
    fn from(v: Callable) -> Self {
        Value::Callable(v)
    }
}

impl From<ContainerComponent> for Value {
    fn from(v: ContainerComponent) -> Self {
        Value::Component(Box::new(v))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Mailer {
        host: String,
    }

    #[test]
    fn test_object_downcast() {
        let object = Object::new(Mailer {
            host: "smtp.local".into(),
        });
        assert!(!object.is_lazy());
        assert!(object.is_initialized());
        assert_eq!(object.downcast::<Mailer>().unwrap().host, "smtp.local");
        assert!(object.class_name().ends_with("|Mailer"));
    }

    #[test]
    fn test_object_downcast_mismatch() {
        let object = Object::new(42u8);
        let err = object.downcast::<String>().unwrap_err();
        assert!(matches!(err, DiError::TypeMismatch { .. }));
    }

    #[test]
    fn test_value_equality() {
        let object = Object::new(1u8);
        assert_eq!(Value::from(object.clone()), Value::from(object));
        assert_ne!(Value::from(Object::new(1u8)), Value::from(Object::new(1u8)));
        assert_eq!(Value::from("a"), Value::Str("a".into()));
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }
}

//! Resolved argument lists
//!
//! Constructors, methods and callables receive their resolved parameters as an
//! [`Arguments`] list and pull typed values out of it by name.

use crate::{DiError, Object, Result, Value};
use std::sync::Arc;

/// Conversion out of a resolved [`Value`].
pub trait FromValue: Sized {
    /// Short name of the expected shape, for error messages
    const EXPECTED: &'static str;

    fn from_value(value: Value) -> std::result::Result<Self, Value>;
}

impl FromValue for Value {
    const EXPECTED: &'static str = "value";

    #[inline]
    fn from_value(value: Value) -> std::result::Result<Self, Value> {
        Ok(value)
    }
}

impl FromValue for String {
    const EXPECTED: &'static str = "string";

    fn from_value(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(other),
        }
    }
}

impl FromValue for bool {
    const EXPECTED: &'static str = "bool";

    fn from_value(value: Value) -> std::result::Result<Self, Value> {
        value.as_bool().ok_or(value)
    }
}

impl FromValue for i64 {
    const EXPECTED: &'static str = "int";

    fn from_value(value: Value) -> std::result::Result<Self, Value> {
        value.as_int().ok_or(value)
    }
}

impl FromValue for i32 {
    const EXPECTED: &'static str = "int";

    fn from_value(value: Value) -> std::result::Result<Self, Value> {
        match value.as_int().map(i32::try_from) {
            Some(Ok(v)) => Ok(v),
            _ => Err(value),
        }
    }
}

impl FromValue for u32 {
    const EXPECTED: &'static str = "int";

    fn from_value(value: Value) -> std::result::Result<Self, Value> {
        match value.as_int().map(u32::try_from) {
            Some(Ok(v)) => Ok(v),
            _ => Err(value),
        }
    }
}

impl FromValue for u64 {
    const EXPECTED: &'static str = "int";

    fn from_value(value: Value) -> std::result::Result<Self, Value> {
        match value.as_int().map(u64::try_from) {
            Some(Ok(v)) => Ok(v),
            _ => Err(value),
        }
    }
}

impl FromValue for f64 {
    const EXPECTED: &'static str = "float";

    fn from_value(value: Value) -> std::result::Result<Self, Value> {
        value.as_float().ok_or(value)
    }
}

impl FromValue for Object {
    const EXPECTED: &'static str = "object";

    fn from_value(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Object(o) => Ok(o),
            other => Err(other),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    const EXPECTED: &'static str = "list";

    fn from_value(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(T::from_value(item)?);
                }
                Ok(out)
            }
            other => Err(other),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_value(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Resolved parameters of one constructor, method or callable invocation.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    owner: String,
    values: Vec<(String, Value)>,
}

impl Arguments {
    /// Empty list for the named function (used in error messages).
    #[inline]
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            values: Vec::new(),
        }
    }

    /// Append a resolved argument
    #[inline]
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.values.push((name.into(), value));
    }

    /// Function the arguments were resolved for
    #[inline]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Borrow an argument without consuming it
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(arg, _)| arg == name)
            .map(|(_, value)| value)
    }

    /// Remove and return an argument.
    pub fn take(&mut self, name: &str) -> Result<Value> {
        let idx = self
            .values
            .iter()
            .position(|(arg, _)| arg == name)
            .ok_or_else(|| DiError::MissingArgument {
                name: name.to_string(),
            })?;
        Ok(self.values.remove(idx).1)
    }

    /// Remove an argument and convert it.
    pub fn extract<T: FromValue>(&mut self, name: &str) -> Result<T> {
        let value = self.take(name)?;
        T::from_value(value).map_err(|found| DiError::ArgumentType {
            name: name.to_string(),
            expected: T::EXPECTED,
            found: found.type_name(),
        })
    }

    #[inline]
    pub fn object(&mut self, name: &str) -> Result<Object> {
        self.extract(name)
    }

    /// Downcast an object argument to its concrete type.
    pub fn instance<T: Send + Sync + 'static>(&mut self, name: &str) -> Result<Arc<T>> {
        self.object(name)?.downcast::<T>()
    }

    /// View an object argument as a registered trait object.
    pub fn cast<I: ?Sized + Send + Sync + 'static>(&mut self, name: &str) -> Result<Arc<I>> {
        self.object(name)?.cast::<I>()
    }

    /// Like [`instance`](Self::instance), with null mapped to `None`.
    pub fn optional<T: Send + Sync + 'static>(&mut self, name: &str) -> Result<Option<Arc<T>>> {
        match self.extract::<Option<Object>>(name)? {
            Some(object) => object.downcast::<T>().map(Some),
            None => Ok(None),
        }
    }

    /// Like [`cast`](Self::cast), with null mapped to `None`.
    pub fn optional_cast<I: ?Sized + Send + Sync + 'static>(
        &mut self,
        name: &str,
    ) -> Result<Option<Arc<I>>> {
        match self.extract::<Option<Object>>(name)? {
            Some(object) => object.cast::<I>().map(Some),
            None => Ok(None),
        }
    }

    #[inline]
    pub fn string(&mut self, name: &str) -> Result<String> {
        self.extract(name)
    }

    #[inline]
    pub fn int(&mut self, name: &str) -> Result<i64> {
        self.extract(name)
    }

    #[inline]
    pub fn bool(&mut self, name: &str) -> Result<bool> {
        self.extract(name)
    }

    #[inline]
    pub fn float(&mut self, name: &str) -> Result<f64> {
        self.extract(name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Names of the remaining arguments, in parameter order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_accessors() {
        let mut args = Arguments::new("App|Mailer::new");
        args.push("host", Value::from("smtp.local"));
        args.push("port", Value::from(25));
        args.push("tls", Value::from(true));
        args.push("ratio", Value::from(0.5));
        args.push("transport", Value::Null);

        assert_eq!(args.string("host").unwrap(), "smtp.local");
        assert_eq!(args.extract::<u32>("port").unwrap(), 25);
        assert!(args.bool("tls").unwrap());
        assert_eq!(args.float("ratio").unwrap(), 0.5);
        assert!(args.optional::<String>("transport").unwrap().is_none());
        assert!(args.is_empty());
    }

    #[test]
    fn test_missing_and_mistyped_arguments() {
        let mut args = Arguments::new("App|Mailer::new");
        args.push("host", Value::from(1));

        assert_eq!(
            args.string("host").unwrap_err(),
            DiError::ArgumentType {
                name: "host".into(),
                expected: "string",
                found: "int",
            }
        );
        assert!(matches!(
            args.take("host").unwrap_err(),
            DiError::MissingArgument { .. }
        ));
    }

    #[test]
    fn test_object_argument() {
        let mut args = Arguments::new("f");
        args.push("dep", Value::from(Object::new(7u16)));
        assert_eq!(args.names().collect::<Vec<_>>(), vec!["dep"]);
        assert_eq!(*args.instance::<u16>("dep").unwrap(), 7);
    }

    #[test]
    fn test_list_argument() {
        let mut args = Arguments::new("f");
        args.push("hosts", Value::from(vec![Value::from("a"), Value::from("b")]));
        assert_eq!(
            args.extract::<Vec<String>>("hosts").unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
    }
}

//! Error types for component resolution

use thiserror::Error;

/// Errors that can occur while configuring the container or resolving components.
///
/// Every variant is terminal for the resolution attempt that raised it. Errors raised
/// while resolving an optional parameter are absorbed by the resolver and replaced by
/// the parameter's default; everything else reaches the caller of `get`/`call`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiError {
    /// A configuration path segment contains the reserved key separator
    #[error("Configuration key segment '{segment}' contains the reserved separator '{separator}'")]
    ConfigurationKeyConflict { segment: String, separator: char },

    /// A short component name expands to more than one declared key
    #[error("Ambiguous component name '{name}', candidates: {}", .candidates.join(", "))]
    AmbiguousComponentName {
        name: String,
        candidates: Vec<String>,
    },

    /// A component was revisited within one access session
    #[error("Circular dependency detected while resolving: {component}")]
    CircularDependency { component: String },

    /// A required parameter could not be resolved from any source
    #[error(
        "Missing, non-optional, untyped, unbound parameter ${parameter} of {function}"
    )]
    MissingParameter { parameter: String, function: String },

    /// The component is not declared and is neither a class nor a callable
    #[error("Component not declared: {component}")]
    UndeclaredComponent { component: String },

    /// The class targeted by a lazy component cannot be proxied
    #[error("Cannot create a lazy proxy for {class}: {reason}")]
    UnresolvableLazyTarget { class: String, reason: String },

    /// An `@inject` annotation does not name the component to inject
    #[error("Annotation on {target} does not declare a component")]
    MissingAnnotationComponent { target: String },

    /// An `@inject` annotation could not be understood
    #[error("Invalid annotation on {target}: {reason}")]
    InvalidAnnotation { target: String, reason: String },

    /// A constructor, factory or method reported a failure
    #[error("Failed to create {component}: {reason}")]
    CreationFailed { component: String, reason: String },

    /// A resolved argument was requested that the signature did not produce
    #[error("Argument ${name} was not resolved")]
    MissingArgument { name: String },

    /// A resolved argument has a different shape than requested
    #[error("Argument ${name} is {found}, expected {expected}")]
    ArgumentType {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    /// An object could not be downcast to the requested type
    #[error("Object of class {found} is not a {expected}")]
    TypeMismatch { expected: String, found: String },

    /// `call` named a method the class does not describe
    #[error("Class {class} has no method {method}")]
    UnknownMethod { class: String, method: String },

    /// A lazy proxy outlived the container that created it
    #[error("Container has been dropped")]
    ContainerDropped,
}

impl DiError {
    /// Create an AmbiguousComponentName error
    #[inline]
    pub fn ambiguous(name: impl Into<String>, candidates: Vec<String>) -> Self {
        Self::AmbiguousComponentName {
            name: name.into(),
            candidates,
        }
    }

    /// Create a CircularDependency error
    #[inline]
    pub fn circular(component: impl Into<String>) -> Self {
        Self::CircularDependency {
            component: component.into(),
        }
    }

    /// Create an UndeclaredComponent error
    #[inline]
    pub fn undeclared(component: impl Into<String>) -> Self {
        Self::UndeclaredComponent {
            component: component.into(),
        }
    }

    /// Create a MissingParameter error
    #[inline]
    pub fn missing_parameter(parameter: impl Into<String>, function: impl Into<String>) -> Self {
        Self::MissingParameter {
            parameter: parameter.into(),
            function: function.into(),
        }
    }

    /// Create an UnresolvableLazyTarget error
    #[inline]
    pub fn lazy_target(class: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnresolvableLazyTarget {
            class: class.into(),
            reason: reason.into(),
        }
    }

    /// Create a CreationFailed error
    ///
    /// Constructor and factory closures use this to report their own failures.
    #[inline]
    pub fn creation_failed(component: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CreationFailed {
            component: component.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for DI operations
pub type Result<T> = std::result::Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_lists_candidates() {
        let err = DiError::ambiguous("Foo", vec!["a|b|Foo".into(), "x|y|Foo".into()]);
        let msg = err.to_string();
        assert!(msg.contains("a|b|Foo"));
        assert!(msg.contains("x|y|Foo"));
    }

    #[test]
    fn test_missing_parameter_message() {
        let err = DiError::missing_parameter("name", "App|Greeter::__construct");
        assert_eq!(
            err.to_string(),
            "Missing, non-optional, untyped, unbound parameter $name of App|Greeter::__construct"
        );
    }
}

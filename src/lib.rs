//! # Norma DI - Component Resolution for the Norma Framework
//!
//! A configuration-driven dependency injection container. Components are declared in a
//! nested configuration tree, looked up by short or fully qualified names, and built from
//! registered class descriptors whose constructor parameters are resolved recursively.
//!
//! ## Features
//!
//! - **Qualified names** - `Mail.mailer` finds `App|Mail|mailer`; ambiguity is an error
//! - **Contextual bindings** - override a dependency only while a given consumer is built
//! - **Scopes** - singleton components are cached, instance components rebuilt each time
//! - **Lazy components** - proxies that construct their target on first use
//! - **Annotations** - `@inject` docblock lines name components for parameters and properties
//! - **Cycle detection** - circular dependencies fail instead of overflowing the stack
//! - **Observable** - Optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use norma_di::{ClassBuilder, ConfigTree, Container, Parameter, Signature};
//! use std::sync::Arc;
//!
//! struct Transport;
//!
//! struct Mailer {
//!     transport: Arc<Transport>,
//! }
//!
//! let container = Container::new();
//! container.register_class(
//!     ClassBuilder::<Transport>::new("App\\Transport")
//!         .constructor(Signature::new(), |_| Ok(Transport))
//!         .build(),
//! );
//! container.register_class(
//!     ClassBuilder::<Mailer>::new("App\\Mailer")
//!         .constructor(
//!             Signature::new().param(Parameter::typed("transport", "App\\Transport")),
//!             |args| Ok(Mailer { transport: args.instance("transport")? }),
//!         )
//!         .build(),
//! );
//! container
//!     .add_config(ConfigTree::new().set("App.Mail.mailer", "App\\Mailer"))
//!     .unwrap();
//!
//! // Short names are qualified against the declared keys
//! let first = container.get_as::<Mailer>("mailer").unwrap();
//! let second = container.get_as::<Mailer>("Mail.mailer").unwrap();
//! assert!(Arc::ptr_eq(&first, &second));
//! ```
//!
//! ## Contextual Bindings
//!
//! ```rust
//! use norma_di::{ClassBuilder, ConfigTree, Container, Parameter, Signature};
//!
//! struct Report {
//!     title: String,
//! }
//!
//! let container = Container::new();
//! container.register_class(
//!     ClassBuilder::<Report>::new("App\\Report")
//!         .constructor(
//!             Signature::new().param(Parameter::new("title")),
//!             |args| Ok(Report { title: args.string("title")? }),
//!         )
//!         .build(),
//! );
//! container
//!     .add_config(ConfigTree::new().set("App.report", "App\\Report"))
//!     .unwrap();
//! container.bind_contextually("App.report", "$title", "Quarterly");
//!
//! let report = container.get_as::<Report>("report").unwrap();
//! assert_eq!(report.title, "Quarterly");
//! ```

mod annotation;
mod arguments;
mod callable;
mod component;
mod config;
mod container;
mod error;
pub mod key;
#[cfg(feature = "logging")]
pub mod logging;
mod proxy;
mod reflect;
mod resolver;
mod session;
mod storage;
mod trie;
mod value;

pub use annotation::*;
pub use arguments::*;
pub use callable::*;
pub use component::{ContainerComponent, Scope};
pub use config::*;
pub use container::{Container, ContainerBuilder};
pub use error::*;
pub use proxy::*;
pub use reflect::*;
pub use session::SessionId;
pub use trie::*;
pub use value::*;

#[cfg(feature = "derive")]
pub use norma_di_derive::Inspectable;

// Re-export tracing macros for convenience when logging feature is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

// Re-export for convenience
pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Arguments, Callable, ClassBuilder, ConfigTree, Container, ContainerComponent, DiError,
        Inspectable, Object, Overrides, Parameter, Property, Result, Scope, Signature, Value,
    };
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Database {
        url: String,
    }

    #[allow(dead_code)]
    struct UserService {
        db: Arc<Database>,
    }

    fn container() -> Container {
        let container = Container::new();
        container.register_class(
            ClassBuilder::<Database>::new("App\\Database")
                .constructor(
                    Signature::new().param(Parameter::new("url").with_default("sqlite::memory")),
                    |args| Ok(Database { url: args.string("url")? }),
                )
                .build(),
        );
        container.register_class(
            ClassBuilder::<UserService>::new("App\\UserService")
                .constructor(
                    Signature::new().param(Parameter::typed("db", "App\\Database")),
                    |args| Ok(UserService { db: args.instance("db")? }),
                )
                .build(),
        );
        container
    }

    #[test]
    fn test_singleton_component() {
        let container = container();
        container
            .add_config(ConfigTree::new().set("App.db", "App\\Database"))
            .unwrap();

        let db1 = container.get_as::<Database>("db").unwrap();
        let db2 = container.get_as::<Database>("App.db").unwrap();
        assert!(Arc::ptr_eq(&db1, &db2));
        assert_eq!(db1.url, "sqlite::memory");
    }

    #[test]
    fn test_instance_scope_creates_new_instance() {
        let container = container();
        container
            .add_config(ConfigTree::new().set(
                "App.db",
                ContainerComponent::new("App\\Database").with_scope(Scope::Instance),
            ))
            .unwrap();

        let db1 = container.get_as::<Database>("db").unwrap();
        let db2 = container.get_as::<Database>("db").unwrap();
        assert!(!Arc::ptr_eq(&db1, &db2));
    }

    #[test]
    fn test_lazy_component() {
        static CREATED: AtomicU32 = AtomicU32::new(0);

        struct Heavy;

        let container = Container::new();
        container.register_class(
            ClassBuilder::<Heavy>::new("App\\Heavy")
                .constructor(Signature::new(), |_| {
                    CREATED.fetch_add(1, Ordering::SeqCst);
                    Ok(Heavy)
                })
                .build(),
        );
        container
            .add_config(ConfigTree::new().set(
                "App.heavy",
                ContainerComponent::new("App\\Heavy").with_lazy(true),
            ))
            .unwrap();

        let proxy = container.get_object("heavy").unwrap();
        assert!(proxy.is_lazy());
        assert_eq!(CREATED.load(Ordering::SeqCst), 0);

        proxy.downcast::<Heavy>().unwrap();
        proxy.downcast::<Heavy>().unwrap();
        assert_eq!(CREATED.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_contextual_override() {
        let container = container();
        container
            .add_config(
                ConfigTree::new()
                    .set("App.db", "App\\Database")
                    .set("App.users", "App\\UserService"),
            )
            .unwrap();
        container.bind_contextually(
            "App.users",
            "App\\Database",
            Callable::new(|_| Ok(Value::Object(Object::new(Database { url: "replica".into() })))),
        );

        let users = container.get_as::<UserService>("users").unwrap();
        assert_eq!(users.db.url, "replica");

        let db = container.get_as::<Database>("db").unwrap();
        assert_eq!(db.url, "sqlite::memory");
    }

    #[test]
    fn test_undeclared_error() {
        let container = Container::new();
        let result = container.get("App.missing");
        assert!(matches!(result, Err(DiError::UndeclaredComponent { .. })));
    }
}

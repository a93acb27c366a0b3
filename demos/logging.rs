//! Example demonstrating logging capabilities
//!
//! Run with JSON logging (production):
//! ```bash
//! cargo run --example logging --features logging-json
//! ```
//!
//! Run with pretty logging (development):
//! ```bash
//! cargo run --example logging --features logging-pretty
//! ```

use norma_di::{ClassBuilder, ConfigTree, Container, ContainerComponent, Parameter, Signature};

// Example services
#[allow(dead_code)]
struct Database {
    url: String,
}

#[allow(dead_code)]
struct UserService {
    name: String,
}

#[allow(dead_code)]
struct RequestContext {
    request_id: String,
}

fn main() {
    // Initialize logging - uses JSON if logging-json feature enabled,
    // pretty if logging-pretty enabled
    norma_di::logging::builder().verbose().container_only().init();

    println!("=== Norma DI Logging Demo ===\n");

    let container = Container::new();

    container.register_class(
        ClassBuilder::<Database>::new("App\\Database")
            .constructor(Signature::new().param(Parameter::new("url")), |args| {
                Ok(Database {
                    url: args.string("url")?,
                })
            })
            .build(),
    );
    container.register_class(
        ClassBuilder::<UserService>::new("App\\UserService")
            .constructor(
                Signature::new()
                    .param(Parameter::typed("db", "App\\Database"))
                    .param(Parameter::new("name").with_default("UserService")),
                |args| {
                    args.object("db")?;
                    Ok(UserService {
                        name: args.string("name")?,
                    })
                },
            )
            .build(),
    );
    container.register_class(
        ClassBuilder::<RequestContext>::new("App\\RequestContext")
            .constructor(Signature::new().param(Parameter::new("id")), |args| {
                println!("  [App] Lazy request context being created...");
                Ok(RequestContext {
                    request_id: args.string("id")?,
                })
            })
            .build(),
    );

    // Declare components (logs: "Merged component configuration")
    container
        .add_config(
            ConfigTree::new()
                .set("App.Config.url", "postgres://localhost/mydb")
                .set("App.Database", "App\\Database")
                .set("App.users", "App\\UserService")
                .set(
                    "App.request",
                    ContainerComponent::new("App\\RequestContext").with_lazy(true),
                ),
        )
        .unwrap();

    // Contextual bindings (logs: "Registered contextual binding")
    container.bind_contextually(
        "App.Database",
        "$url",
        ContainerComponent::new("App.Config.url"),
    );
    container.bind_contextually("App.request", "$id", "req-12345");

    // Resolve services (logs: "Resolving component", "Constructed component")
    let _users = container.get("users").unwrap();

    // Second lookup is served by the store (logs: "Component resolved from store")
    let _again = container.get("App.users").unwrap();

    // Lazy component (logs: "Created lazy proxy", then "Lazy component initialized")
    let request = container.get_object("request").unwrap();
    request.instance().unwrap();

    // Undeclared names surface as errors
    assert!(container.get("App.missing").is_err());

    println!("\n=== Demo Complete ===");
    println!("Check the log output above to see structured logging in action!");
    println!("\nTip: Use --features logging-json for production (JSON output)");
    println!("     Use --features logging-pretty for development (colorful output)");
}

//! Example demonstrating the #[derive(Inspectable)] macro
//!
//! Run with:
//!   cargo run --example derive --features derive

use norma_di::{ConfigTree, Container, ContainerComponent, Inspectable, Object, Result};
use std::sync::Arc;

// Dependencies
#[derive(Inspectable)]
#[inspectable(name = "Shop\\Database")]
struct Database {
    #[inject(component = "Shop.Config.dsn")]
    dsn: String,
}

#[derive(Inspectable)]
#[inspectable(name = "Shop\\Logger")]
struct Logger {
    #[inject(default = "info")]
    level: String,
}

#[derive(Inspectable)]
#[inspectable(name = "Shop\\Mailer")]
struct Mailer;

// Service with injected dependencies
#[derive(Inspectable)]
#[inspectable(name = "Shop\\UserService")]
struct UserService {
    #[inject(type = "Shop\\Database")]
    db: Arc<Database>,
    #[inject(type = "Shop\\Logger")]
    logger: Option<Arc<Logger>>,
    #[inject(component = "Shop\\Mailer", lazy)]
    mailer: Object,
    // Non-injected field uses Default
    request_count: u64,
}

impl UserService {
    fn describe(&self) -> String {
        let logger_status = match &self.logger {
            Some(logger) => format!("logging at {}", logger.level),
            None => "without logging".into(),
        };
        let mailer_status = if self.mailer.is_initialized() {
            "ready"
        } else {
            "not built yet"
        };
        format!(
            "UserService on {} ({logger_status}, mailer {mailer_status}, requests: {})",
            self.db.dsn, self.request_count
        )
    }
}

fn main() -> Result<()> {
    println!("=== Norma DI Derive Macro Demo ===\n");

    let container = Container::new();
    container.register::<Database>();
    container.register::<Logger>();
    container.register::<Mailer>();
    container.register::<UserService>();

    container.add_config(
        ConfigTree::new()
            .set("Shop.Config.dsn", "postgres://localhost:5432/shop")
            .set("Shop.Database", "Shop\\Database")
            .set(
                "Shop.users",
                ContainerComponent::new("Shop\\UserService").with_scope(norma_di::Scope::Instance),
            ),
    )?;

    // Logger is not declared: it is built on the fly with its default level
    println!("Creating UserService from container...");
    let users = container.get_as::<UserService>("users")?;
    println!("  {}", users.describe());

    users.mailer.instance()?;
    println!("  {}", users.describe());
    println!();

    println!("Generated constructor signature:");
    let descriptor = <UserService as Inspectable>::describe();
    if let Some(constructor) = descriptor.constructor() {
        for param in constructor.signature().params() {
            println!(
                "  ${:<8} type={:<16} optional={}",
                param.name(),
                param.type_hint().unwrap_or("-"),
                param.is_optional()
            );
        }
        println!("  doc: {}", constructor.signature().doc_text().trim());
    }

    println!("\n=== Demo Complete ===");
    println!("\nThe #[derive(Inspectable)] macro generated `describe()` which:");
    println!("  - Lists #[inject] fields as constructor parameters");
    println!("  - Writes @inject lines for component and lazy attributes");
    println!("  - Uses Default::default() for non-injected fields");
    Ok(())
}

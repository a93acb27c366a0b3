//! `#[derive(Inspectable)]`

use norma_di::{ConfigTree, Container, DiError, Inspectable, Object, Value};
use std::sync::Arc;

#[derive(Debug, Inspectable)]
#[inspectable(name = "Shop\\Database")]
struct Database;

trait Cache: Send + Sync {
    fn size(&self) -> usize;
}

#[derive(Inspectable)]
#[inspectable(name = "Shop\\MemoryCache")]
struct MemoryCache {
    #[inject(default = 64)]
    size: u64,
}

impl Cache for MemoryCache {
    fn size(&self) -> usize {
        self.size as usize
    }
}

#[derive(Debug, Inspectable)]
#[inspectable(name = "Shop\\Orders")]
struct Orders {
    #[inject]
    db: Arc<Database>,
    #[inject(component = "Shop.currency")]
    currency: String,
    #[inject(component = "Shop\\Database", lazy)]
    replica: Object,
    #[inject]
    audit: Option<Arc<Database>>,
    // Not injected
    placed: u64,
}

#[derive(Inspectable)]
#[inspectable(name = "Shop\\Catalog")]
struct Catalog {
    #[inject(type = "Shop\\Cache")]
    cache: Arc<dyn Cache>,
}

#[derive(Inspectable)]
#[inspectable(name = "Shop\\Vault", sealed)]
struct Vault;

#[derive(Inspectable)]
struct Untitled {
    #[inject]
    label: String,
}

fn container() -> Container {
    let container = Container::new();
    container.register::<Database>();
    container.register::<Orders>();
    container.register::<Vault>();
    container
        .add_config(
            ConfigTree::new()
                .set("Shop.db", "Shop\\Database")
                .set("Shop.currency", "EUR"),
        )
        .unwrap();
    container
}

#[test]
fn test_describe_builds_signature() {
    let descriptor = Orders::describe();
    assert_eq!(descriptor.key(), "Shop|Orders");

    let constructor = descriptor.constructor().unwrap();
    let params = constructor.signature().params();
    let names: Vec<&str> = params.iter().map(|param| param.name()).collect();
    assert_eq!(names, ["db", "currency", "replica", "audit"]);

    assert_eq!(params[0].type_hint(), Some("derive|Database"));
    assert_eq!(params[1].type_hint(), None);
    assert_eq!(params[3].default(), Some(&Value::Null));
    assert!(
        constructor
            .signature()
            .doc_text()
            .contains("@inject $replica Shop\\Database lazy")
    );
}

#[test]
fn test_derived_class_resolves() {
    let container = container();
    // The type hint is the Rust type name; declare it as an alias of the shop database
    container
        .add_config(ConfigTree::new().set(
            "derive.Database",
            norma_di::ContainerComponent::new("Shop.db"),
        ))
        .unwrap();

    let orders = container.get_as::<Orders>("Shop\\Orders").unwrap();
    let db = container.get_as::<Database>("Shop.db").unwrap();
    assert!(Arc::ptr_eq(&orders.db, &db));
    assert_eq!(orders.currency, "EUR");
    assert!(orders.replica.is_lazy());
    assert!(orders.audit.is_some());
    assert_eq!(orders.placed, 0);
}

#[test]
fn test_required_field_must_resolve() {
    let container = container();
    let orders = container.get_as::<Orders>("Shop\\Orders");
    // `db` is required and `derive.Database` is not resolvable
    assert_eq!(orders.unwrap_err(), DiError::undeclared("derive|Database"));
}

#[test]
fn test_trait_object_field() {
    let container = Container::new();
    container.register_class(
        norma_di::ClassBuilder::<MemoryCache>::new("Shop\\MemoryCache")
            .constructor(norma_di::Signature::new(), |_| Ok(MemoryCache { size: 8 }))
            .implements::<dyn Cache>("Shop\\Cache", |this| this)
            .build(),
    );
    container.register::<Catalog>();
    container
        .add_config(ConfigTree::new().set("Shop.Cache", "Shop\\MemoryCache"))
        .unwrap();

    let catalog = container.get_as::<Catalog>("Shop\\Catalog").unwrap();
    assert_eq!(catalog.cache.size(), 8);
}

#[test]
fn test_default_attribute() {
    let container = Container::new();
    container.register::<MemoryCache>();
    let cache = container.get_as::<MemoryCache>("Shop\\MemoryCache").unwrap();
    assert_eq!(cache.size, 64);
}

#[test]
fn test_sealed_attribute() {
    assert!(Vault::describe().is_sealed());
    let container = container();
    container
        .add_config(ConfigTree::new().set(
            "Shop.vault",
            norma_di::ContainerComponent::new("Shop\\Vault").with_lazy(true),
        ))
        .unwrap();
    assert!(matches!(
        container.get("vault"),
        Err(DiError::UnresolvableLazyTarget { .. })
    ));
}

#[test]
fn test_default_class_name() {
    let descriptor = Untitled::describe();
    assert_eq!(descriptor.key(), "derive|Untitled");

    let container = Container::new();
    container.register::<Untitled>();
    container.bind_contextually("derive.Untitled", "$label", "hello");
    let untitled = container.get_as::<Untitled>("derive::Untitled").unwrap();
    assert_eq!(untitled.label, "hello");
}

//! Qualified names, contextual bindings and lazy components
//!
//! Run with:
//!   cargo run --example contextual

use norma_di::{
    ClassBuilder, ConfigTree, Container, ContainerComponent, Overrides, Parameter, Result, Scope,
    Signature, Value,
};
use std::sync::Arc;

trait Storage: Send + Sync {
    fn location(&self) -> String;
}

struct DiskStorage {
    root: String,
}

impl Storage for DiskStorage {
    fn location(&self) -> String {
        format!("disk:{}", self.root)
    }
}

struct MemoryStorage;

impl Storage for MemoryStorage {
    fn location(&self) -> String {
        "memory".into()
    }
}

struct Uploader {
    storage: Arc<dyn Storage>,
    limit: i64,
}

struct Thumbnailer {
    storage: Arc<dyn Storage>,
}

fn register(container: &Container) {
    container.register_class(
        ClassBuilder::<DiskStorage>::new("Demo\\DiskStorage")
            .constructor(
                Signature::new().param(Parameter::new("root").with_default("/var/data")),
                |args| {
                    Ok(DiskStorage {
                        root: args.string("root")?,
                    })
                },
            )
            .implements::<dyn Storage>("Demo\\Storage", |this| this)
            .build(),
    );
    container.register_class(
        ClassBuilder::<MemoryStorage>::new("Demo\\MemoryStorage")
            .constructor(Signature::new(), |_| Ok(MemoryStorage))
            .implements::<dyn Storage>("Demo\\Storage", |this| this)
            .build(),
    );
    container.register_class(
        ClassBuilder::<Uploader>::new("Demo\\Uploader")
            .constructor(
                Signature::new()
                    .param(Parameter::typed("storage", "Demo\\Storage"))
                    .param(Parameter::new("limit"))
                    .doc("@inject $limit Demo.Config.uploadLimit"),
                |args| {
                    Ok(Uploader {
                        storage: args.cast("storage")?,
                        limit: args.int("limit")?,
                    })
                },
            )
            .method(
                "upload",
                Signature::new().param(Parameter::new("file")),
                |uploader, args| {
                    let file = args.string("file")?;
                    Ok(Value::from(format!(
                        "{file} -> {} (limit {})",
                        uploader.storage.location(),
                        uploader.limit
                    )))
                },
            )
            .build(),
    );
    container.register_class(
        ClassBuilder::<Thumbnailer>::new("Demo\\Thumbnailer")
            .constructor(
                Signature::new().param(Parameter::typed("storage", "Demo\\Storage")),
                |args| {
                    Ok(Thumbnailer {
                        storage: args.cast("storage")?,
                    })
                },
            )
            .build(),
    );
}

fn main() -> Result<()> {
    println!("=== Norma DI Contextual Bindings Demo ===\n");

    let container = Container::new();
    register(&container);

    container.add_config(
        ConfigTree::new()
            .set("Demo.Config.uploadLimit", 1024)
            .set("Demo.Storage", "Demo\\DiskStorage")
            .set("Demo.uploader", "Demo\\Uploader")
            .set(
                "Demo.thumbnailer",
                ContainerComponent::new("Demo\\Thumbnailer").with_scope(Scope::Instance),
            )
            .set(
                "Demo.Lazy.uploader",
                ContainerComponent::new("Demo\\Uploader").with_lazy(true),
            ),
    )?;

    println!("1. Qualified names");
    for name in ["uploader", "Demo.uploader", "Demo\\Storage", "uploadLimit"] {
        match container.qualify(name) {
            Ok(key) => println!("   {name:<16} -> {key}"),
            Err(err) => println!("   {name:<16} -> {err}"),
        }
    }
    println!();

    println!("2. Contextual bindings");
    container.bind_contextually("Demo.thumbnailer", "Demo.Storage", "Demo\\MemoryStorage");
    let uploader = container.get_as::<Uploader>("Demo.uploader")?;
    let thumbnailer = container.get_as::<Thumbnailer>("thumbnailer")?;
    println!("   uploader stores on    {}", uploader.storage.location());
    println!("   thumbnailer stores on {}", thumbnailer.storage.location());
    println!();

    println!("3. Method calls");
    let result = container.call(
        ("Demo.uploader", "upload"),
        Overrides::new().with("file", "avatar.png"),
    )?;
    println!("   {}", result.as_str().unwrap_or_default());
    println!();

    println!("4. Lazy components");
    let proxy = container.get_object("Lazy.uploader")?;
    println!("   proxy class:  {}", proxy.proxy_name().unwrap_or("-"));
    println!("   initialized:  {}", proxy.is_initialized());
    let real = proxy.downcast::<Uploader>()?;
    println!("   initialized:  {} (limit {})", proxy.is_initialized(), real.limit);
    println!();

    println!("5. Errors");
    if let Err(err) = container.get("Demo.missing") {
        println!("   {err}");
    }
    if let Err(err) = container.add_config(ConfigTree::new().leaf("Bad|Key", 1)) {
        println!("   {err}");
    }

    println!("\n=== Demo Complete ===");
    Ok(())
}

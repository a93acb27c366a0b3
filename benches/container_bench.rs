//! Benchmarks for the component container

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use norma_di::{
    ClassBuilder, ConfigTree, Container, ContainerComponent, Parameter, Scope, Signature,
};
use std::hint::black_box;
use std::sync::Arc;

#[allow(dead_code)]
struct Repository {
    dsn: String,
}

#[allow(dead_code)]
struct Service {
    repository: Arc<Repository>,
    name: String,
}

fn container() -> Container {
    let container = Container::new();
    container.register_class(
        ClassBuilder::<Repository>::new("Bench\\Repository")
            .constructor(
                Signature::new().param(Parameter::new("dsn").with_default("memory")),
                |args| {
                    Ok(Repository {
                        dsn: args.string("dsn")?,
                    })
                },
            )
            .build(),
    );
    container.register_class(
        ClassBuilder::<Service>::new("Bench\\Service")
            .constructor(
                Signature::new()
                    .param(Parameter::typed("repository", "Bench\\Repository"))
                    .param(Parameter::new("name"))
                    .doc("@inject $name Bench.Config.name"),
                |args| {
                    Ok(Service {
                        repository: args.instance("repository")?,
                        name: args.string("name")?,
                    })
                },
            )
            .build(),
    );
    container
        .add_config(
            ConfigTree::new()
                .set("Bench.Config.name", "bench")
                .set("Bench.Repository", "Bench\\Repository")
                .set("Bench.service", "Bench\\Service")
                .set(
                    "Bench.fresh",
                    ContainerComponent::new("Bench\\Service").with_scope(Scope::Instance),
                )
                .set(
                    "Bench.lazy",
                    ContainerComponent::new("Bench\\Service")
                        .with_lazy(true)
                        .with_scope(Scope::Instance),
                ),
        )
        .unwrap();
    container
}

/// Config with `width` top-level modules of `depth` nested segments each
fn wide_config(width: usize, depth: usize) -> ConfigTree {
    let mut config = ConfigTree::new();
    for module in 0..width {
        let path: Vec<String> = (0..depth).map(|level| format!("M{module}L{level}")).collect();
        config = config.set(&format!("{}.component", path.join(".")), module as i64);
    }
    config
}

fn bench_configuration(c: &mut Criterion) {
    let mut group = c.benchmark_group("configuration");

    for width in [10usize, 100, 1000] {
        group.throughput(Throughput::Elements(width as u64));
        group.bench_with_input(BenchmarkId::new("add_config", width), &width, |b, &width| {
            let config = wide_config(width, 3);
            b.iter(|| {
                let container = Container::new();
                container.add_config(config.clone()).unwrap();
                black_box(container)
            })
        });
    }

    group.bench_function("get_config_100", |b| {
        let container = Container::new();
        container.add_config(wide_config(100, 3)).unwrap();
        b.iter(|| black_box(container.get_config()))
    });

    group.finish();
}

fn bench_qualification(c: &mut Criterion) {
    let mut group = c.benchmark_group("qualification");
    group.throughput(Throughput::Elements(1));

    let container = Container::new();
    container.add_config(wide_config(1000, 4)).unwrap();

    group.bench_function("full_key", |b| {
        b.iter(|| black_box(container.qualify("M500L0.M500L1.M500L2.M500L3.component")))
    });

    group.bench_function("short_suffix", |b| {
        b.iter(|| black_box(container.qualify("M500L3.component")))
    });

    group.bench_function("unknown", |b| {
        b.iter(|| black_box(container.qualify("Nowhere.component")))
    });

    group.bench_function("ambiguous", |b| {
        b.iter(|| black_box(container.qualify("component")))
    });

    group.finish();
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");
    group.throughput(Throughput::Elements(1));

    let container = container();
    container.get("service").unwrap();

    group.bench_function("singleton_hit", |b| {
        b.iter(|| black_box(container.get("service").unwrap()))
    });

    group.bench_function("scalar", |b| {
        b.iter(|| black_box(container.get("Config.name").unwrap()))
    });

    group.bench_function("constructor_injection", |b| {
        b.iter(|| black_box(container.get("fresh").unwrap()))
    });

    group.bench_function("on_the_fly_class", |b| {
        b.iter(|| black_box(container.get("Bench\\Service").unwrap()))
    });

    group.bench_function("lazy_proxy", |b| {
        b.iter(|| black_box(container.get("lazy").unwrap()))
    });

    group.finish();
}

fn bench_contextual(c: &mut Criterion) {
    let mut group = c.benchmark_group("contextual");
    group.throughput(Throughput::Elements(1));

    let container = container();
    container.bind_contextually("Bench.fresh", "$name", "contextual");
    container.bind_contextually("Bench.fresh", "Bench.Repository", "Bench\\Repository");

    group.bench_function("bound_dependencies", |b| {
        b.iter(|| black_box(container.get("fresh").unwrap()))
    });

    group.finish();
}

fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");

    group.bench_function("concurrent_reads_4", |b| {
        let container = container();
        container.get("service").unwrap();

        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let container = container.clone();
                    thread::spawn(move || {
                        for _ in 0..100 {
                            black_box(container.get("service").unwrap());
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_configuration,
    bench_qualification,
    bench_resolution,
    bench_contextual,
    bench_concurrent,
);

criterion_main!(benches);

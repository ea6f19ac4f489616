//! # Model Benchmarks
//!
//! Performance benchmarks for edm-core binding, caching and target resolution.
//!
//! Run with: `cargo bench -p edm-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use edm_core::csdl::{CsdlEntityContainer, CsdlEntitySet, CsdlEntityType, CsdlProperty};
use edm_core::{CsdlSchema, ModelSettings, SemanticModel};
use std::hint::black_box;

/// A linear inheritance chain `T0 <- T1 <- ... <- T(n-1)` with one entity
/// set per type.
fn create_chain_schema(size: usize) -> CsdlSchema {
    let mut schema = CsdlSchema::new("NS");
    schema.entity_types = (0..size)
        .map(|i| {
            let ty = CsdlEntityType::new(format!("T{i}"))
                .with_property(CsdlProperty::new(format!("P{i}"), "Edm.String"));
            if i == 0 {
                ty.with_key(["P0"])
            } else {
                ty.with_base_type(format!("NS.T{}", i - 1))
            }
        })
        .collect();
    schema.entity_containers = vec![CsdlEntityContainer {
        name: "Default".to_string(),
        entity_sets: (0..size)
            .map(|i| CsdlEntitySet::new(format!("Set{i}"), format!("NS.T{i}")))
            .collect(),
        ..CsdlEntityContainer::default()
    }];
    schema
}

/// A base-type cycle of `size` types.
fn create_cycle_schema(size: usize) -> CsdlSchema {
    let mut schema = CsdlSchema::new("NS");
    schema.entity_types = (0..size)
        .map(|i| {
            CsdlEntityType::new(format!("T{i}"))
                .with_base_type(format!("NS.T{}", (i + 1) % size))
        })
        .collect();
    schema
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_binding(c: &mut Criterion) {
    let mut group = c.benchmark_group("bind_schema");

    for size in [10, 100, 500].iter() {
        let schema = create_chain_schema(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &schema, |b, schema| {
            b.iter(|| {
                black_box(SemanticModel::from_schemas(
                    std::slice::from_ref(schema),
                    ModelSettings::default(),
                ))
            });
        });
    }

    group.finish();
}

fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate");

    for size in [10, 100, 500].iter() {
        let schema = create_chain_schema(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &schema, |b, schema| {
            // Fresh model per iteration so every cache starts cold.
            b.iter(|| {
                let model = SemanticModel::from_schemas(
                    std::slice::from_ref(schema),
                    ModelSettings::default(),
                );
                black_box(model.validate())
            });
        });
    }

    group.finish();
}

fn bench_cached_key(c: &mut Criterion) {
    let model = SemanticModel::from_schemas(&[create_chain_schema(500)], ModelSettings::default());
    let deepest = model
        .find_type("NS.T499")
        .and_then(|binding| binding.exact().copied());

    c.bench_function("cached_inherited_key", |b| {
        b.iter(|| deepest.map(|ty| black_box(model.key(ty))));
    });
}

fn bench_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("base_type_cycle");

    for size in [10, 100, 500].iter() {
        let schema = create_cycle_schema(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &schema, |b, schema| {
            b.iter(|| {
                let model = SemanticModel::from_schemas(
                    std::slice::from_ref(schema),
                    ModelSettings::default(),
                );
                black_box(model.validate().len())
            });
        });
    }

    group.finish();
}

fn bench_target_resolution(c: &mut Criterion) {
    let model = SemanticModel::from_schemas(&[create_chain_schema(100)], ModelSettings::default());
    let paths = ["NS.T50", "NS.T99/P0", "Default/Set42", "Default", "NS.Missing"];

    c.bench_function("resolve_target", |b| {
        b.iter(|| {
            for path in &paths {
                black_box(model.resolve_target(path));
            }
        });
    });
}

criterion_group!(
    benches,
    bench_binding,
    bench_validate,
    bench_cached_key,
    bench_cycle,
    bench_target_resolution,
);

criterion_main!(benches);

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use optmodel_core::path;
use optmodel_core::{ExtraScope, Schema};
use optmodel_test_utils::{MemoryModel, registry_with};
use serde_json::json;
use std::sync::Arc;

fn descriptors() -> serde_json::Value {
    json!({
        "general": {
            "type": "box",
            "options": {
                "color": {"type": "text", "value": "blue"},
                "layout": {"type": "text", "value": {"cols": 2, "rows": 3}},
            },
        },
        "footer": {"type": "textarea", "value": ""},
    })
}

fn cached_get_benchmark(c: &mut Criterion) {
    c.bench_function("resolver::get (cached key)", |b| {
        let model = Arc::new(MemoryModel::new("theme").with_descriptors(descriptors()));
        let registry = registry_with(&[model]);
        let theme = registry.resolver("theme").unwrap();
        let extra = ExtraScope::new();
        theme.get(None, "color", None, &extra).unwrap();

        b.iter(|| {
            theme
                .get(None, black_box("color"), None, &extra)
                .unwrap();
        })
    });

    c.bench_function("resolver::get (cached sub-path)", |b| {
        let model = Arc::new(MemoryModel::new("theme").with_descriptors(descriptors()));
        let registry = registry_with(&[model]);
        let theme = registry.resolver("theme").unwrap();
        let extra = ExtraScope::new();
        theme.get(None, "layout/cols", None, &extra).unwrap();

        b.iter(|| {
            theme
                .get(None, black_box("layout/cols"), None, &extra)
                .unwrap();
        })
    });
}

fn set_then_get_benchmark(c: &mut Criterion) {
    c.bench_function("resolver::set + get", |b| {
        let model = Arc::new(MemoryModel::new("theme").with_descriptors(descriptors()));
        let registry = registry_with(&[model]);
        let theme = registry.resolver("theme").unwrap();
        let extra = ExtraScope::new();

        b.iter(|| {
            theme.set(None, "color", black_box(json!("red")), &extra).unwrap();
            theme.get(None, "color", None, &extra).unwrap();
        })
    });
}

fn schema_benchmark(c: &mut Criterion) {
    let tree = descriptors();
    c.bench_function("Schema::from_descriptors", |b| {
        b.iter(|| Schema::from_descriptors(black_box(&tree)))
    });

    let mut value = json!({});
    c.bench_function("path::set_at + get_at", |b| {
        b.iter(|| {
            path::set_at(&mut value, black_box("a/b/c"), json!(1));
            path::get_at(&value, black_box("a/b/c")).is_some()
        })
    });
}

criterion_group!(
    benches,
    cached_get_benchmark,
    set_then_get_benchmark,
    schema_benchmark
);
criterion_main!(benches);

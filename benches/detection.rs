//! Benchmarks for image detection and override generation.
//!
//! These benchmarks measure reference parsing and full generation runs over
//! synthetic values trees of increasing size.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use irr::detector::{detect, DetectorConfig};
use irr::generator::{generate, GeneratorConfig};
use irr::reference::ImageReference;
use irr::values::Node;

const REFERENCES: &[&str] = &[
    "nginx",
    "nginx:1.25",
    "docker.io/library/nginx:1.25",
    "quay.io/prometheus/node-exporter:v1.7.0",
    "localhost:5000/team/app:2024.01",
    "ghcr.io/org/tool@sha256:0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef",
];

/// A values tree with `components` sub-charts, each holding a structured
/// image, a string image in a container list, and some non-image settings.
fn generate_values(components: usize) -> Node {
    let mut yaml = String::from("global:\n  imageRegistry: \"\"\n");
    for i in 0..components {
        yaml.push_str(&format!(
            r#"component{i}:
  enabled: true
  replicaCount: {i}
  image:
    registry: registry{r}.example.com
    repository: team/service{i}
    tag: "1.{i}.0"
  containers:
    - name: sidecar
      image: quay.io/org/sidecar:v{i}
      args: ["--port", "80{i}"]
  service:
    type: ClusterIP
    url: https://service{i}.example.com/health
"#,
            i = i,
            r = i % 4
        ));
    }
    Node::from_yaml_str(&yaml).expect("benchmark values are valid YAML")
}

fn bench_reference_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("reference_parsing");

    for reference in REFERENCES {
        group.bench_with_input(BenchmarkId::from_parameter(reference), reference, |b, r| {
            b.iter(|| ImageReference::parse(black_box(r)))
        });
    }

    group.finish();
}

fn bench_detection_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("detection_scaling");
    let config = DetectorConfig::default();

    for components in [10, 50, 200] {
        let values = generate_values(components);
        group.bench_with_input(
            BenchmarkId::new("components", components),
            &values,
            |b, values| b.iter(|| detect(black_box(values), &config)),
        );
    }

    group.finish();
}

fn bench_generation_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("generation_scaling");
    let config = GeneratorConfig {
        target_registry: Some("harbor.local".to_string()),
        ..Default::default()
    };

    for components in [10, 50, 200] {
        let values = generate_values(components);
        group.bench_with_input(
            BenchmarkId::new("components", components),
            &values,
            |b, values| b.iter(|| generate(black_box(values), &config)),
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_reference_parsing,
    bench_detection_scaling,
    bench_generation_scaling
);
criterion_main!(benches);

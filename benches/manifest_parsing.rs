//! Benchmarks for manifest parsing, validation and resolution.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use deptools::manifest::Manifest;
use deptools::plugins::registry::PluginRegistry;
use deptools::workspace::Workspace;

/// Minimal manifest with a single path component.
const MINIMAL_MANIFEST: &str = r#"
configurations:
  default: [a]
repositories:
  a:
    format: path
    repos: /tmp/x
"#;

/// One component of every builtin format.
const MIXED_MANIFEST: &str = r#"
configurations:
  default: [tools, lib, docs, zlib, sysroot]
  minimal: [zlib]
repositories:
  tools:
    format: git
    repos: https://example.org/tools.git
    label: stable
    alias: ext/tools
  lib:
    format: hg
    repos: https://hg.example.org/lib
  docs:
    format: svn
    repos: https://svn.example.org/docs
    revision: "1234"
  zlib:
    format: tar
    repos: https://example.org/zlib-1.3.tar.gz
    alias: zlib
    skip_dirs: 1
  sysroot:
    format: path
    repos: /opt/sysroot
    digest_content: true
"#;

fn generated_manifest(components: usize) -> String {
    let mut out = String::from("configurations:\n  default:\n");
    for i in 0..components {
        out.push_str(&format!("    - comp{}\n", i));
    }
    out.push_str("repositories:\n");
    for i in 0..components {
        out.push_str(&format!(
            "  comp{i}:\n    format: git\n    repos: https://example.org/comp{i}.git\n    label: release-{i}\n"
        ));
    }
    out
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("manifest_parse");
    group.bench_function("minimal", |b| {
        b.iter(|| Manifest::parse(black_box(MINIMAL_MANIFEST), "bench").unwrap())
    });
    group.bench_function("mixed", |b| {
        b.iter(|| Manifest::parse(black_box(MIXED_MANIFEST), "bench").unwrap())
    });
    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let registry = PluginRegistry::with_builtins();
    let workspace = Workspace::new("/work");
    let mut group = c.benchmark_group("manifest_resolve");
    for size in [10, 100, 500] {
        let manifest = Manifest::parse(&generated_manifest(size), "bench").unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &manifest, |b, m| {
            b.iter(|| m.resolve(black_box("default"), &registry, &workspace).unwrap())
        });
    }
    group.finish();
}

fn bench_dump(c: &mut Criterion) {
    let manifest = Manifest::parse(&generated_manifest(100), "bench").unwrap();
    c.bench_function("manifest_dump_100", |b| {
        b.iter(|| {
            let mut out = Vec::new();
            manifest.dump(black_box(&mut out)).unwrap();
            out
        })
    });
}

criterion_group!(benches, bench_parse, bench_resolve, bench_dump);
criterion_main!(benches);

//! Path planning benchmarks
//!
//! Benchmarks for the pure planning layer:
//! - Planning versions with growing file and gallery counts
//! - Sanitizing long, hostile display names
//! - Extension resolution from content types and URL hints

use civitai_downloader::catalog::CatalogEntry;
use civitai_downloader::classify::Category;
use civitai_downloader::paths::{PathPlanner, extension_for, sanitize_segment};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::json;
use std::hint::black_box;

/// Entry with `versions` versions of `artifacts` files and images each
fn sample_entry(versions: usize, artifacts: usize) -> CatalogEntry {
    let versions: Vec<_> = (0..versions)
        .map(|v| {
            json!({
                "id": 1000 + v,
                "name": format!("v{}.0", v),
                "baseModel": "SDXL 1.0",
                "files": (0..artifacts).map(|f| json!({
                    "id": f,
                    "name": format!("weights-{}.safetensors", f),
                    "downloadUrl": format!("https://civitai.com/api/download/models/{}?file={}", 1000 + v, f)
                })).collect::<Vec<_>>(),
                "images": (0..artifacts).map(|i| json!({
                    "id": i,
                    "url": format!("https://image.civitai.com/x/{}/{}.jpeg", v, i)
                })).collect::<Vec<_>>()
            })
        })
        .collect();

    CatalogEntry::from_value(json!({
        "id": 4576,
        "name": "Benchmark: Model / Name?",
        "type": "LORA",
        "modelVersions": versions
    }))
    .unwrap()
}

fn bench_plan(c: &mut Criterion) {
    let planner = PathPlanner::new("model_downloads", 3);
    let mut group = c.benchmark_group("plan_version");

    for artifacts in [1, 10, 100] {
        let entry = sample_entry(4, artifacts);
        group.bench_with_input(
            BenchmarkId::from_parameter(artifacts),
            &entry,
            |b, entry| {
                b.iter(|| {
                    for version in &entry.model_versions {
                        black_box(planner.plan(
                            "alice",
                            Category::Lora,
                            version.base_model.as_deref(),
                            entry,
                            version,
                        ));
                    }
                })
            },
        );
    }

    group.finish();
}

fn bench_sanitize(c: &mut Criterion) {
    let short = "My Model: v2 <final>";
    let long = "Ünïcödé / name * with | many ? chars ".repeat(20);

    c.bench_function("sanitize_short", |b| {
        b.iter(|| sanitize_segment(black_box(short)))
    });
    c.bench_function("sanitize_long", |b| {
        b.iter(|| sanitize_segment(black_box(&long)))
    });
}

fn bench_extension(c: &mut Criterion) {
    c.bench_function("extension_table_hit", |b| {
        b.iter(|| extension_for(black_box(Some("image/webp")), black_box("https://x/a")))
    });
    c.bench_function("extension_url_fallback", |b| {
        b.iter(|| {
            extension_for(
                black_box(Some("application/octet-stream")),
                black_box("https://x/model.safetensors?token=abc"),
            )
        })
    });
}

criterion_group!(benches, bench_plan, bench_sanitize, bench_extension);
criterion_main!(benches);

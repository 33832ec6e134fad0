//! Benchmarks for windowing and projection.
//!
//! Benchmark targets:
//! - 4 KiB context: windowing well under 1ms
//! - 256 KiB context: windowing under 10ms
//! - Projection of 1,000 items: under 5ms

// Criterion macros generate items without docs - this is expected for benchmarks
// Benchmarks use expect/unwrap for simplicity - panics are acceptable in benchmarks
#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use zptmem::models::MemoryItem;
use zptmem::window::{WindowConfig, merge_overlapping, process_context, reduce_to_budget};
use zptmem::{Tilt, project};

fn sample_text(bytes: usize) -> String {
    let sentence = "Ocean currents redistribute heat from the equator toward the poles. ";
    sentence.repeat(bytes / sentence.len() + 1)[..bytes].to_string()
}

fn sample_items(count: usize) -> Vec<MemoryItem> {
    (0..count)
        .map(|i| {
            let mut item = MemoryItem::new(format!("id-{i}"), "bench", "A stored fact about ocean heat transport")
                .with_relevance(0.5)
                .with_timestamp(1_700_000_000 + i as i64);
            item.label = Some(format!("item-{i}"));
            item.keywords = vec!["ocean".to_string(), "heat".to_string()];
            item
        })
        .collect()
}

fn bench_process_context(c: &mut Criterion) {
    let config = WindowConfig::new(2000, 500);
    let mut group = c.benchmark_group("process_context");
    for size in [4 * 1024, 64 * 1024, 256 * 1024] {
        let text = sample_text(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &text, |b, text| {
            b.iter(|| process_context(std::hint::black_box(text), &config));
        });
    }
    group.finish();
}

fn bench_merge_roundtrip(c: &mut Criterion) {
    let config = WindowConfig::new(2000, 500);
    let text = sample_text(64 * 1024);
    let windows = process_context(&text, &config);
    c.bench_function("merge_overlapping_64k", |b| {
        b.iter(|| merge_overlapping(std::hint::black_box(&windows)));
    });
}

fn bench_reduce_to_budget(c: &mut Criterion) {
    let text = sample_text(256 * 1024);
    c.bench_function("reduce_to_budget_256k", |b| {
        b.iter(|| reduce_to_budget(std::hint::black_box(&text), 2000));
    });
}

fn bench_projection(c: &mut Criterion) {
    let items = sample_items(1000);
    let mut group = c.benchmark_group("project_1000_items");
    for tilt in [Tilt::Keywords, Tilt::Embedding, Tilt::Graph, Tilt::Temporal] {
        group.bench_with_input(BenchmarkId::from_parameter(tilt), &items, |b, items| {
            b.iter(|| project(std::hint::black_box(items), tilt));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_process_context,
    bench_merge_roundtrip,
    bench_reduce_to_budget,
    bench_projection
);
criterion_main!(benches);

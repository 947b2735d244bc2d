//! Benchmarks for content handling and propagation
//!
//! Run with: cargo bench

use brickpipe::pipe::{BrickSpec, Pipe, PipeContext};
use brickpipe::{Chain, TextEncoding};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use tokio::runtime::{Builder, Runtime};
use tokio::task::LocalSet;

fn sample_text(len: usize) -> String {
    "The quick brown fox jumps over the lazy dog. 🦊 "
        .chars()
        .cycle()
        .take(len)
        .collect()
}

fn runtime() -> Runtime {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

fn bench_chain_views(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_views");

    for size in [1_000, 10_000, 100_000].iter() {
        let text = sample_text(*size);
        let bytes = text.as_bytes().to_vec();
        group.throughput(Throughput::Elements(*size as u64));

        group.bench_with_input(BenchmarkId::new("string_to_bytes", size), &text, |b, text| {
            b.iter(|| {
                let chain = Chain::from(text.as_str());
                black_box(chain.bytes().map(|b| b.len()).unwrap_or(0))
            });
        });

        group.bench_with_input(BenchmarkId::new("bytes_to_code_points", size), &bytes, |b, bytes| {
            b.iter(|| {
                let chain = Chain::from(bytes.clone());
                black_box(chain.code_points().map(|c| c.len()).unwrap_or(0))
            });
        });

        group.bench_with_input(BenchmarkId::new("utf16_reencode", size), &text, |b, text| {
            let chain = Chain::from(text.as_str());
            b.iter(|| {
                let utf16 = chain.with_encoding(TextEncoding::Utf16Le).unwrap_or_default();
                black_box(utf16.size().unwrap_or(0))
            });
        });
    }

    group.finish();
}

fn bench_equality(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_equality");
    let text = sample_text(10_000);
    let as_text = Chain::from(text.as_str());
    let as_bytes = Chain::from(text.as_bytes().to_vec());
    let as_code_points = Chain::from(text.chars().collect::<Vec<char>>());

    group.bench_function("text_vs_bytes", |b| {
        b.iter(|| black_box(as_text.is_equal_to(&as_bytes)));
    });

    group.bench_function("text_vs_code_points", |b| {
        b.iter(|| black_box(as_text.is_equal_to(&as_code_points)));
    });

    group.finish();
}

fn bench_propagation(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipe_propagation");
    let rt = runtime();

    for encoders in [1usize, 4, 16].iter() {
        let text = sample_text(2_000);
        group.bench_with_input(
            BenchmarkId::new("caesar_chain", encoders),
            encoders,
            |b, &encoders| {
                b.iter(|| {
                    LocalSet::new().block_on(&rt, async {
                        let pipe = Pipe::new(PipeContext::with_builtins());
                        let items = (0..encoders)
                            .map(|i| {
                                BrickSpec::new("caesar-cipher")
                                    .with_setting("shift", json!(i as i64 + 1))
                                    .into()
                            })
                            .collect();
                        pipe.append_bricks(items).unwrap_or_default();
                        let _ = pipe.set_content(text.as_str(), 0, None);
                        black_box(pipe.wait_for_content(encoders).await.ok())
                    })
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_chain_views, bench_equality, bench_propagation);
criterion_main!(benches);

use std::sync::Arc;

use bpflood_core::{DecoderBuilder, ParityCheckGraph, Q8};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random code of rate 1/2 with checks of degree 6
fn random_graph(n: usize) -> ParityCheckGraph {
    let mut rng = StdRng::seed_from_u64(7);
    let rows: Vec<Vec<usize>> = (0..n / 2)
        .map(|_| rand::seq::index::sample(&mut rng, n, 6).into_vec())
        .collect();
    ParityCheckGraph::from_check_rows(n, &rows).unwrap()
}

/// Noisy all-zero codeword
fn channel(n: usize, frames: usize) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(11);
    (0..n * frames)
        .map(|_| 2.0 + rng.gen_range(-2.5f32..2.5))
        .collect()
}

fn bench_decode_single(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_single");

    for n in [256usize, 1024, 4096] {
        let graph = random_graph(n);
        let llrs = channel(n, 1);
        let mut decoder = DecoderBuilder::new(graph).iterations(10).build::<f32>().unwrap();

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &llrs, |b, llrs| {
            b.iter(|| decoder.decode(black_box(llrs)).unwrap());
        });
    }

    group.finish();
}

fn bench_decode_batched(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_batched");
    let n = 1024;
    let graph = Arc::new(random_graph(n));

    for frames in [1usize, 4, 8] {
        let llrs = channel(n, frames);
        let mut decoder = DecoderBuilder::new(Arc::clone(&graph))
            .iterations(10)
            .frames(frames)
            .build::<f32>()
            .unwrap();

        group.throughput(Throughput::Elements((n * frames) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(frames), &llrs, |b, llrs| {
            b.iter(|| decoder.decode_batch(black_box(llrs)).unwrap());
        });
    }

    group.finish();
}

fn bench_decode_fixed(c: &mut Criterion) {
    let n = 1024;
    let llrs: Vec<Q8> = bpflood_core::llr::quantize(&channel(n, 1));
    let mut decoder = DecoderBuilder::new(random_graph(n)).iterations(10).build::<Q8>().unwrap();

    c.bench_function("decode_q8_1024", |b| {
        b.iter(|| decoder.decode(black_box(&llrs)).unwrap());
    });
}

criterion_group!(benches, bench_decode_single, bench_decode_batched, bench_decode_fixed);
criterion_main!(benches);

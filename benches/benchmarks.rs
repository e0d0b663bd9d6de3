//! Benchmarks for chunksync operations.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::io::Cursor;

use chunksync::{ChunkDigest, DeltaStream, SignatureData};

fn bench_digest(c: &mut Criterion) {
    let mut group = c.benchmark_group("digest");

    for size in [512, 4096, 65536].iter() {
        let data = vec![42u8; *size];

        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::new("compute", size), &data, |b, data| {
            b.iter(|| ChunkDigest::compute(black_box(data)));
        });
    }

    group.finish();
}

fn bench_signature(c: &mut Criterion) {
    let mut group = c.benchmark_group("signature");

    for size in [10_240, 102_400, 1_024_000].iter() {
        let data = vec![42u8; *size];

        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::new("build", size), &data, |b, data| {
            b.iter(|| {
                SignatureData::from_reader(
                    &mut Cursor::new(black_box(data)),
                    data.len() as u64,
                    512,
                )
            });
        });
    }

    group.finish();
}

fn bench_delta(c: &mut Criterion) {
    let mut group = c.benchmark_group("delta");

    for size in [10_240, 102_400].iter() {
        let reference: Vec<u8> = (0..*size).map(|i| (i % 249) as u8).collect();
        let sig = SignatureData::from_reader(
            &mut Cursor::new(&reference),
            reference.len() as u64,
            512,
        )
        .unwrap();

        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(
            BenchmarkId::new("identical", size),
            &reference,
            |b, source| {
                b.iter(|| {
                    DeltaStream::compute(
                        &sig,
                        &mut Cursor::new(black_box(source)),
                        source.len() as u64,
                    )
                });
            },
        );

        let disjoint: Vec<u8> = (0..*size).map(|i| (i % 13) as u8 ^ 0xF0).collect();
        group.bench_with_input(
            BenchmarkId::new("disjoint", size),
            &disjoint,
            |b, source| {
                b.iter(|| {
                    DeltaStream::compute(
                        &sig,
                        &mut Cursor::new(black_box(source)),
                        source.len() as u64,
                    )
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_digest, bench_signature, bench_delta);
criterion_main!(benches);

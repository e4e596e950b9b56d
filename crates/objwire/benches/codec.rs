// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Codec Benchmark
//!
//! Measures encode and decode cost for:
//! - a single TypedMemoryPath (schemas inlined, first use in a stream)
//! - a batch of paths sharing one range (back-references dominate)
//! - the same single path decoded dynamically (no registered classes)

#![allow(clippy::uninlined_format_args)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use objwire::path::{register_types, AtomPath, MemoryRangePath, MemoryType, TypedMemoryPath};
use objwire::{from_bytes_with, shared, to_bytes, Decoder, Encoder, EntityRegistry, ObjectRef};

fn sample() -> ObjectRef {
    let range = MemoryRangePath::new(Some(shared(AtomPath::new(42))), 0, 0x1000, 64);
    ObjectRef::new(TypedMemoryPath::new(
        Some(shared(range)),
        MemoryType::integer(4, false),
    ))
}

fn batch(count: usize) -> Vec<ObjectRef> {
    let range = shared(MemoryRangePath::new(Some(shared(AtomPath::new(1))), 0, 0, 4096));
    (0..count)
        .map(|i| {
            let ty = MemoryType::integer(1 << (i % 4), i % 2 == 0);
            ObjectRef::new(TypedMemoryPath::new(Some(range.clone()), ty))
        })
        .collect()
}

fn encode_batch(roots: &[ObjectRef]) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut e = Encoder::new(&mut buf);
    for root in roots {
        e.object(Some(root)).expect("encode");
    }
    buf
}

fn bench_single(c: &mut Criterion) {
    let obj = sample();
    let bytes = to_bytes(&obj).expect("encode");
    let typed = EntityRegistry::new();
    register_types(&typed).expect("register");
    let dynamic = EntityRegistry::new();

    let mut group = c.benchmark_group("single_path");
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    group.bench_function("encode", |b| b.iter(|| to_bytes(black_box(&obj))));
    group.bench_function("decode_typed", |b| {
        b.iter(|| from_bytes_with(black_box(&bytes), &typed))
    });
    group.bench_function("decode_dynamic", |b| {
        b.iter(|| from_bytes_with(black_box(&bytes), &dynamic))
    });
    group.finish();
}

fn bench_shared_batch(c: &mut Criterion) {
    let typed = EntityRegistry::new();
    register_types(&typed).expect("register");

    let mut group = c.benchmark_group("shared_batch");
    for count in [16usize, 256, 4096] {
        let roots = batch(count);
        let bytes = encode_batch(&roots);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("encode", count), &roots, |b, roots| {
            b.iter(|| encode_batch(black_box(roots)))
        });
        group.bench_with_input(BenchmarkId::new("decode", count), &bytes, |b, bytes| {
            b.iter(|| {
                let mut input = &bytes[..];
                let mut d = Decoder::with_registry(&mut input, &typed);
                for _ in 0..count {
                    black_box(d.object().expect("decode"));
                }
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_single, bench_shared_batch);
criterion_main!(benches);

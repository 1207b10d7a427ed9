//! Benchmarks for the producer-side hot path
//!
//! At 2 kHz a tracker leaves 500μs per sample, so decoding and queueing one
//! packet must stay far below that:
//! - Packet decode for samples, events and controls
//! - Full ingest into a link core (queue, latest slots, sample window)
//! - Queue operation under overflow, where every push evicts
//!
//! Platform: Cross-platform (synthetic packets, CI-safe)

use criterion::{BatchSize, Criterion, Throughput, criterion_group, criterion_main};
use gazelink::LinkConfig;
use gazelink::link::LinkCore;
use gazelink::test_utils::{binocular_sample, packets, recording_session};
use gazelink::wire;
use std::hint::black_box;

fn bench_decode(c: &mut Criterion) {
    let session = packets(&recording_session(100));
    let sample = packets(&[binocular_sample(1000, 512.0, 384.0)]).remove(0);

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(sample.len() as u64));
    group.bench_function("binocular_sample", |b| {
        b.iter(|| black_box(wire::decode(black_box(&sample))))
    });
    group.finish();

    let total: usize = session.iter().map(Vec::len).sum();
    let mut group = c.benchmark_group("decode_session");
    group.throughput(Throughput::Bytes(total as u64));
    group.bench_function("mixed_records", |b| {
        b.iter(|| {
            for packet in &session {
                let _ = black_box(wire::decode(black_box(packet)));
            }
        })
    });
    group.finish();
}

fn bench_ingest(c: &mut Criterion) {
    let session = packets(&recording_session(1000));
    let config = LinkConfig::default();

    let mut group = c.benchmark_group("ingest");
    group.throughput(Throughput::Elements(session.len() as u64));
    group.bench_function("session_into_core", |b| {
        b.iter_batched(
            || LinkCore::new(&config),
            |mut core| {
                for packet in &session {
                    black_box(core.ingest(packet));
                }
                core
            },
            BatchSize::SmallInput,
        )
    });
    group.bench_function("ingest_then_drain", |b| {
        b.iter_batched(
            || LinkCore::new(&config),
            |mut core| {
                for packet in &session {
                    core.ingest(packet);
                }
                while let Some(delivered) = core.next() {
                    black_box(delivered);
                }
                core
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn bench_overflow(c: &mut Criterion) {
    let sample = packets(&[binocular_sample(1000, 512.0, 384.0)]).remove(0);
    let config = LinkConfig { queue_capacity: 4096, ..LinkConfig::default() };
    let mut core = LinkCore::new(&config);
    // Fill the queue so every further push evicts.
    while core.queue().free() >= sample.len() {
        core.ingest(&sample);
    }

    c.bench_function("ingest_with_eviction", |b| {
        b.iter(|| black_box(core.ingest(black_box(&sample))))
    });
}

criterion_group!(benches, bench_decode, bench_ingest, bench_overflow);
criterion_main!(benches);

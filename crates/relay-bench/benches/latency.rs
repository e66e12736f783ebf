//! Latency benchmarks for Relay.
//!
//! These benchmarks focus on publish-to-receive latency.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::time::Instant;
use tenvis_relay_bench::relay_with_subscribers;
use tenvis_relay_core::ChatEvent;

/// Benchmark publish + receive latency.
fn bench_pubsub_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("pubsub_latency");

    group.bench_function("single_subscriber", |b| {
        b.iter_custom(|iters| {
            let (relay, mut subs) = relay_with_subscribers(1);

            let start = Instant::now();
            for _ in 0..iters {
                relay.send_message("alice", "hello");
                let _ = subs[0].try_recv();
            }
            start.elapsed()
        });
    });

    group.bench_function("ten_subscribers", |b| {
        b.iter_custom(|iters| {
            let (relay, mut subs) = relay_with_subscribers(10);

            let start = Instant::now();
            for _ in 0..iters {
                relay.send_message("alice", "hello");
                for sub in &mut subs {
                    let _ = sub.try_recv();
                }
            }
            start.elapsed()
        });
    });

    group.bench_function("async_wakeup", |b| {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        b.iter_custom(|iters| {
            runtime.block_on(async {
                let (relay, mut subs) = relay_with_subscribers(1);
                let mut sub = subs.remove(0);

                let start = Instant::now();
                for _ in 0..iters {
                    relay.send_message("alice", "hello");
                    black_box(sub.recv().await);
                }
                start.elapsed()
            })
        });
    });

    group.finish();
}

/// Benchmark event creation latency.
fn bench_event_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_creation");

    group.bench_function("message", |b| {
        b.iter(|| ChatEvent::message(black_box("alice"), black_box("hello")))
    });

    group.bench_function("joined", |b| {
        b.iter(|| ChatEvent::joined(black_box("alice")))
    });

    group.finish();
}

criterion_group!(benches, bench_pubsub_latency, bench_event_creation);
criterion_main!(benches);

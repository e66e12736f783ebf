//! Throughput benchmarks for Relay.
//!
//! These benchmarks measure the raw operation throughput of the core.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tenvis_relay_bench::{relay_with_subscribers, usernames};
use tenvis_relay_core::{BroadcastBus, ChatEvent, ChatRelay, PresenceRegistry};

/// Benchmark relay operations.
fn bench_relay(c: &mut Criterion) {
    let mut group = c.benchmark_group("relay");

    group.bench_function("subscribe", |b| {
        let relay = ChatRelay::new();
        b.iter(|| black_box(relay.subscribe()));
    });

    group.bench_function("send_message_1_sub", |b| {
        let (relay, _subs) = relay_with_subscribers(1);
        b.iter(|| relay.send_message(black_box("alice"), black_box("hello")));
    });

    group.bench_function("send_message_100_sub", |b| {
        let (relay, _subs) = relay_with_subscribers(100);
        b.iter(|| relay.send_message(black_box("alice"), black_box("hello")));
    });

    group.bench_function("join_leave", |b| {
        let relay = ChatRelay::new();
        b.iter(|| {
            relay.user_joined(black_box("alice"));
            relay.user_left(black_box("alice"));
        });
    });

    group.finish();
}

/// Benchmark presence registry operations.
fn bench_presence(c: &mut Criterion) {
    let mut group = c.benchmark_group("presence");

    group.bench_function("duplicate_join", |b| {
        let presence = PresenceRegistry::new();
        presence.join("alice");
        b.iter(|| presence.join(black_box("alice")));
    });

    for size in [10, 1000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("snapshot", size), size, |b, &size| {
            let presence = PresenceRegistry::new();
            for name in usernames(size) {
                presence.join(&name);
            }
            b.iter(|| presence.snapshot());
        });
    }

    group.finish();
}

/// Benchmark fan-out scenarios.
fn bench_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("fanout");

    for size in [10, 100, 1000, 10000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let bus = BroadcastBus::new();
            let _subs: Vec<_> = (0..size).map(|_| bus.subscribe()).collect();

            b.iter(|| bus.publish(black_box(ChatEvent::message("alice", "hello"))));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_relay, bench_presence, bench_fanout);
criterion_main!(benches);

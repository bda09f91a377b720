//! Fan-out benchmarks.
//!
//! Measures the cost of one accepted sample reaching N live sessions.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pmu_core::{queued_session, Relay, SessionSink};
use pmu_protocol::{PmuSample, Source};

fn bench_ingest_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest_fanout");

    for sessions in [1usize, 10, 100, 1000] {
        let relay = Relay::new();
        // Receivers must stay alive or the sessions are evicted.
        let receivers: Vec<_> = (0..sessions)
            .map(|_| {
                let (session, rx) = queued_session(16);
                relay.subscribe(session).unwrap();
                rx
            })
            .collect();

        group.throughput(Throughput::Elements(sessions as u64));
        group.bench_with_input(BenchmarkId::from_parameter(sessions), &sessions, |b, _| {
            let mut ts = 0.0;
            b.iter(|| {
                ts += 0.02;
                black_box(relay.ingest(Source::Grid, PmuSample::nominal(1, ts)))
            });
        });
        drop(receivers);
    }

    group.finish();
}

fn bench_subscribe(c: &mut Criterion) {
    let relay = Relay::new();
    relay.ingest(Source::Grid, PmuSample::nominal(1, 0.0));
    relay.ingest(Source::Microgrid, PmuSample::nominal(2, 0.0));

    c.bench_function("subscribe_with_sync", |b| {
        b.iter(|| {
            let (session, rx) = queued_session(4);
            let id = session.id();
            relay.subscribe(session).unwrap();
            relay.unsubscribe(id);
            black_box(rx)
        })
    });
}

criterion_group!(benches, bench_ingest_fanout, bench_subscribe);
criterion_main!(benches);

//! # Herald Dispatch Benchmarks
//!
//! | Scenario | What it measures |
//! |----------|------------------|
//! | `publish_fanout` | Snapshot dispatch over N plain handlers |
//! | `publish_pipeline` | Filter → map → listen chain per event |
//! | `diagnostics` | The same pipeline with the trail off and on |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use herald_bus::{Diagnostics, DiagnosticsConfig, Publisher, SubscriberId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

fn context(enabled: bool) -> Diagnostics {
    Diagnostics::from_config(&DiagnosticsConfig::default().enabled(enabled))
}

fn bench_publish_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish_fanout");

    for subscribers in [1usize, 10, 100] {
        let publisher = Publisher::<u64>::with_diagnostics("fanout", &context(false));
        let sum = Arc::new(AtomicU64::new(0));
        for _ in 0..subscribers {
            let sum = Arc::clone(&sum);
            publisher.subscribe(SubscriberId::issue(), move |x| {
                sum.fetch_add(*x, Ordering::Relaxed);
            });
        }

        group.throughput(Throughput::Elements(subscribers as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(subscribers),
            &publisher,
            |b, publisher| b.iter(|| publisher.publish(black_box(1))),
        );
    }

    group.finish();
}

fn bench_publish_pipeline(c: &mut Criterion) {
    let publisher = Publisher::<u64>::with_diagnostics("pipeline", &context(false));
    publisher
        .proxy()
        .filter(|x| x % 3 != 0)
        .map(|x: &u64| x.wrapping_mul(31))
        .listen(|x| {
            black_box(*x);
        });

    let mut next = 0u64;
    c.bench_function("publish_pipeline", |b| {
        b.iter(|| {
            next = next.wrapping_add(1);
            publisher.publish(black_box(next))
        })
    });
}

fn bench_diagnostics(c: &mut Criterion) {
    let mut group = c.benchmark_group("diagnostics");

    for enabled in [false, true] {
        let diagnostics = context(enabled);
        let publisher = Publisher::<u64>::with_diagnostics("traced", &diagnostics);
        publisher.proxy().filter(|_| true).listen(|x| {
            black_box(*x);
        });
        let _trail = diagnostics.publish_trail().bind(|record| {
            black_box(record.handlers.len());
        });

        let label = if enabled { "enabled" } else { "disabled" };
        group.bench_function(label, |b| b.iter(|| publisher.publish(black_box(7))));
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_publish_fanout,
    bench_publish_pipeline,
    bench_diagnostics
);
criterion_main!(benches);
